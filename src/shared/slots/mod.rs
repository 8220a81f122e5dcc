mod slot;

pub use self::slot::*;
use crate::error::SchedulerError;

/// Fixed-capacity arena of worker slots, indexed by small integers.
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Result<SlotTable, SchedulerError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, Slot::default);
        Ok(SlotTable { slots })
    }

    pub fn capacity(&self) -> usize { self.slots.len() }

    pub fn first_idle(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.state() == SlotState::Idle)
    }

    pub fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state() == state).count()
    }

    pub fn busy(&self) -> usize { self.count(SlotState::Running) }

    pub fn get(&self, index: usize) -> Option<&Slot> { self.slots.get(index) }

    pub fn find(&self, pid: u32) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_hosting(pid))
    }

    /// Records a freshly started child. The slot must be idle.
    pub fn assign(&mut self, index: usize, occupant: Occupant) { self.slots[index].occupy(occupant); }

    pub fn release(&mut self, index: usize) -> Option<Occupant> {
        self.slots.get_mut(index).and_then(Slot::vacate)
    }

    pub fn release_all(&mut self) -> Vec<Occupant> {
        self.slots.iter_mut().filter_map(Slot::vacate).collect()
    }
}
