use chrono::{DateTime, Local};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Running,
}

#[derive(Clone, Debug)]
pub struct Occupant {
    pub pid:     u32,
    pub argv:    Vec<String>,
    pub when:    DateTime<Local>,
    pub started: Instant,
}

impl Occupant {
    pub fn new(pid: u32, argv: Vec<String>, when: DateTime<Local>, started: Instant) -> Occupant {
        Occupant { pid, argv, when, started }
    }

    pub fn application(&self) -> &str { self.argv.first().map_or("", String::as_str) }
}

#[derive(Clone, Debug, Default)]
pub struct Slot {
    occupant: Option<Occupant>,
}

impl Slot {
    pub fn state(&self) -> SlotState {
        if self.occupant.is_some() {
            SlotState::Running
        } else {
            SlotState::Idle
        }
    }

    pub fn is_hosting(&self, pid: u32) -> bool { self.occupant.as_ref().map_or(false, |o| o.pid == pid) }

    pub(super) fn occupy(&mut self, occupant: Occupant) {
        debug_assert!(self.occupant.is_none(), "slot assigned while running");
        self.occupant = Some(occupant);
    }

    pub(super) fn vacate(&mut self) -> Option<Occupant> { self.occupant.take() }
}
