use super::policy::ExitState;
use super::report::Reporter;
use super::signals::SignalGuard;
use super::slots::SlotTable;
use super::usage::ResourceUsage;
use std::io::{self, Write};
use std::mem;
use std::time::Instant;
use tracing::{error, warn};

#[derive(Debug)]
pub enum Reaped {
    Job { pid: u32, slot: usize, status: ExitState },
    Unknown { pid: u32, status: ExitState },
    /// The wait failed. When the OS reports that no children remain, every
    /// occupied slot was released and is listed in `lost`.
    Failed { error: io::Error, lost: usize },
}

struct Termination {
    pid:    libc::pid_t,
    status: libc::c_int,
    usage:  libc::rusage,
}

fn wait_any() -> io::Result<Termination> {
    let _guard = SignalGuard::acquire();
    loop {
        let mut status = 0;
        let mut usage: libc::rusage = unsafe { mem::zeroed() };
        let pid = unsafe { libc::wait4(-1, &mut status, 0, &mut usage) };
        if pid >= 0 {
            return Ok(Termination { pid, status, usage });
        }

        let why = io::Error::last_os_error();
        if why.kind() != io::ErrorKind::Interrupted {
            return Err(why);
        }
    }
}

pub fn reap<W: Write>(slots: &mut SlotTable, reporter: &mut Reporter<W>, application: &str) -> Reaped {
    let termination = wait_any();
    let finished = Instant::now();

    let Termination { pid, status, usage } = match termination {
        Ok(termination) => termination,
        Err(why) => {
            error!("{}: wait4: {}", application, why);
            let lost = if why.raw_os_error() == Some(libc::ECHILD) {
                release_lost(slots, reporter, application, finished)
            } else {
                0
            };
            return Reaped::Failed { error: why, lost };
        }
    };

    let pid = pid as u32;
    let state = ExitState::from_raw(status);
    let slot = match slots.find(pid) {
        Some(slot) => slot,
        None => {
            warn!("{}: process {} (status {}) is not a known child, ignoring", application, pid, status);
            return Reaped::Unknown { pid, status: state };
        }
    };

    if let Some(job) = slots.release(slot) {
        let duration = finished.saturating_duration_since(job.started);
        reporter.job(pid, &job.when, duration, status, &job.argv, Some(ResourceUsage::from(&usage)));
    }

    Reaped::Job { pid, slot, status: state }
}

/// The table holds children the OS no longer knows about. They can never be
/// waited for, so their slots are released with an invalid status.
fn release_lost<W: Write>(
    slots: &mut SlotTable,
    reporter: &mut Reporter<W>,
    application: &str,
    finished: Instant,
) -> usize {
    let lost = slots.release_all();
    for job in &lost {
        error!("{}: lost track of process {} ({})", application, job.pid, job.application());
        let duration = finished.saturating_duration_since(job.started);
        reporter.job(job.pid, &job.when, duration, ExitState::INVALID_RAW, &job.argv, None);
    }
    lost.len()
}
