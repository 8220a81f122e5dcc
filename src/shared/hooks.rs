use super::jobs;
use super::policy::ExitState;
use super::signals::SignalGuard;
use super::tokenizer::tokenize;
use std::fmt::{self, Display, Formatter};
use std::os::unix::process::ExitStatusExt;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookRole {
    Setup,
    Cleanup,
}

impl Display for HookRole {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match *self {
            HookRole::Setup => "setup",
            HookRole::Cleanup => "cleanup",
        })
    }
}

/// Runs the setup and cleanup commands that bracket a batch. Hooks execute in
/// the foreground, outside of the worker slots, and never abort the run.
pub struct HookRunner<'a> {
    application: &'a str,
}

impl<'a> HookRunner<'a> {
    pub fn new(application: &'a str) -> HookRunner<'a> { HookRunner { application } }

    pub fn run(&self, command: &str, role: HookRole) -> Option<ExitState> {
        let argv = match tokenize(command) {
            Ok(argv) => argv,
            Err(why) => {
                warn!("{}: unparsable {} string ({}), ignoring", self.application, role, why);
                return None;
            }
        };

        let status = {
            let _guard = SignalGuard::acquire();
            jobs::command(&argv).and_then(|mut cmd| cmd.status())
        };

        let state = match status {
            Ok(status) => ExitState::from_raw(status.into_raw()),
            Err(why) => {
                warn!("{}: unable to run {} {:?}: {}", self.application, role, argv[0], why);
                return None;
            }
        };

        if state == ExitState::Exited(0) {
            debug!("{}: {} returned {}", self.application, role, state);
        } else {
            warn!("{}: {} returned {}", self.application, role, state);
        }

        Some(state)
    }
}
