use std::fmt::{self, Display, Formatter};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitState {
    Exited(u8),
    Signaled(i32),
    /// The status could not be determined, as when the wait itself failed.
    Invalid,
}

impl ExitState {
    pub const INVALID_RAW: i32 = -1;

    pub fn from_raw(raw: i32) -> ExitState {
        if raw == Self::INVALID_RAW {
            ExitState::Invalid
        } else if libc::WIFEXITED(raw) {
            ExitState::Exited(libc::WEXITSTATUS(raw) as u8)
        } else if libc::WIFSIGNALED(raw) {
            ExitState::Signaled(libc::WTERMSIG(raw))
        } else {
            ExitState::Invalid
        }
    }
}

impl Display for ExitState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ExitState::Exited(code) => write!(f, "{}/0", code),
            ExitState::Signaled(signal) => write!(f, "0/{}", signal),
            ExitState::Invalid => f.write_str("invalid"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
}

/// Exit codes 0..=255 that count as success. Only 0 is marked by default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuccessPolicy {
    table: [bool; 256],
}

impl Default for SuccessPolicy {
    fn default() -> SuccessPolicy {
        let mut table = [false; 256];
        table[0] = true;
        SuccessPolicy { table }
    }
}

impl SuccessPolicy {
    /// Marks an additional exit code as success. Codes outside of 1..=255 are
    /// rejected with a warning and leave the table untouched.
    pub fn allow(&mut self, code: i64) -> bool {
        if (1..=255).contains(&code) {
            self.table[code as usize] = true;
            true
        } else {
            warn!("ignoring unreasonable success code {}", code);
            false
        }
    }

    pub fn is_success(&self, code: u8) -> bool { self.table[code as usize] }

    pub fn classify(&self, state: ExitState) -> Verdict {
        match state {
            ExitState::Exited(code) if self.is_success(code) => Verdict::Success,
            _ => Verdict::Failure,
        }
    }

    pub fn is_failure(&self, state: ExitState) -> bool { self.classify(state) == Verdict::Failure }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32) -> i32 { code << 8 }

    #[test]
    fn decode() {
        assert_eq!(ExitState::from_raw(exited(0)), ExitState::Exited(0));
        assert_eq!(ExitState::from_raw(exited(42)), ExitState::Exited(42));
        assert_eq!(ExitState::from_raw(libc::SIGKILL), ExitState::Signaled(libc::SIGKILL));
        assert_eq!(ExitState::from_raw(-1), ExitState::Invalid);
    }

    #[test]
    fn default_table() {
        let policy = SuccessPolicy::default();
        assert_eq!(policy.classify(ExitState::Exited(0)), Verdict::Success);
        for code in 1..=255u8 {
            assert_eq!(policy.classify(ExitState::Exited(code)), Verdict::Failure);
        }
        assert!(policy.is_failure(ExitState::Signaled(libc::SIGTERM)));
        assert!(policy.is_failure(ExitState::Invalid));
    }

    #[test]
    fn extra_codes() {
        let mut policy = SuccessPolicy::default();
        assert!(policy.allow(3));
        assert!(!policy.allow(0));
        assert!(!policy.allow(256));
        assert!(!policy.allow(-4));
        assert_eq!(policy.classify(ExitState::Exited(3)), Verdict::Success);
        assert_eq!(policy.classify(ExitState::Exited(3)), Verdict::Success);
        assert_eq!(policy.classify(ExitState::Exited(0)), Verdict::Success);
        assert_eq!(policy.classify(ExitState::Exited(4)), Verdict::Failure);
        assert_eq!(policy.classify(ExitState::Signaled(3)), Verdict::Failure);
    }
}
