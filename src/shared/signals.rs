use libc::{self, c_int, sigaction, sigset_t, SIGCHLD, SIGINT, SIGQUIT, SIG_BLOCK, SIG_DFL, SIG_IGN, SIG_SETMASK};
use std::io;
use std::mem;
use std::ptr;
use tracing::warn;

/// Blocks SIGCHLD and ignores SIGINT/SIGQUIT until dropped.
pub struct SignalGuard {
    mask: Option<sigset_t>,
    int:  Option<sigaction>,
    quit: Option<sigaction>,
}

impl SignalGuard {
    pub fn acquire() -> SignalGuard {
        let int = ignore(SIGINT);
        let quit = ignore(SIGQUIT);
        let mask = block(SIGCHLD);
        for (what, result) in [("SIGINT", &int), ("SIGQUIT", &quit)] {
            if let Err(why) = result {
                warn!("unable to ignore {}: {}", what, why);
            }
        }
        if let Err(ref why) = mask {
            warn!("unable to block SIGCHLD: {}", why);
        }

        SignalGuard { mask: mask.ok(), int: int.ok(), quit: quit.ok() }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        unsafe {
            if let Some(ref previous) = self.int {
                sigaction(SIGINT, previous, ptr::null_mut());
            }
            if let Some(ref previous) = self.quit {
                sigaction(SIGQUIT, previous, ptr::null_mut());
            }
            if let Some(ref previous) = self.mask {
                libc::pthread_sigmask(SIG_SETMASK, previous, ptr::null_mut());
            }
        }
    }
}

fn ignore(signal: c_int) -> io::Result<sigaction> { replace(signal, SIG_IGN) }

fn replace(signal: c_int, handler: libc::sighandler_t) -> io::Result<sigaction> {
    unsafe {
        let mut action: sigaction = mem::zeroed();
        let mut previous: sigaction = mem::zeroed();
        action.sa_sigaction = handler;
        libc::sigemptyset(&mut action.sa_mask);
        if sigaction(signal, &action, &mut previous) == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(previous)
        }
    }
}

fn block(signal: c_int) -> io::Result<sigset_t> {
    unsafe {
        let mut sigset: sigset_t = mem::zeroed();
        let mut previous: sigset_t = mem::zeroed();
        libc::sigemptyset(&mut sigset);
        libc::sigaddset(&mut sigset, signal);
        match libc::pthread_sigmask(SIG_BLOCK, &sigset, &mut previous) {
            0 => Ok(previous),
            errno => Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

/// Puts the signals touched by `SignalGuard` back to their defaults. Only
/// async-signal-safe calls are made, so this may run between fork and exec.
pub fn reset_child_dispositions() -> io::Result<()> {
    for signal in [SIGINT, SIGQUIT, SIGCHLD] {
        if unsafe { libc::signal(signal, SIG_DFL) } == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_mask() -> sigset_t {
        unsafe {
            let mut mask: sigset_t = mem::zeroed();
            libc::pthread_sigmask(SIG_BLOCK, ptr::null(), &mut mask);
            mask
        }
    }

    fn handler(signal: c_int) -> libc::sighandler_t {
        unsafe {
            let mut action: sigaction = mem::zeroed();
            sigaction(signal, ptr::null(), &mut action);
            action.sa_sigaction
        }
    }

    #[test]
    fn guard_restores_on_drop() {
        let before = unsafe { libc::sigismember(&current_mask(), SIGCHLD) };
        let int_before = handler(SIGINT);
        {
            let _guard = SignalGuard::acquire();
            assert_eq!(unsafe { libc::sigismember(&current_mask(), SIGCHLD) }, 1);
            assert_eq!(handler(SIGINT), SIG_IGN);
            assert_eq!(handler(SIGQUIT), SIG_IGN);
        }
        assert_eq!(unsafe { libc::sigismember(&current_mask(), SIGCHLD) }, before);
        assert_eq!(handler(SIGINT), int_before);
    }
}
