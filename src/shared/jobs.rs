use super::signals;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Starts external processes on behalf of the scheduler.
pub trait Launcher {
    fn launch(&self, argv: &[String]) -> io::Result<u32>;
}

/// Executes the argument vector directly, without a shell.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, argv: &[String]) -> io::Result<u32> {
        command(argv)?.spawn().map(|child| child.id())
    }
}

/// Builds the command for an argument vector, undoing any signal
/// dispositions of the coordinator in the child before it execs.
pub fn command(argv: &[String]) -> io::Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    unsafe {
        cmd.pre_exec(signals::reset_child_dispositions);
    }
    Ok(cmd)
}

pub fn become_group_leader() -> io::Result<()> {
    if unsafe { libc::setpgid(0, 0) } == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Children and hooks inherit the redirected descriptor.
pub fn redirect_stdout(file: &File) -> io::Result<()> {
    if unsafe { libc::dup2(file.as_raw_fd(), libc::STDOUT_FILENO) } == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv() {
        assert_eq!(command(&[]).unwrap_err().kind(), io::ErrorKind::InvalidInput);
        assert_eq!(ProcessLauncher.launch(&[]).unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
