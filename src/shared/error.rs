use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const EXIT_STATUS_SINK: i32 = 2;
pub const EXIT_INPUT: i32 = 3;
pub const EXIT_FAIL_FAST: i32 = 5;
pub const EXIT_ALLOCATION: i32 = 42;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("open status {path:?}: {source}")]
    StatusSink { path: PathBuf, source: io::Error },
    #[error("open input {path:?}: {source}")]
    Input { path: PathBuf, source: io::Error },
    #[error("XDG app dirs error: {0}")]
    AppDir(#[from] app_dirs::AppDirsError),
    #[error("config I/O error: {0}")]
    File(#[from] io::Error),
    #[error("TOML config decoding error: {0}")]
    Decode(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        match *self {
            ConfigError::StatusSink { .. } => EXIT_STATUS_SINK,
            ConfigError::Input { .. } => EXIT_INPUT,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("out of memory: {0}")]
    Allocation(#[from] TryReserveError),
}

impl SchedulerError {
    pub fn exit_code(&self) -> i32 { EXIT_ALLOCATION }
}
