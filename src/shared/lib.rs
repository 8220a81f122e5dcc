//! Runs the commands of a line-oriented list as independent processes, with
//! at most a fixed number of them alive at any time, and reports how each one
//! ended.

pub mod config;
pub mod error;
pub mod hooks;
pub mod jobs;
pub mod policy;
pub mod reaper;
pub mod report;
pub mod scheduler;
pub mod signals;
pub mod slots;
pub mod source;
pub mod tokenizer;
pub mod usage;

pub use self::config::{ExecutionConfig, FileConfig, Options, APP_INFO};
pub use self::error::{ConfigError, SchedulerError};
pub use self::hooks::{HookRole, HookRunner};
pub use self::jobs::{Launcher, ProcessLauncher};
pub use self::policy::{ExitState, SuccessPolicy, Verdict};
pub use self::report::{Reporter, RunStats};
pub use self::scheduler::{Outcome, Scheduler};
pub use self::source::{CommandSource, LogicalLine};
pub use self::tokenizer::{tokenize, TokenizeError};
