use super::error::ConfigError;
use super::policy::SuccessPolicy;
use app_dirs::{get_app_dir, AppDataType, AppInfo};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const APP_INFO: AppInfo = AppInfo { name: "seqexec", author: "seqexec" };

pub const ENV_PROGRESS: &str = "SEQEXEC_PROGRESS_REPORT";
pub const ENV_SETUP: &str = "SEQEXEC_SETUP";
pub const ENV_CLEANUP: &str = "SEQEXEC_CLEANUP";
pub const ENV_LOG: &str = "SEQEXEC_LOG";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawWorkers {
    Count(i64),
    Named(String),
}

/// Optional defaults read from `config.toml` in the user's config directory.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub workers:         Option<RawWorkers>,
    pub fail_fast:       Option<bool>,
    pub success:         Option<Vec<i64>>,
    pub progress_report: Option<PathBuf>,
    pub setup:           Option<String>,
    pub cleanup:         Option<String>,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<FileConfig, ConfigError> { toml::from_str(raw).map_err(Into::into) }

    pub fn load() -> Result<Option<FileConfig>, ConfigError> {
        let path = get_app_dir(AppDataType::UserConfig, &APP_INFO, "config.toml")?;
        if !path.exists() {
            return Ok(None);
        }
        debug!("reading configuration from {:?}", path);
        FileConfig::parse(&fs::read_to_string(&path)?).map(Some)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    pub debug:     u8,
    pub fail_fast: bool,
    pub status:    Option<PathBuf>,
    pub progress:  Option<PathBuf>,
    pub success:   Vec<String>,
    pub workers:   Option<String>,
    pub input:     Option<PathBuf>,
}

/// Number of processors to use for `auto`: the smaller of the configured and
/// the available processor counts, and never less than one.
pub fn processors() -> usize {
    let configured = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    let configured = if configured <= 0 { 1 } else { configured as usize };
    configured.min(num_cpus::get()).max(1)
}

fn workers_from_str(value: &str) -> usize {
    if value.eq_ignore_ascii_case("auto") {
        return processors();
    }
    match value.trim().parse::<i64>() {
        Ok(count) => workers_from_count(count),
        Err(_) => {
            warn!("ignoring unreasonable worker count {:?}, using 1", value);
            1
        }
    }
}

fn workers_from_count(count: i64) -> usize {
    if count < 1 {
        warn!("ignoring unreasonable worker count {}, using 1", count);
        1
    } else {
        count as usize
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    pub application: String,
    pub invocation:  Vec<String>,
    pub workers:     usize,
    pub fail_fast:   bool,
    pub debug:       u8,
    pub success:     SuccessPolicy,
    pub progress:    Option<PathBuf>,
    pub setup:       Option<String>,
    pub cleanup:     Option<String>,
}

impl ExecutionConfig {
    pub fn new(application: &str) -> ExecutionConfig {
        ExecutionConfig {
            application: application.to_owned(),
            invocation:  vec![application.to_owned()],
            workers:     1,
            fail_fast:   false,
            debug:       0,
            success:     SuccessPolicy::default(),
            progress:    None,
            setup:       None,
            cleanup:     None,
        }
    }

    /// Layers the configuration file, the environment and the command line, in
    /// that order of precedence.
    pub fn resolve<F>(
        application: &str,
        invocation: Vec<String>,
        options: &Options,
        file: Option<FileConfig>,
        env: F,
    ) -> ExecutionConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ExecutionConfig::new(application);
        config.invocation = invocation;

        if let Some(file) = file {
            match file.workers {
                Some(RawWorkers::Count(count)) => config.workers = workers_from_count(count),
                Some(RawWorkers::Named(ref name)) => config.workers = workers_from_str(name),
                None => (),
            }
            config.fail_fast = file.fail_fast.unwrap_or(false);
            for code in file.success.unwrap_or_default() {
                config.success.allow(code);
            }
            config.progress = file.progress_report;
            config.setup = file.setup;
            config.cleanup = file.cleanup;
        }

        if let Some(path) = env(ENV_PROGRESS) {
            config.progress = Some(PathBuf::from(path));
        }
        if let Some(setup) = env(ENV_SETUP) {
            config.setup = Some(setup);
        }
        if let Some(cleanup) = env(ENV_CLEANUP) {
            config.cleanup = Some(cleanup);
        }

        config.debug = options.debug;
        config.fail_fast |= options.fail_fast;
        for code in &options.success {
            // Anything that is not a number is as unreasonable as zero.
            config.success.allow(code.trim().parse::<i64>().unwrap_or(0));
        }
        if let Some(ref path) = options.progress {
            config.progress = Some(path.clone());
        }
        if let Some(ref workers) = options.workers {
            config.workers = workers_from_str(workers);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ExitState;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ExecutionConfig::resolve("seqexec", vec![], &Options::default(), None, env(&[]));
        assert_eq!(config.workers, 1);
        assert!(!config.fail_fast);
        assert_eq!(config.progress, None);
        assert_eq!(config.setup, None);
        assert_eq!(config.success, SuccessPolicy::default());
    }

    #[test]
    fn precedence() {
        let file = FileConfig::parse(
            r#"
            workers = 3
            success = [2]
            progress_report = "/tmp/from-file"
            setup = "echo file"
            cleanup = "echo file"
            "#,
        )
        .unwrap();

        let options = Options {
            progress: Some(PathBuf::from("/tmp/from-cli")),
            success: vec!["3".into(), "999".into(), "junk".into()],
            workers: Some("5".into()),
            fail_fast: true,
            debug: 2,
            ..Options::default()
        };

        let config = ExecutionConfig::resolve(
            "seqexec",
            vec!["seqexec".into(), "-f".into()],
            &options,
            Some(file),
            env(&[(ENV_PROGRESS, "/tmp/from-env"), (ENV_SETUP, "echo env")]),
        );

        assert_eq!(config.workers, 5);
        assert!(config.fail_fast);
        assert_eq!(config.debug, 2);
        assert_eq!(config.progress, Some(PathBuf::from("/tmp/from-cli")));
        assert_eq!(config.setup.as_deref(), Some("echo env"));
        assert_eq!(config.cleanup.as_deref(), Some("echo file"));
        assert_eq!(config.invocation, vec!["seqexec".to_owned(), "-f".to_owned()]);
        assert!(config.success.is_success(2));
        assert!(config.success.is_success(3));
        assert!(config.success.is_failure(ExitState::Exited(4)));
    }

    #[test]
    fn environment_progress() {
        let config = ExecutionConfig::resolve(
            "seqexec",
            vec![],
            &Options::default(),
            None,
            env(&[(ENV_PROGRESS, "/tmp/progress"), (ENV_CLEANUP, "true")]),
        );
        assert_eq!(config.progress, Some(PathBuf::from("/tmp/progress")));
        assert_eq!(config.cleanup.as_deref(), Some("true"));
    }

    #[test]
    fn worker_counts() {
        assert_eq!(workers_from_str("4"), 4);
        assert_eq!(workers_from_str("0"), 1);
        assert_eq!(workers_from_str("-3"), 1);
        assert_eq!(workers_from_str("many"), 1);
        assert_eq!(workers_from_str("AUTO"), processors());
        assert!(processors() >= 1);

        let file = FileConfig::parse("workers = \"auto\"").unwrap();
        assert_eq!(file.workers, Some(RawWorkers::Named("auto".into())));
    }

    #[test]
    fn bad_file() {
        assert!(FileConfig::parse("workers = [1, 2]").is_err());
        assert!(FileConfig::parse("nodes = []").is_err());
    }
}
