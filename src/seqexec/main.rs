mod args;

use args::Action;
use seqexec::config::{ExecutionConfig, FileConfig, ENV_LOG};
use seqexec::error::ConfigError;
use seqexec::jobs::{self, ProcessLauncher};
use seqexec::report::{self, Reporter};
use seqexec::{CommandSource, Scheduler};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::exit;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let invocation: Vec<String> = env::args().collect();
    let application = invocation
        .first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map_or_else(|| "seqexec".to_owned(), |name| name.to_string_lossy().into_owned());

    let options = match args::parse(invocation.iter().skip(1).cloned()) {
        Ok(Action::Run(options)) => options,
        Ok(Action::Help) => {
            print!("{}", args::usage(&application));
            exit(0);
        }
        Err(why) => {
            eprintln!("{}: {}", application, why);
            print!("{}", args::usage(&application));
            exit(1);
        }
    };

    init_logging(options.debug);

    let file = match FileConfig::load() {
        Ok(file) => file,
        Err(why) => {
            warn!("{}: ignoring configuration file: {}", application, why);
            None
        }
    };
    let config = ExecutionConfig::resolve(&application, invocation.clone(), &options, file, |key| {
        env::var(key).ok()
    });

    if let Some(ref path) = options.status {
        let redirected = File::create(path).and_then(|file| jobs::redirect_stdout(&file));
        if let Err(source) = redirected {
            fail(&application, ConfigError::StatusSink { path: path.clone(), source });
        }
    }

    let input: Box<dyn BufRead> = match options.input {
        Some(ref path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(source) => fail(&application, ConfigError::Input { path: path.clone(), source }),
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    // Children inherit the group, so the whole batch can be signalled at once.
    if let Err(why) = jobs::become_group_leader() {
        warn!("{}: unable to become process group leader: {} (ignoring)", application, why);
    }

    let progress = config.progress.as_deref().and_then(report::open_progress);
    let mut reporter = Reporter::new(io::stdout(), progress, &application, config.debug);
    let outcome = match Scheduler::new(&config, ProcessLauncher, &mut reporter) {
        Ok(mut scheduler) => scheduler.run(CommandSource::new(input)),
        Err(why) => {
            error!("{}: {}", application, why);
            exit(why.exit_code());
        }
    };

    exit(outcome.exit_code());
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn fail(application: &str, why: ConfigError) -> ! {
    error!("{}: {}", application, why);
    exit(why.exit_code());
}
