use seqexec::Options;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ArgumentError {
    #[error("unknown option '-{0}'")]
    Unknown(char),
    #[error("option '-{0}' requires a value")]
    MissingValue(char),
    #[error("at most one input file may be given")]
    TooManyInputs,
}

#[derive(Debug, PartialEq)]
pub enum Action {
    Run(Options),
    Help,
}

/// Parses getopt-style arguments: flags may be bundled (`-df`), and values
/// may be attached (`-n4`) or given separately (`-n 4`). A lone `--` ends
/// option parsing.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Action, ArgumentError> {
    let mut options = Options::default();
    let mut inputs = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            inputs.extend(args.by_ref());
            break;
        } else if arg.len() < 2 || !arg.starts_with('-') {
            inputs.push(arg);
            continue;
        }

        let mut flags = arg[1..].char_indices();
        while let Some((id, flag)) = flags.next() {
            match flag {
                'd' => options.debug = options.debug.saturating_add(1),
                'f' => options.fail_fast = true,
                'h' => return Ok(Action::Help),
                'R' | 'S' | 'n' | 's' => {
                    let rest = &arg[1 + id + flag.len_utf8()..];
                    let value = if rest.is_empty() {
                        args.next().ok_or(ArgumentError::MissingValue(flag))?
                    } else {
                        rest.to_owned()
                    };

                    match flag {
                        'R' => options.progress = Some(PathBuf::from(value)),
                        'S' => options.success.push(value),
                        'n' => options.workers = Some(value),
                        _ => options.status = Some(PathBuf::from(value)),
                    }
                    break;
                }
                _ => return Err(ArgumentError::Unknown(flag)),
            }
        }
    }

    if inputs.len() > 1 {
        return Err(ArgumentError::TooManyInputs);
    }
    options.input = inputs.pop().map(PathBuf::from);
    Ok(Action::Run(options))
}

pub fn usage(application: &str) -> String {
    format!(
        "Usage:\t{} [options] [inputfile]\n\n\
         Optional arguments:\n \
         -d\tIncrease debug mode.\n \
         -f\tFail hard on first error (non-zero exit code or signal death), default\n\
         \tis to execute all entries in the input file regardless of their exit.\n \
         -s fn\tProtocol anything to given status file, default stdout.\n \
         -R fn\tRecords progress into the given file, see also SEQEXEC_PROGRESS_REPORT.\n \
         -S ec\tMulti-option: Mark non-zero exit-code ec as success (for -f mode).\n \
         -n nr\tNumber of CPUs to use, defaults to 1, string 'auto' permitted.\n \
         input\tFile with list of applications and args to execute, default stdin.\n",
        application
    )
}
