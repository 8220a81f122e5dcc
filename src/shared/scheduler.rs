use super::config::ExecutionConfig;
use super::error::{SchedulerError, EXIT_FAIL_FAST};
use super::hooks::{HookRole, HookRunner};
use super::jobs::Launcher;
use super::policy::ExitState;
use super::reaper::{self, Reaped};
use super::report::{Reporter, RunStats};
use super::slots::{Occupant, SlotTable};
use super::source::CommandSource;
use super::tokenizer::tokenize;
use chrono::{DateTime, Local};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub stats:    RunStats,
    /// Fail-fast mode saw a failure, either while admitting or while draining.
    pub tripped:  bool,
    pub duration: Duration,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 { if self.tripped { EXIT_FAIL_FAST } else { 0 } }
}

/// Multiplexes a stream of commands onto a fixed number of worker slots.
pub struct Scheduler<'a, L, W: Write> {
    config:   &'a ExecutionConfig,
    launcher: L,
    reporter: &'a mut Reporter<W>,
    slots:    SlotTable,
    stats:    RunStats,
    failure:  bool,
}

impl<'a, L: Launcher, W: Write> Scheduler<'a, L, W> {
    pub fn new(
        config: &'a ExecutionConfig,
        launcher: L,
        reporter: &'a mut Reporter<W>,
    ) -> Result<Scheduler<'a, L, W>, SchedulerError> {
        Ok(Scheduler {
            config,
            launcher,
            reporter,
            slots: SlotTable::new(config.workers)?,
            stats: RunStats::default(),
            failure: false,
        })
    }

    pub fn slots(&self) -> &SlotTable { &self.slots }

    pub fn run<R: BufRead>(&mut self, mut source: CommandSource<R>) -> Outcome {
        let config = self.config;
        let when = Local::now();
        let start = Instant::now();
        self.reporter.initial(&when, &config.invocation);

        let hooks = HookRunner::new(&config.application);
        if let Some(ref setup) = config.setup {
            hooks.run(setup, HookRole::Setup);
        }

        let mut tripped = self.stream(&mut source);
        self.stats.lines = source.lines();
        tripped |= self.drain();

        if let Some(ref cleanup) = config.cleanup {
            hooks.run(cleanup, HookRole::Cleanup);
        }

        let outcome = Outcome { stats: self.stats, tripped, duration: start.elapsed() };
        self.summary(&outcome, &when);
        outcome
    }

    /// Admits commands until the source is exhausted. Returns `true` when
    /// fail-fast stopped admission early.
    fn stream<R: BufRead>(&mut self, source: &mut CommandSource<R>) -> bool {
        for line in source {
            let argv = match tokenize(&line.command) {
                Ok(argv) => argv,
                Err(why) => {
                    debug!(
                        "{}: error parsing arguments on line {} ({}), ignoring",
                        self.config.application, line.number, why
                    );
                    continue;
                }
            };

            let slot = self.idle_slot();

            if self.config.fail_fast && self.failure {
                info!(
                    "{}: failure observed, not admitting line {} or later",
                    self.config.application, line.number
                );
                return true;
            }

            self.stats.attempted += 1;
            self.spawn(slot, argv);
        }

        false
    }

    fn idle_slot(&mut self) -> usize {
        loop {
            if let Some(slot) = self.slots.first_idle() {
                return slot;
            }

            let capacity = self.slots.capacity();
            debug!(
                "{}: {} slot{} busy, waiting",
                self.config.application,
                capacity,
                if capacity == 1 { "" } else { "s" }
            );
            self.reap();
        }
    }

    fn spawn(&mut self, slot: usize, argv: Vec<String>) {
        let when = Local::now();
        let started = Instant::now();
        match self.launcher.launch(&argv) {
            Ok(pid) => {
                debug!("{}: slot {} runs process {}: {:?}", self.config.application, slot, pid, argv);
                self.slots.assign(slot, Occupant::new(pid, argv, when, started));
            }
            Err(why) => {
                warn!("{}: unable to start {:?}: {}", self.config.application, argv[0], why);
                self.stats.failed += 1;
            }
        }
    }

    fn drain(&mut self) -> bool {
        loop {
            let busy = self.slots.busy();
            if busy == 0 {
                break;
            }
            info!("{}: {} task{} remaining", self.config.application, busy, if busy == 1 { "" } else { "s" });
            self.reap();
        }

        self.config.fail_fast && self.failure
    }

    fn reap(&mut self) {
        match reaper::reap(&mut self.slots, &mut *self.reporter, &self.config.application) {
            Reaped::Job { status, .. } => self.classify(status, 1),
            Reaped::Failed { lost, .. } => self.classify(ExitState::Invalid, lost as u64),
            Reaped::Unknown { .. } => (),
        }
    }

    fn classify(&mut self, status: ExitState, jobs: u64) {
        if self.config.success.is_failure(status) {
            self.stats.failed += jobs;
            self.failure = true;
        }
    }

    fn summary(&mut self, outcome: &Outcome, when: &DateTime<Local>) {
        self.reporter.summary(&outcome.stats, !outcome.tripped, outcome.duration, when);
    }
}
