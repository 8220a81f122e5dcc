use super::usage::ResourceUsage;
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// One completed job, or the initial marker when `pid` and `usage` are absent.
#[derive(Debug, Serialize)]
pub struct ProgressRecord<'a> {
    pub start:    String,
    pub duration: f64,
    pub status:   i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid:      Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage:    Option<ResourceUsage>,
    pub argv:     &'a [String],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub lines:     u64,
    pub attempted: u64,
    pub failed:    u64,
}

/// Writes the per-job progress records and the final summary.
pub struct Reporter<W: Write> {
    status:      W,
    progress:    Option<File>,
    application: String,
    debug:       u8,
}

pub fn isodate(when: &DateTime<Local>) -> String { when.to_rfc3339_opts(SecondsFormat::Millis, false) }

pub fn open_progress(path: &Path) -> Option<File> {
    match OpenOptions::new().append(true).create(true).mode(0o666).open(path) {
        Ok(file) => Some(file),
        Err(why) => {
            warn!("open progress {:?}: {}", path, why);
            None
        }
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(status: W, progress: Option<File>, application: &str, debug: u8) -> Reporter<W> {
        Reporter { status, progress, application: application.to_owned(), debug }
    }

    pub fn into_status(self) -> W { self.status }

    fn record(&mut self, record: &ProgressRecord) {
        let file = match self.progress {
            Some(ref mut file) => file,
            None => return,
        };

        let result = serde_json::to_vec(record).map_err(io::Error::from).and_then(|mut line| {
            line.push(b'\n');
            // A single write keeps appended records whole.
            file.write_all(&line)
        });

        if let Err(why) = result {
            warn!("{}: unable to write progress record: {}", self.application, why);
        }
    }

    pub fn initial(&mut self, when: &DateTime<Local>, argv: &[String]) {
        let record = ProgressRecord {
            start: isodate(when),
            duration: 0.0,
            status: -1,
            pid: None,
            usage: None,
            argv,
        };
        self.record(&record);
    }

    pub fn job(
        &mut self,
        pid: u32,
        when: &DateTime<Local>,
        duration: Duration,
        status: i32,
        argv: &[String],
        usage: Option<ResourceUsage>,
    ) {
        let start = isodate(when);
        if self.debug > 1 {
            let app = argv.first().map_or("", String::as_str);
            let result = writeln!(
                self.status,
                "<job pid=\"{}\" app=\"{}\" start=\"{}\" duration=\"{:.3}\" status=\"{}\"/>",
                pid,
                app,
                start,
                duration.as_secs_f64(),
                status
            );
            if let Err(why) = result {
                warn!("{}: unable to write status: {}", self.application, why);
            }
        }

        let record = ProgressRecord {
            start,
            duration: duration.as_secs_f64(),
            status,
            pid: Some(pid),
            usage,
            argv,
        };
        self.record(&record);
    }

    pub fn summary(&mut self, stats: &RunStats, ok: bool, duration: Duration, when: &DateTime<Local>) {
        let result = writeln!(
            self.status,
            "[struct stat=\"{}\", lines={}, count={}, failed={}, duration={:.3}, start=\"{}\"]",
            if ok { "OK" } else { "FAIL" },
            stats.lines,
            stats.attempted,
            stats.failed,
            duration.as_secs_f64(),
            when.to_rfc3339_opts(SecondsFormat::Secs, false)
        )
        .and_then(|_| self.status.flush());

        if let Err(why) = result {
            warn!("{}: unable to write summary: {}", self.application, why);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn when() -> DateTime<Local> { Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap() }

    #[test]
    fn summary_line() {
        let mut reporter = Reporter::new(Vec::new(), None, "seqexec", 0);
        let stats = RunStats { lines: 5, attempted: 2, failed: 1 };
        reporter.summary(&stats, true, Duration::from_millis(1250), &when());
        let out = String::from_utf8(reporter.into_status()).unwrap();
        assert!(out.starts_with("[struct stat=\"OK\", lines=5, count=2, failed=1, duration=1.250, start=\"2024-03-01T12:30:05"));
        assert!(out.ends_with("\"]\n"));
    }

    #[test]
    fn job_lines_only_at_high_debug() {
        let argv = vec!["/bin/true".to_owned()];
        let mut quiet = Reporter::new(Vec::new(), None, "seqexec", 1);
        quiet.job(10, &when(), Duration::from_millis(20), 0, &argv, None);
        assert!(quiet.into_status().is_empty());

        let mut loud = Reporter::new(Vec::new(), None, "seqexec", 2);
        loud.job(10, &when(), Duration::from_millis(20), 256, &argv, None);
        let out = String::from_utf8(loud.into_status()).unwrap();
        assert!(out.starts_with("<job pid=\"10\" app=\"/bin/true\" start=\"2024-03-01T12:30:05.000"));
        assert!(out.ends_with("duration=\"0.020\" status=\"256\"/>\n"));
    }

    #[test]
    fn progress_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.log");
        let mut reporter = Reporter::new(io::sink(), open_progress(&path), "seqexec", 0);
        let argv = vec!["sh".to_owned(), "-c".to_owned(), "exit 1".to_owned()];
        reporter.initial(&when(), &["seqexec".to_owned()]);
        reporter.job(42, &when(), Duration::from_secs(2), 256, &argv, Some(ResourceUsage::default()));
        drop(reporter);

        let contents = fs::read_to_string(&path).unwrap();
        let records: Vec<serde_json::Value> =
            contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["status"], -1);
        assert_eq!(records[0]["duration"], 0.0);
        assert!(records[0].get("pid").is_none());
        assert_eq!(records[0]["argv"][0], "seqexec");
        assert_eq!(records[1]["pid"], 42);
        assert_eq!(records[1]["status"], 256);
        assert_eq!(records[1]["duration"], 2.0);
        assert_eq!(records[1]["argv"][2], "exit 1");
        assert_eq!(records[1]["usage"]["maxrss"], 0);
    }

    #[test]
    fn unopenable_progress_sink() {
        assert!(open_progress(Path::new("/nonexistent/dir/progress.log")).is_none());
    }
}
