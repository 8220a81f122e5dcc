//! Resource usage of a reaped child, as returned by `wait4`.

use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub utime:    f64,
    pub stime:    f64,
    pub maxrss:   u64,
    pub minflt:   i64,
    pub majflt:   i64,
    pub nswap:    i64,
    pub inblock:  i64,
    pub oublock:  i64,
    pub msgsnd:   i64,
    pub msgrcv:   i64,
    pub nsignals: i64,
    pub nvcsw:    i64,
    pub nivcsw:   i64,
}

impl From<&libc::rusage> for ResourceUsage {
    fn from(ru: &libc::rusage) -> ResourceUsage {
        ResourceUsage {
            utime:    timeval_to_duration(ru.ru_utime).as_secs_f64(),
            stime:    timeval_to_duration(ru.ru_stime).as_secs_f64(),
            maxrss:   maxrss_to_bytes(ru.ru_maxrss),
            minflt:   ru.ru_minflt as i64,
            majflt:   ru.ru_majflt as i64,
            nswap:    ru.ru_nswap as i64,
            inblock:  ru.ru_inblock as i64,
            oublock:  ru.ru_oublock as i64,
            msgsnd:   ru.ru_msgsnd as i64,
            msgrcv:   ru.ru_msgrcv as i64,
            nsignals: ru.ru_nsignals as i64,
            nvcsw:    ru.ru_nvcsw as i64,
            nivcsw:   ru.ru_nivcsw as i64,
        }
    }
}

fn timeval_to_duration(tv: libc::timeval) -> Duration {
    let secs = if tv.tv_sec < 0 { 0 } else { tv.tv_sec as u64 };
    let usec = (tv.tv_usec as i64).clamp(0, 999_999) as u64;
    Duration::from_secs(secs) + Duration::from_micros(usec)
}

/// `ru_maxrss` is kilobytes everywhere except macOS, where it is bytes.
fn maxrss_to_bytes(ru_maxrss: libc::c_long) -> u64 {
    let rss = if ru_maxrss <= 0 { 0 } else { ru_maxrss as u64 };
    if cfg!(target_os = "macos") {
        rss
    } else {
        rss.saturating_mul(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceUsage;
    use std::mem;

    #[test]
    fn conversion() {
        let mut ru: libc::rusage = unsafe { mem::zeroed() };
        ru.ru_utime.tv_sec = 1;
        ru.ru_utime.tv_usec = 500_000;
        ru.ru_stime.tv_sec = -3;
        ru.ru_maxrss = 2;
        ru.ru_nvcsw = 7;

        let usage = ResourceUsage::from(&ru);
        assert_eq!(usage.utime, 1.5);
        assert_eq!(usage.stime, 0.0);
        assert_eq!(usage.nvcsw, 7);
        if cfg!(target_os = "macos") {
            assert_eq!(usage.maxrss, 2);
        } else {
            assert_eq!(usage.maxrss, 2048);
        }
    }
}
