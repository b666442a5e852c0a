use std::time::{SystemTime, UNIX_EPOCH};

/// Source of timestamps, in seconds with a fractional part.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock time since the unix epoch.
///
/// Adjustments to the system clock while pinging show up as latency error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_reads_epoch_seconds() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(first > 1_000_000_000.0);
        assert!(second >= first && second - first < 1.0);
    }
}
