use std::time::{Duration, Instant};

/// Decides when the next progress line is due: every `every` records or
/// every `interval`, whichever comes first.
#[derive(Debug, Clone)]
pub struct ProgressTicker {
    every: u64,
    interval: Duration,
    started: Instant,
    last_at: Instant,
    last_count: u64,
}

impl ProgressTicker {
    pub fn new(every: u64, interval: Duration) -> Self {
        let now = Instant::now();
        ProgressTicker {
            every: every.max(1),
            interval,
            started: now,
            last_at: now,
            last_count: 0,
        }
    }

    /// Returns true (and rearms) when a progress line should be emitted at `count`.
    pub fn tick(&mut self, count: u64) -> bool {
        self.tick_at(count, Instant::now())
    }

    fn tick_at(&mut self, count: u64, now: Instant) -> bool {
        if count == self.last_count {
            return false;
        }
        let by_count = count / self.every > self.last_count / self.every;
        let by_time = now.duration_since(self.last_at) >= self.interval;
        if by_count || by_time {
            self.last_count = count;
            self.last_at = now;
            true
        } else {
            false
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records per second since the ticker started.
    pub fn rate(&self, count: u64) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 { count as f64 / secs } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_every_n_records() {
        let mut ticker = ProgressTicker::new(10, Duration::from_secs(3600));
        let now = ticker.started;

        assert!(!ticker.tick_at(9, now));
        assert!(ticker.tick_at(10, now));
        assert!(!ticker.tick_at(15, now));
        assert!(ticker.tick_at(23, now));
    }

    #[test]
    fn test_ticks_after_interval() {
        let mut ticker = ProgressTicker::new(1_000_000, Duration::from_secs(5));
        let start = ticker.started;

        assert!(!ticker.tick_at(3, start + Duration::from_secs(1)));
        assert!(ticker.tick_at(4, start + Duration::from_secs(6)));
        // nothing new since the last line
        assert!(!ticker.tick_at(4, start + Duration::from_secs(20)));
    }
}
