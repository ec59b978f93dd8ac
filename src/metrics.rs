use crate::assembler::CycleOutcome;
use log::info;
use std::time::{Duration, Instant};

/// Monitor counters, owned by the polling loop.
#[derive(Debug)]
pub struct Metrics {
    pub cycles: u64,
    pub persisted: u64,
    pub dropped: u64,
    pub persist_failures: u64,
    pub read_failures: u64,
    /// Read failures since the last cycle that got a complete frame.
    pub consecutive_read_failures: u32,
    pub last_cycle_time: Option<Duration>,
    pub start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cycles: 0,
            persisted: 0,
            dropped: 0,
            persist_failures: 0,
            read_failures: 0,
            consecutive_read_failures: 0,
            last_cycle_time: None,
            start_time: Instant::now(),
        }
    }

    pub fn record_cycle(&mut self, outcome: &CycleOutcome, duration: Duration) {
        self.cycles += 1;
        self.last_cycle_time = Some(duration);
        match outcome {
            CycleOutcome::Persisted => self.persisted += 1,
            CycleOutcome::Dropped(_) => self.dropped += 1,
            CycleOutcome::PersistFailed(_) => self.persist_failures += 1,
            CycleOutcome::ReadFailure(_) => self.read_failures += 1,
        }
        if outcome.is_read_failure() {
            self.consecutive_read_failures = self.consecutive_read_failures.saturating_add(1);
        } else {
            self.consecutive_read_failures = 0;
        }
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of cycles that ended with a stored frame.
    pub fn success_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.persisted as f64 / self.cycles as f64
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Monitor summary: uptime {:.0?}, cycles {}, persisted {}, dropped {}, persist failures {}, read failures {}, success {:.1}%",
            self.get_total_duration(),
            self.cycles,
            self.persisted,
            self.dropped,
            self.persist_failures,
            self.read_failures,
            self.success_rate() * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReadError;

    #[test]
    fn counts_outcomes_and_failure_streak() {
        let mut metrics = Metrics::new();
        let tick = Duration::from_millis(10);
        metrics.record_cycle(&CycleOutcome::ReadFailure(ReadError::Disconnected), tick);
        metrics.record_cycle(&CycleOutcome::ReadFailure(ReadError::Disconnected), tick);
        assert_eq!(metrics.consecutive_read_failures, 2);

        metrics.record_cycle(&CycleOutcome::Dropped(vec!["IMAX"]), tick);
        assert_eq!(metrics.consecutive_read_failures, 0);
        metrics.record_cycle(&CycleOutcome::Persisted, tick);

        assert_eq!(metrics.cycles, 4);
        assert_eq!(metrics.read_failures, 2);
        assert_eq!(metrics.dropped, 1);
        assert_eq!(metrics.persisted, 1);
        assert!((metrics.success_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn failure_streak_saturates() {
        let mut metrics = Metrics::new();
        metrics.consecutive_read_failures = u32::MAX - 1;
        for _ in 0..3 {
            metrics.record_cycle(&CycleOutcome::ReadFailure(ReadError::NotOpen), Duration::ZERO);
        }
        assert_eq!(metrics.consecutive_read_failures, u32::MAX);
        assert_eq!(metrics.read_failures, 3);
    }

    #[test]
    fn empty_metrics_have_zero_rate() {
        assert_eq!(Metrics::new().success_rate(), 0.0);
    }
}
