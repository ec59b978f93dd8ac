use std::time::{Duration, Instant};

/// Schedules cycles on a fixed grid so that time spent reading a frame is
/// subtracted from the wait instead of accumulating as drift.
pub struct Pacer {
    interval: Duration,
    next_tick: Instant,
}

impl Pacer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_tick: now + interval,
        }
    }

    /// How long to wait at `now`, then advances the schedule. When a cycle
    /// overran one or more ticks the schedule restarts from `now` rather than
    /// firing the missed ticks back to back.
    pub fn delay_until_next(&mut self, now: Instant) -> Duration {
        let delay = self.next_tick.saturating_duration_since(now);
        if delay.is_zero() {
            self.next_tick = now + self.interval;
        } else {
            self.next_tick += self.interval;
        }
        delay
    }

    pub fn wait(&mut self) {
        let delay = self.delay_until_next(Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtracts_elapsed_time() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_secs(60), start);
        let delay = pacer.delay_until_next(start + Duration::from_secs(15));
        assert_eq!(delay, Duration::from_secs(45));
        // Next tick stays on the grid: start + 120s.
        let delay = pacer.delay_until_next(start + Duration::from_secs(100));
        assert_eq!(delay, Duration::from_secs(20));
    }

    #[test]
    fn overrun_restarts_schedule() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_secs(10), start);
        assert_eq!(pacer.delay_until_next(start + Duration::from_secs(35)), Duration::ZERO);
        assert_eq!(
            pacer.delay_until_next(start + Duration::from_secs(36)),
            Duration::from_secs(9)
        );
    }

    #[test]
    fn zero_interval_never_waits() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::ZERO, start);
        assert_eq!(pacer.delay_until_next(start), Duration::ZERO);
        assert_eq!(pacer.delay_until_next(start), Duration::ZERO);
    }
}
