use std::time::{Duration, Instant};

/// A simulated oscillator that paces the CPU stepper at a fixed frequency.
///
/// Timing is best effort: accuracy is bounded by the host scheduler and the
/// resolution of the monotonic clock, so a deadline that slips is counted in
/// `misses` and execution catches up instead of stalling. The pacing layer
/// is strictly decoupled from CPU correctness; the CPU runs identically
/// without it.
pub struct Clock {
    period: Duration,
    deadline: Option<Instant>,
    /// Ticks whose deadline had already passed when they were requested.
    pub misses: u64,
    /// Total elapsed cycles.
    pub cycles: u64,
}

impl Clock {
    pub fn new(frequency: u32) -> Clock {
        Clock {
            period: Duration::from_secs(1) / frequency,
            deadline: None,
            misses: 0,
            cycles: 0,
        }
    }

    /// Wait for the next oscillator edge and return the elapsed cycle
    /// count. A missed deadline re-arms at half a period so the pace evens
    /// out again.
    pub fn tick(&mut self) -> u64 {
        let now = Instant::now();
        let deadline = self.deadline.unwrap_or(now + self.period);
        if deadline <= now {
            self.misses += 1;
            self.deadline = Some(now + self.period / 2);
        } else {
            // A busy loop: sleeping is far too coarse to pace individual
            // cycles.
            while Instant::now() < deadline {}
            self.deadline = Some(deadline + self.period);
        }
        self.cycles += 1;
        self.cycles
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cycle_count_is_monotonic() {
        let mut clock = Clock::new(1_000_000);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.tick(), 3);
        assert_eq!(clock.cycles, 3);
    }

    #[test]
    fn pacing_takes_at_least_the_nominal_time() {
        let frequency = 10_000;
        let cycles = 200;
        let mut clock = Clock::new(frequency);
        let started = Instant::now();
        for _ in 0..cycles {
            clock.tick();
        }
        let elapsed = started.elapsed();
        let nominal = Duration::from_secs(1) / frequency * cycles;
        // The busy-wait cannot finish early. The upper bound is left very
        // loose so a noisy scheduler does not flake the suite.
        assert!(
            elapsed >= nominal - Duration::from_millis(2),
            "elapsed {:?} for nominal {:?}",
            elapsed,
            nominal
        );
        assert!(elapsed < nominal * 10, "elapsed {:?}", elapsed);
    }

    #[test]
    fn an_unreachable_frequency_records_misses() {
        let mut clock = Clock::new(1_000_000_000);
        for _ in 0..10_000 {
            clock.tick();
        }
        assert!(clock.misses > 0);
        assert_eq!(clock.cycles, 10_000);
    }
}
