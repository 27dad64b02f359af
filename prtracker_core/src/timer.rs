//! Session timers.
//!
//! Both timers are plain state advanced by one-second ticks delivered from the
//! host's event loop, so they are owned by the session engine rather than by
//! any view and stop exactly when the engine says so. [`Ticker`] turns a
//! monotonic clock into whole ticks without accumulating drift.

use std::time::{Duration, Instant};

/// Count-up timer for the lifetime of a session
#[derive(Clone, Debug, Default)]
pub struct ElapsedTimer {
    seconds: u32,
    running: bool,
}

impl ElapsedTimer {
    pub fn started() -> Self {
        Self {
            seconds: 0,
            running: true,
        }
    }

    pub fn tick(&mut self) {
        if self.running {
            self.seconds = self.seconds.saturating_add(1);
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// The rest countdown currently running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveRest {
    /// Index of the in-session exercise the rest belongs to
    pub exercise: usize,
    pub remaining: u32,
}

/// Single-slot rest countdown
///
/// Starting a new rest replaces any running one. Reaching zero clears both
/// the remaining time and the exercise reference.
#[derive(Clone, Debug, Default)]
pub struct RestTimer {
    active: Option<ActiveRest>,
}

impl RestTimer {
    /// Start (or supersede) the countdown; zero seconds starts nothing
    pub fn start(&mut self, exercise: usize, seconds: u32) {
        if seconds == 0 {
            return;
        }
        if let Some(previous) = self.active {
            tracing::debug!(
                "Rest timer for exercise {} superseded with {}s left",
                previous.exercise,
                previous.remaining
            );
        }
        self.active = Some(ActiveRest {
            exercise,
            remaining: seconds,
        });
    }

    /// Count down one second; returns the exercise whose rest just ended
    pub fn tick(&mut self) -> Option<usize> {
        let rest = self.active.as_mut()?;
        rest.remaining = rest.remaining.saturating_sub(1);
        if rest.remaining == 0 {
            let exercise = rest.exercise;
            self.active = None;
            return Some(exercise);
        }
        None
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<ActiveRest> {
        self.active
    }
}

/// Converts monotonic clock readings into whole one-second ticks
///
/// The sub-second remainder is carried into the next reading.
#[derive(Clone, Debug)]
pub struct Ticker {
    last: Instant,
    carry: Duration,
}

impl Ticker {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last: now,
            carry: Duration::ZERO,
        }
    }

    /// Whole seconds elapsed since the previous reading
    pub fn ticks_at(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last) + self.carry;
        let whole = elapsed.as_secs();
        self.carry = elapsed - Duration::from_secs(whole);
        self.last = now;
        u32::try_from(whole).unwrap_or(u32::MAX)
    }

    pub fn take(&mut self) -> u32 {
        self.ticks_at(Instant::now())
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_counts_only_while_running() {
        let mut timer = ElapsedTimer::started();
        timer.tick();
        timer.tick();
        timer.stop();
        timer.tick();
        assert_eq!(timer.seconds(), 2);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_rest_counts_down_and_clears() {
        let mut rest = RestTimer::default();
        rest.start(0, 2);
        assert_eq!(rest.tick(), None);
        assert_eq!(
            rest.active(),
            Some(ActiveRest {
                exercise: 0,
                remaining: 1
            })
        );
        assert_eq!(rest.tick(), Some(0));
        assert_eq!(rest.active(), None);
        assert_eq!(rest.tick(), None);
    }

    #[test]
    fn test_rest_is_single_slot() {
        let mut rest = RestTimer::default();
        rest.start(0, 90);
        rest.tick();
        rest.start(1, 60);
        assert_eq!(
            rest.active(),
            Some(ActiveRest {
                exercise: 1,
                remaining: 60
            })
        );
    }

    #[test]
    fn test_zero_rest_starts_nothing() {
        let mut rest = RestTimer::default();
        rest.start(3, 0);
        assert_eq!(rest.active(), None);
    }

    #[test]
    fn test_ticker_carries_remainder() {
        let t0 = Instant::now();
        let mut ticker = Ticker::starting_at(t0);
        assert_eq!(ticker.ticks_at(t0 + Duration::from_millis(1500)), 1);
        assert_eq!(ticker.ticks_at(t0 + Duration::from_millis(1900)), 0);
        assert_eq!(ticker.ticks_at(t0 + Duration::from_millis(2000)), 1);
        assert_eq!(ticker.ticks_at(t0 + Duration::from_millis(5000)), 3);
    }
}
