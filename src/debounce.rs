//! Debounced value emitter
//!
//! Converts a rapidly changing input into a stable value that is emitted only
//! after the input has been quiet for a fixed delay.
//!
//! Example timeline with a 300ms delay:
//! ```text
//! t=0ms:   update("A")    [timer starts]
//! t=100ms: update("AA")   [timer resets, "A" dropped]
//! t=250ms: update("AAP")  [timer resets, "AA" dropped]
//! t=550ms: fire()         [emits "AAP"]
//! ```
//!
//! The debouncer itself never sleeps. The owner asks for [`Debouncer::deadline`],
//! waits until then, and calls [`Debouncer::fire`].

use std::time::Duration;
use tokio::time::Instant;

/// Default quiet period before a query is considered settled
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    /// Latest source value and when it arrived
    pending: Option<(T, Instant)>,
    /// Last value emitted to consumers
    current: T,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// Create a debouncer whose emitted value starts at `initial`
    pub fn new(delay: Duration, initial: T) -> Self {
        Self {
            delay,
            pending: None,
            current: initial,
        }
    }

    /// Record a new source value, restarting the quiet period
    ///
    /// Any previously pending value is dropped.
    pub fn update(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// When the pending value becomes eligible for emission
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// Emit the pending value if its quiet period has elapsed
    ///
    /// Returns `None` while the timer is still running, when nothing is
    /// pending, or when the settled value equals the one already emitted.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        let (value, _) = self.pending.take()?;
        if value == self.current {
            return None;
        }

        self.current = value.clone();
        Some(value)
    }

    /// Drop the pending value without emitting it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// The last emitted value
    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_emits_last_value_once() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300), String::new());

        for (i, value) in ["A", "AA", "AAP", "AAPL"].iter().enumerate() {
            debouncer.update(value.to_string(), start + ms(50 * i as u64));
        }

        // Last update at t=150ms, so nothing before t=450ms
        assert_eq!(debouncer.fire(start + ms(449)), None);
        assert_eq!(debouncer.deadline(), Some(start + ms(450)));

        assert_eq!(debouncer.fire(start + ms(450)), Some("AAPL".to_string()));
        assert_eq!(debouncer.fire(start + ms(900)), None);
        assert_eq!(debouncer.current(), "AAPL");
    }

    #[test]
    fn test_update_restarts_timer() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300), String::new());

        debouncer.update("MS".to_string(), start);
        debouncer.update("MSF".to_string(), start + ms(299));

        assert_eq!(debouncer.fire(start + ms(300)), None);
        assert_eq!(debouncer.fire(start + ms(599)), Some("MSF".to_string()));
    }

    #[test]
    fn test_identical_value_not_reemitted() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300), String::new());

        debouncer.update("TSLA".to_string(), start);
        debouncer.update("TSLA".to_string(), start + ms(10));
        assert_eq!(debouncer.fire(start + ms(310)), Some("TSLA".to_string()));

        debouncer.update("TSLA".to_string(), start + ms(400));
        assert_eq!(debouncer.fire(start + ms(700)), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300), String::new());

        debouncer.update("NVDA".to_string(), start);
        debouncer.cancel();

        assert_eq!(debouncer.deadline(), None);
        assert_eq!(debouncer.fire(start + ms(1000)), None);
        assert_eq!(debouncer.current(), "");
    }

    #[test]
    fn test_zero_delay_emits_immediately() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO, 0u32);

        debouncer.update(7, start);
        assert_eq!(debouncer.fire(start), Some(7));
    }
}
