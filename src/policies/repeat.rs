//! # Repeat policies.
//!
//! A [`Repeater`] is asked every time a stream closes whether it should run
//! again. The `aborted` flag tells it whether an abort was requested during
//! the run, so repetition can stop cleanly on cancellation.

/// Policy consulted when a stream closes.
pub trait Repeater: 'static {
    /// Returns `true` if the stream should run again.
    fn evaluate(&mut self, aborted: bool) -> bool;
}

/// Repeats while the closure returns `true`.
pub struct RepeatFn<F> {
    f: F,
}

impl<F> RepeatFn<F>
where
    F: FnMut(bool) -> bool + 'static,
{
    /// Wraps the closure; it receives the aborted flag.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Repeater for RepeatFn<F>
where
    F: FnMut(bool) -> bool + 'static,
{
    fn evaluate(&mut self, aborted: bool) -> bool {
        (self.f)(aborted)
    }
}

/// Repeats a fixed number of extra runs, stopping early on abort.
///
/// `RepeatTimes::new(2)` runs the work three times in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTimes {
    remaining: u32,
}

impl RepeatTimes {
    /// Creates the repeater.
    pub fn new(extra_runs: u32) -> Self {
        Self {
            remaining: extra_runs,
        }
    }

    /// Extra runs left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Repeater for RepeatTimes {
    fn evaluate(&mut self, aborted: bool) -> bool {
        if aborted || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_times_counts_down() {
        let mut r = RepeatTimes::new(2);
        assert!(r.evaluate(false));
        assert!(r.evaluate(false));
        assert!(!r.evaluate(false));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_repeat_times_stops_on_abort() {
        let mut r = RepeatTimes::new(5);
        assert!(!r.evaluate(true));
        assert_eq!(r.remaining(), 5);
    }

    #[test]
    fn test_repeat_fn_sees_abort_flag() {
        let mut r = RepeatFn::new(|aborted| !aborted);
        assert!(r.evaluate(false));
        assert!(!r.evaluate(true));
    }
}
