//! # Retry policies.
//!
//! A [`Retryer`] decides, for each failure of a stream, whether the stream is
//! resurrected (re-woken on a later tick with the same input) or the failure
//! continues to the failure branch.
//!
//! Every built-in retryer spends from a [`TrialBudget`]:
//! - a failure the policy does not accept never consumes a trial;
//! - with `max = Some(m)` the policy accepts at most `m` failures, so the work
//!   runs at most `m + 1` times and the condition is asked at most `m` times;
//! - `max = None` retries for as long as the condition accepts;
//! - the budget refills when the stream closes successfully.

use crate::error::{ErrorKind, StreamError};

/// Policy consulted when a stream fails.
pub trait Retryer: 'static {
    /// Returns `true` if the stream should run again after `error`.
    fn verify(&mut self, error: &StreamError) -> bool;

    /// Forgets consumed trials (called on successful close).
    fn reset(&mut self);
}

/// Trial counter shared by the built-in retryers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialBudget {
    max: Option<u32>,
    used: u32,
}

impl TrialBudget {
    /// Creates a budget of `max` trials (`None` = infinite).
    pub fn new(max: Option<u32>) -> Self {
        Self { max, used: 0 }
    }

    /// Trials consumed so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Returns `true` while at least one trial is left.
    pub fn has_remaining(&self) -> bool {
        self.max.map_or(true, |max| self.used < max)
    }

    /// Consumes a trial if one is left and `accept` agrees.
    ///
    /// `accept` is not called once the budget is exhausted.
    pub fn spend(&mut self, accept: impl FnOnce() -> bool) -> bool {
        if !self.has_remaining() || !accept() {
            return false;
        }
        self.used += 1;
        true
    }

    /// Refills the budget.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

/// Retries while a condition accepts the error.
pub struct ConditionRetryer<F> {
    condition: F,
    budget: TrialBudget,
}

impl<F> ConditionRetryer<F>
where
    F: FnMut(&StreamError) -> bool + 'static,
{
    /// Creates the retryer.
    pub fn new(condition: F, max_trials: Option<u32>) -> Self {
        Self {
            condition,
            budget: TrialBudget::new(max_trials),
        }
    }
}

impl<F> Retryer for ConditionRetryer<F>
where
    F: FnMut(&StreamError) -> bool + 'static,
{
    fn verify(&mut self, error: &StreamError) -> bool {
        let condition = &mut self.condition;
        self.budget.spend(|| condition(error))
    }

    fn reset(&mut self) {
        self.budget.reset();
    }
}

/// Retries errors classified as one of the given kinds.
#[derive(Debug, Clone)]
pub struct KindRetryer {
    kinds: Vec<ErrorKind>,
    budget: TrialBudget,
}

impl KindRetryer {
    /// Creates the retryer.
    pub fn new(kinds: impl IntoIterator<Item = ErrorKind>, max_trials: Option<u32>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            budget: TrialBudget::new(max_trials),
        }
    }
}

impl Retryer for KindRetryer {
    fn verify(&mut self, error: &StreamError) -> bool {
        let kinds = &self.kinds;
        self.budget.spend(|| kinds.contains(&error.kind()))
    }

    fn reset(&mut self) {
        self.budget.reset();
    }
}

/// Retries dynamically named errors whose name is in the given set.
#[derive(Debug, Clone)]
pub struct NameRetryer {
    names: Vec<String>,
    budget: TrialBudget,
}

impl NameRetryer {
    /// Creates the retryer.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>, max_trials: Option<u32>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            budget: TrialBudget::new(max_trials),
        }
    }
}

impl Retryer for NameRetryer {
    fn verify(&mut self, error: &StreamError) -> bool {
        let names = &self.names;
        self.budget
            .spend(|| error.name().is_some_and(|n| names.iter().any(|m| m == n)))
    }

    fn reset(&mut self) {
        self.budget.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_bounds_condition_calls() {
        let mut calls = 0;
        let mut r = ConditionRetryer::new(
            move |_: &StreamError| {
                calls += 1;
                calls <= 100
            },
            Some(2),
        );
        let e = StreamError::runtime("x");

        assert!(r.verify(&e));
        assert!(r.verify(&e));
        assert!(!r.verify(&e));
        assert_eq!(r.budget.used(), 2);
    }

    #[test]
    fn test_rejected_error_consumes_no_trial() {
        let mut r = KindRetryer::new([ErrorKind::Logic, ErrorKind::Runtime], Some(1));

        assert!(!r.verify(&StreamError::new(ErrorKind::Overflow, "o")));
        assert_eq!(r.budget.used(), 0);
        assert!(r.verify(&StreamError::logic("l")));
        assert!(!r.verify(&StreamError::runtime("r")));
    }

    #[test]
    fn test_infinite_budget() {
        let mut r = ConditionRetryer::new(|_: &StreamError| true, None);
        let e = StreamError::runtime("x");
        for _ in 0..1000 {
            assert!(r.verify(&e));
        }
    }

    #[test]
    fn test_reset_refills() {
        let mut r = KindRetryer::new([ErrorKind::Runtime], Some(1));
        let e = StreamError::runtime("x");
        assert!(r.verify(&e));
        assert!(!r.verify(&e));
        r.reset();
        assert!(r.verify(&e));
    }

    #[test]
    fn test_name_retryer_matches_script_errors_only() {
        let mut r = NameRetryer::new(["Timeout"], None);
        assert!(r.verify(&StreamError::script("Timeout", "slow", None)));
        assert!(!r.verify(&StreamError::script("Other", "slow", None)));
        assert!(!r.verify(&StreamError::runtime("Timeout")));
    }
}
