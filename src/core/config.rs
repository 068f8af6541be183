//! # Provider configuration.
//!
//! [`ProviderConfig`] centralizes the knobs of a [`Provider`](crate::Provider).
//!
//! ## Branch policy
//! A stream registers at most one failure and one abortion branch of its own.
//! What happens on a second registration is chosen by [`BranchPolicy`]:
//! - [`BranchPolicy::Reject`] (default): `ChainError::BranchAlreadyRegistered`.
//! - [`BranchPolicy::Override`]: last registration wins; the replaced branch is
//!   eliminated, a warning is logged and `BranchOverridden` is published.

/// What to do when a stream registers a second branch of the same kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BranchPolicy {
    /// Fail fast with a structural error.
    #[default]
    Reject,
    /// Replace the previous branch and eliminate it.
    Override,
}

/// Configuration for a provider.
///
/// ## Field semantics
/// - `branch_policy`: handling of repeated failure/abortion registration
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Handling of a second failure/abortion registration on one stream.
    pub branch_policy: BranchPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl ProviderConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ProviderConfig {
    /// Default configuration:
    ///
    /// - `branch_policy = BranchPolicy::Reject`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            branch_policy: BranchPolicy::Reject,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.branch_policy, BranchPolicy::Reject);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);

        let cfg = ProviderConfig {
            bus_capacity: 0,
            ..ProviderConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
