pub mod hard;
pub mod soft;

pub use hard::{AndFilter, HardFilter, HardFilterError};
pub use soft::{SoftFilter, TimeSpan};

/// How a freshly-computed filter result combines with an item's existing
/// `active` flag (spec.md 4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Overwrite `active` from the filter result outright. Used for a
    /// full re-apply, e.g. the hard filter's first pass over a fresh scan.
    Set,
    /// `active := active && filter_result`. Used for additive tightening,
    /// e.g. layering a soft filter on top of an already-hard-filtered tree
    /// without reviving anything the hard filter excluded.
    And,
}

impl FilterStrategy {
    pub fn apply(self, active: bool, filter_result: bool) -> bool {
        match self {
            FilterStrategy::Set => filter_result,
            FilterStrategy::And => active && filter_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_regardless_of_prior_state() {
        assert!(FilterStrategy::Set.apply(false, true));
        assert!(!FilterStrategy::Set.apply(true, false));
    }

    #[test]
    fn and_only_narrows() {
        assert!(!FilterStrategy::And.apply(false, true));
        assert!(FilterStrategy::And.apply(true, true));
        assert!(!FilterStrategy::And.apply(true, false));
    }
}
