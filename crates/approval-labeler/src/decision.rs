//! # Approval Decision Engine
//!
//! Turns the counted reviewer states into a single approved / not-approved
//! verdict, and decides which label transition (if any) that verdict implies.

use std::num::NonZeroUsize;

use crate::classifier::{CountedState, ReviewerStateMap};

/// Whether the pull request is approved.
///
/// Approved means at least `threshold` counted reviewers approve and none
/// request changes. A single `CHANGES_REQUESTED` vetoes any number of
/// approvals.
#[must_use]
pub fn decide(states: &ReviewerStateMap, threshold: NonZeroUsize) -> bool {
    let approved = states
        .values()
        .filter(|state| **state == CountedState::Approved)
        .count();
    let changes_requested = states
        .values()
        .filter(|state| **state == CountedState::ChangesRequested)
        .count();

    let mut is_approved = approved >= threshold.get();
    if changes_requested > 0 {
        is_approved = false;
    }
    is_approved
}

/// Label transition for one run. `set` and `remove` are never both true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub set: bool,
    pub remove: bool,
}

impl LabelPlan {
    /// Plan the label change for `is_approved` given whether the label is
    /// already on the pull request.
    #[must_use]
    pub const fn new(is_approved: bool, label_present: bool, remove_when_missing: bool) -> Self {
        Self {
            set: is_approved && !label_present,
            remove: !is_approved && label_present && remove_when_missing,
        }
    }

    /// No-op plan used when labelling is disabled
    #[must_use]
    pub const fn none() -> Self {
        Self {
            set: false,
            remove: false,
        }
    }
}
