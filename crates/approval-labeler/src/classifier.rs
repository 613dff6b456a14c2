//! # Reviewer Classifier
//!
//! Folds a pull request's reviews into the latest counted state per reviewer.
//!
//! Only `APPROVED` and `CHANGES_REQUESTED` reviews count; later reviews from
//! the same reviewer overwrite earlier ones. With committer filtering enabled,
//! each distinct reviewer's permission is looked up once and reviews from
//! anyone without `admin` or `write` are dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use tracing::info;

use crate::error::GitHubError;
use crate::github::{PermissionLevel, PullRequestApi, Repository, Review, ReviewState};

/// A review state that takes part in the approval decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountedState {
    Approved,
    ChangesRequested,
}

impl CountedState {
    /// Map a raw review state, ignoring comments, dismissals and the like
    #[must_use]
    pub const fn from_review_state(state: ReviewState) -> Option<Self> {
        match state {
            ReviewState::Approved => Some(Self::Approved),
            ReviewState::ChangesRequested => Some(Self::ChangesRequested),
            _ => None,
        }
    }
}

impl fmt::Display for CountedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::ChangesRequested => write!(f, "CHANGES_REQUESTED"),
        }
    }
}

/// Latest counted state per reviewer login
pub type ReviewerStateMap = BTreeMap<String, CountedState>;

/// Resolves a reviewer's repository permission
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    async fn permission_level(&self, username: &str) -> Result<PermissionLevel, GitHubError>;
}

/// [`PermissionLookup`] backed by the collaborator permission endpoint
pub struct RepoPermissions<'a> {
    api: &'a dyn PullRequestApi,
    repo: &'a Repository,
}

impl<'a> RepoPermissions<'a> {
    #[must_use]
    pub fn new(api: &'a dyn PullRequestApi, repo: &'a Repository) -> Self {
        Self { api, repo }
    }
}

#[async_trait]
impl PermissionLookup for RepoPermissions<'_> {
    async fn permission_level(&self, username: &str) -> Result<PermissionLevel, GitHubError> {
        self.api.fetch_permission(self.repo, username).await
    }
}

/// Result of classifying a pull request's reviews
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Counted reviewers and their most recent decision
    pub states: ReviewerStateMap,
    /// Reviewers with `admin` or `write`; only populated when filtering
    pub committers: BTreeSet<String>,
}

/// Reduce `reviews` (oldest first) to each counted reviewer's latest state.
///
/// When `require_committer_approval` is set, `lookup` is consulted at most
/// once per distinct reviewer.
///
/// # Errors
/// Propagates the first permission lookup failure.
pub async fn classify(
    reviews: &[Review],
    require_committer_approval: bool,
    lookup: &dyn PermissionLookup,
) -> Result<Classification, GitHubError> {
    let mut classification = Classification::default();
    let mut checked: HashMap<&str, PermissionLevel> = HashMap::new();

    for review in reviews {
        let Some(state) = CountedState::from_review_state(review.state) else {
            continue;
        };
        let reviewer = review.reviewer.as_str();

        if require_committer_approval {
            let level = match checked.get(reviewer) {
                Some(level) => *level,
                None => {
                    let level = lookup.permission_level(reviewer).await?;
                    info!(reviewer = %reviewer, permission = %level, "Reviewer permission");
                    checked.insert(reviewer, level);
                    if level.is_committer() {
                        classification.committers.insert(reviewer.to_string());
                    }
                    level
                }
            };

            if !level.is_committer() {
                continue;
            }
        }

        classification.states.insert(reviewer.to_string(), state);
    }

    for (reviewer, state) in &classification.states {
        info!(reviewer = %reviewer, state = %state, "Counted review");
    }

    Ok(classification)
}
