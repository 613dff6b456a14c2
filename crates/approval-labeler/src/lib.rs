//! # approval-labeler
//!
//! Decide whether a pull request has collected enough approving reviews and
//! keep an "approved" label in sync with that decision.
//!
//! ## Example
//!
//! ```no_run
//! use approval_labeler::{evaluate_pull_request, ApprovalSettings, GitHubClient, Repository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GitHubClient::new("https://api.github.com", "ghs_token")?;
//! let repo = Repository::new("5dlabs", "cto");
//! let settings = ApprovalSettings {
//!     label: Some("approved".to_string()),
//!     ..ApprovalSettings::default()
//! };
//!
//! let outputs = evaluate_pull_request(&client, &repo, 1956, &settings).await?;
//! println!("approved: {}", outputs.is_approved);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`classifier`] reduces reviews to each counted reviewer's latest state,
//!   optionally keeping only committers (`admin` / `write`)
//! - [`decision`] turns those states into a verdict and a [`LabelPlan`]
//! - [`run`] wires both to the [`PullRequestApi`] collaborator

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod github;
pub mod outputs;
pub mod run;

pub use classifier::{classify, Classification, CountedState, PermissionLookup, ReviewerStateMap};
pub use config::{ApprovalSettings, Config};
pub use decision::{decide, LabelPlan};
pub use error::{ConfigError, GitHubError, RunError};
pub use github::{
    GitHubClient, PermissionLevel, PullRequest, PullRequestApi, Repository, Review, ReviewState,
};
pub use outputs::RunOutputs;
pub use run::{evaluate_pull_request, run, RunOutcome};
