//! # GitHub Collaborator
//!
//! Data model for pull requests, reviews and collaborator permissions, plus the
//! [`PullRequestApi`] trait every run talks through. The reqwest-backed
//! implementation lives in [`client`].

pub mod client;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ConfigError, GitHubError};

pub use client::GitHubClient;

/// Repository coordinates (`owner/repo`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/repo` slug such as `GITHUB_REPOSITORY`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRepository`] unless the slug has exactly
    /// two non-empty segments.
    pub fn parse(slug: &str) -> Result<Self, ConfigError> {
        match slug.trim().split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self::new(*owner, *name)),
            _ => Err(ConfigError::InvalidRepository(slug.to_string())),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A label attached to a pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub name: String,
}

/// The subset of a pull request a run needs
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl PullRequest {
    /// Whether a label with exactly this name is already applied
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }
}

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    /// Any state GitHub adds later
    #[serde(other)]
    Other,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::ChangesRequested => write!(f, "CHANGES_REQUESTED"),
            Self::Commented => write!(f, "COMMENTED"),
            Self::Dismissed => write!(f, "DISMISSED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// A review, in submission order as returned by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: u64,
    /// Login of the reviewer
    pub reviewer: String,
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    #[must_use]
    pub fn new(id: u64, reviewer: impl Into<String>, state: ReviewState) -> Self {
        Self {
            id,
            reviewer: reviewer.into(),
            state,
            submitted_at: None,
        }
    }
}

/// Collaborator permission level on a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Admin,
    Write,
    Read,
    None,
    #[serde(other)]
    Unknown,
}

impl PermissionLevel {
    /// Committers hold `admin` or `write`
    #[must_use]
    pub const fn is_committer(self) -> bool {
        matches!(self, Self::Admin | Self::Write)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
            Self::None => write!(f, "none"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Operations a run performs against the code host.
///
/// Calls are made one at a time; a failing call aborts the run.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Fetch the pull request with its current labels.
    async fn fetch_pull_request(
        &self,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest, GitHubError>;

    /// Fetch every review on the pull request, oldest first.
    async fn fetch_reviews(&self, repo: &Repository, number: u64)
        -> Result<Vec<Review>, GitHubError>;

    /// Fetch a user's permission level on the repository.
    async fn fetch_permission(
        &self,
        repo: &Repository,
        username: &str,
    ) -> Result<PermissionLevel, GitHubError>;

    /// Add a label to the pull request.
    async fn apply_label(
        &self,
        repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError>;

    /// Remove a label from the pull request.
    async fn remove_label(
        &self,
        repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError>;

    /// Post a comment on the pull request conversation.
    async fn post_comment(&self, repo: &Repository, number: u64, body: &str)
        -> Result<(), GitHubError>;
}
