//! Error types for approval labeling runs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal problems with the run's configuration or trigger context.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token was supplied
    #[error("Input required and not supplied: token")]
    MissingToken,

    /// The workflow was triggered by an event this action cannot handle
    #[error("Unsupported trigger event `{0}`: expected a pull request, pull request review or workflow run event")]
    UnsupportedEvent(String),

    /// The event should embed a pull request but the payload has none
    #[error("Could not find the pull request in the `{event}` event payload")]
    MissingPullRequest { event: String },

    /// An input has a value that cannot be used
    #[error("Invalid value '{value}' for input `{name}`: {reason}")]
    InvalidInput {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Repository slug is not `owner/repo`
    #[error("Invalid repository '{0}', expected 'owner/repo'")]
    InvalidRepository(String),

    /// Event payload file could not be read
    #[error("Failed to read event payload at {path}: {source}")]
    EventPayloadRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Event payload file is not valid JSON
    #[error("Failed to parse event payload at {path}: {source}")]
    EventPayloadParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("GitHub API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limit exceeded, reset in {reset_in:?}")]
    RateLimitExceeded { reset_in: Duration },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid GitHub API URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Anything that aborts a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}
