//! # Configuration
//!
//! Command-line options double as GitHub Actions inputs: each option falls
//! back to its `INPUT_*` (or runner-provided `GITHUB_*`) environment variable.
//! The runner passes inputs that were left blank as empty strings, so every
//! optional input treats an empty value as unset.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::{ArgAction, Parser};

use crate::error::ConfigError;
use crate::github::client::DEFAULT_API_URL;
use crate::github::Repository;

/// Label value meaning "do not touch labels"
pub const LABEL_NOT_SET: &str = "not set";

/// Apply or remove an "approved" label based on pull request reviews
#[derive(Parser, Clone)]
#[command(name = "approval-labeler")]
#[command(version, about)]
pub struct Config {
    /// GitHub token used for all API calls
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Label to apply once the pull request is approved
    #[arg(long, env = "INPUT_LABEL", default_value = LABEL_NOT_SET)]
    pub label: String,

    /// Only count reviews from users with write or admin permission
    #[arg(
        long,
        env = "INPUT_REQUIRE_COMMITTERS_APPROVAL",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = parse_input_bool
    )]
    pub require_committers_approval: bool,

    /// Remove the label when the pull request is no longer approved
    #[arg(
        long,
        env = "INPUT_REMOVE_LABEL_WHEN_APPROVAL_MISSING",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = parse_input_bool
    )]
    pub remove_label_when_approval_missing: bool,

    /// Comment to post when the label is newly applied
    #[arg(long, env = "INPUT_COMMENT", default_value = "")]
    pub comment: String,

    /// Pull request number, required for `workflow_run` events
    #[arg(long, env = "INPUT_PULLREQUESTNUMBER")]
    pub pull_request_number: Option<String>,

    /// Number of approving reviews required
    #[arg(long, env = "INPUT_NUMOFAPPROVALS", default_value = "1")]
    pub num_of_approvals: String,

    /// Repository in owner/repo format
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: String,

    /// Name of the event that triggered the workflow
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    pub event_name: String,

    /// Path to the triggering event's JSON payload
    #[arg(
        long,
        env = "GITHUB_EVENT_PATH",
        value_parser = OsStringValueParser::new().map(PathBuf::from)
    )]
    pub event_path: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// File that step outputs are appended to
    #[arg(
        long,
        env = "GITHUB_OUTPUT",
        value_parser = OsStringValueParser::new().map(PathBuf::from)
    )]
    pub output_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(
        short,
        long,
        env = "RUNNER_DEBUG",
        action = ArgAction::Set,
        default_value = "false",
        default_missing_value = "true",
        num_args = 0..=1,
        value_parser = parse_input_bool
    )]
    pub verbose: bool,
}

/// Boolean input spellings accepted by actions; empty means `false`
fn parse_input_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "n" | "off" => Ok(false),
        "true" | "1" | "yes" | "y" | "on" => Ok(true),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl Config {
    /// The API token.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingToken`] when no non-blank token is set.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .and_then(non_blank)
            .ok_or(ConfigError::MissingToken)
    }

    /// Parsed repository coordinates.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRepository`] for malformed slugs.
    pub fn repository(&self) -> Result<Repository, ConfigError> {
        Repository::parse(&self.repository)
    }

    /// Explicitly configured pull request number, if any.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidInput`] when the value is not a number.
    pub fn pull_request_number(&self) -> Result<Option<u64>, ConfigError> {
        let Some(raw) = self.pull_request_number.as_deref().and_then(non_blank) else {
            return Ok(None);
        };
        raw.parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidInput {
                name: "pullRequestNumber",
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    /// Required number of approvals; blank means 1.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidInput`] unless the value is a positive
    /// integer.
    pub fn required_approvals(&self) -> Result<NonZeroUsize, ConfigError> {
        let Some(raw) = non_blank(&self.num_of_approvals) else {
            return Ok(NonZeroUsize::MIN);
        };
        raw.parse::<NonZeroUsize>()
            .map_err(|e| ConfigError::InvalidInput {
                name: "numOfApprovals",
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    /// Event payload path, ignoring a blank value
    #[must_use]
    pub fn event_path(&self) -> Option<&Path> {
        self.event_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Output file path, ignoring a blank value
    #[must_use]
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Run settings derived from the inputs.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidInput`] for a bad approval count.
    pub fn approval_settings(&self) -> Result<ApprovalSettings, ConfigError> {
        Ok(ApprovalSettings {
            label: non_blank(&self.label)
                .filter(|label| *label != LABEL_NOT_SET)
                .map(str::to_string),
            require_committers_approval: self.require_committers_approval,
            remove_label_when_approval_missing: self.remove_label_when_approval_missing,
            comment: non_blank(&self.comment).map(|_| self.comment.clone()),
            required_approvals: self.required_approvals()?,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("label", &self.label)
            .field(
                "require_committers_approval",
                &self.require_committers_approval,
            )
            .field(
                "remove_label_when_approval_missing",
                &self.remove_label_when_approval_missing,
            )
            .field("comment", &self.comment)
            .field("pull_request_number", &self.pull_request_number)
            .field("num_of_approvals", &self.num_of_approvals)
            .field("repository", &self.repository)
            .field("event_name", &self.event_name)
            .field("event_path", &self.event_path)
            .field("api_url", &self.api_url)
            .field("output_file", &self.output_file)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// What a run should count and do, independent of where the inputs came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalSettings {
    /// `None` disables labelling (and therefore commenting)
    pub label: Option<String>,
    pub require_committers_approval: bool,
    pub remove_label_when_approval_missing: bool,
    /// `None` when no comment should be posted
    pub comment: Option<String>,
    pub required_approvals: NonZeroUsize,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            label: None,
            require_committers_approval: false,
            remove_label_when_approval_missing: false,
            comment: None,
            required_approvals: NonZeroUsize::MIN,
        }
    }
}
