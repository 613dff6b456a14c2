//! Trigger context: which pull request a run is about.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Kind of workflow event that started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Event payload embeds the pull request.
    ///
    /// Besides `pull_request_review` this accepts `pull_request` and
    /// `pull_request_target`, whose payloads carry the same
    /// `pull_request.number` field.
    EmbeddedPullRequest,
    /// Event carries no pull request; the number must be configured
    ExplicitNumber,
}

impl TriggerKind {
    /// Classify a `GITHUB_EVENT_NAME`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedEvent`] for any other event.
    pub fn from_event_name(event_name: &str) -> Result<Self, ConfigError> {
        match event_name {
            "pull_request" | "pull_request_target" | "pull_request_review" => {
                Ok(Self::EmbeddedPullRequest)
            }
            "workflow_run" => Ok(Self::ExplicitNumber),
            other => Err(ConfigError::UnsupportedEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    pull_request: Option<EmbeddedPullRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedPullRequest {
    number: Option<u64>,
}

/// Read the pull request number out of an event payload file
fn embedded_number(event_name: &str, event_path: Option<&Path>) -> Result<u64, ConfigError> {
    let missing = || ConfigError::MissingPullRequest {
        event: event_name.to_string(),
    };

    let path = event_path.ok_or_else(missing)?;
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::EventPayloadRead {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: EventPayload =
        serde_json::from_str(&raw).map_err(|source| ConfigError::EventPayloadParse {
            path: path.to_path_buf(),
            source,
        })?;

    payload
        .pull_request
        .and_then(|pr| pr.number)
        .ok_or_else(missing)
}

/// Determine the pull request number for this run.
///
/// `explicit_number` is only consulted for events that do not embed a pull
/// request, so a malformed configured number cannot fail a run that never
/// needs it.
///
/// Returns `Ok(None)` for the soft-exit case: an event without an embedded
/// pull request and no explicit number configured.
///
/// # Errors
/// Fails on unsupported events, on embedded-PR events whose payload is
/// missing, unreadable, or has no pull request number, and on an invalid
/// explicit number when one is needed.
pub fn resolve_pull_request_number<F>(
    event_name: &str,
    event_path: Option<&Path>,
    explicit_number: F,
) -> Result<Option<u64>, ConfigError>
where
    F: FnOnce() -> Result<Option<u64>, ConfigError>,
{
    match TriggerKind::from_event_name(event_name)? {
        TriggerKind::EmbeddedPullRequest => {
            let number = embedded_number(event_name, event_path)?;
            debug!(event = event_name, number, "Pull request from event payload");
            Ok(Some(number))
        }
        TriggerKind::ExplicitNumber => explicit_number(),
    }
}
