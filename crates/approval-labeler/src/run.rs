//! # Run Orchestration
//!
//! One run: resolve the pull request, classify its reviews, decide, then apply
//! the label / comment side effects. Every API call is awaited in turn and the
//! first failure aborts the run.

use tracing::{info, warn};

use crate::classifier::{classify, RepoPermissions};
use crate::config::{ApprovalSettings, Config};
use crate::context::resolve_pull_request_number;
use crate::decision::{decide, LabelPlan};
use crate::error::{GitHubError, RunError};
use crate::github::{PullRequestApi, Repository};
use crate::outputs::RunOutputs;

/// Warning logged when a run has no pull request to look at
pub const MISSING_NUMBER_WARNING: &str =
    "No pull request number was provided for a workflow_run event; nothing to do";

/// How a run finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The pull request was evaluated
    Completed(RunOutputs),
    /// No pull request number was available; nothing was evaluated
    Skipped,
}

/// Evaluate one pull request and apply the resulting label changes.
///
/// # Errors
/// Propagates the first GitHub API failure.
pub async fn evaluate_pull_request(
    api: &dyn PullRequestApi,
    repo: &Repository,
    number: u64,
    settings: &ApprovalSettings,
) -> Result<RunOutputs, GitHubError> {
    let pull_request = api.fetch_pull_request(repo, number).await?;
    let reviews = api.fetch_reviews(repo, number).await?;
    info!(
        pr = number,
        reviews = reviews.len(),
        "Evaluating pull request reviews"
    );

    let permissions = RepoPermissions::new(api, repo);
    let classification =
        classify(&reviews, settings.require_committers_approval, &permissions).await?;
    let is_approved = decide(&classification.states, settings.required_approvals);
    info!(
        pr = number,
        counted = classification.states.len(),
        threshold = settings.required_approvals.get(),
        is_approved,
        "Approval decision"
    );

    let plan = match settings.label.as_deref() {
        Some(label) => LabelPlan::new(
            is_approved,
            pull_request.has_label(label),
            settings.remove_label_when_approval_missing,
        ),
        None => LabelPlan::none(),
    };

    if let Some(label) = settings.label.as_deref() {
        if plan.set {
            api.apply_label(repo, number, label).await?;
            if let Some(comment) = settings.comment.as_deref() {
                api.post_comment(repo, number, comment).await?;
            }
        } else if plan.remove {
            api.remove_label(repo, number, label).await?;
        }
    }

    info!(
        pr = number,
        is_approved,
        label_set = plan.set,
        label_removed = plan.remove,
        "Run complete"
    );

    Ok(RunOutputs {
        is_approved,
        should_label_be_set: plan.set,
        should_label_be_removed: plan.remove,
    })
}

/// Resolve the trigger context from `config` and evaluate the pull request.
///
/// Returns [`RunOutcome::Skipped`] when a `workflow_run` event arrives without
/// a configured pull request number.
///
/// The token is checked first, so a missing token is fatal even when the run
/// would otherwise be skipped.
///
/// # Errors
/// Configuration problems and GitHub API failures abort the run.
pub async fn run(config: &Config, api: &dyn PullRequestApi) -> Result<RunOutcome, RunError> {
    config.token()?;
    let repo = config.repository()?;
    let settings = config.approval_settings()?;

    let Some(number) = resolve_pull_request_number(&config.event_name, config.event_path(), || {
        config.pull_request_number()
    })?
    else {
        warn!("{MISSING_NUMBER_WARNING}");
        return Ok(RunOutcome::Skipped);
    };

    info!(repo = %repo, pr = number, event = %config.event_name, "Resolved pull request");
    let outputs = evaluate_pull_request(api, &repo, number, &settings).await?;
    Ok(RunOutcome::Completed(outputs))
}
