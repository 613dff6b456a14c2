//! Integration tests for whole approval runs.
//!
//! These drive `evaluate_pull_request` and `run` against an in-memory GitHub
//! double that records every call.

use std::collections::HashMap;
use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use approval_labeler::github::Label;
use approval_labeler::{
    evaluate_pull_request, run, ApprovalSettings, Config, ConfigError, GitHubError, PermissionLevel,
    PullRequest, PullRequestApi, Repository, Review, ReviewState, RunError, RunOutcome,
    RunOutputs,
};
use async_trait::async_trait;
use clap::Parser;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    FetchPullRequest(u64),
    FetchReviews(u64),
    FetchPermission(String),
    ApplyLabel(u64, String),
    RemoveLabel(u64, String),
    PostComment(u64, String),
}

#[derive(Default)]
struct FakeGitHub {
    labels: Vec<String>,
    reviews: Vec<Review>,
    permissions: HashMap<String, PermissionLevel>,
    fail_reviews: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeGitHub {
    fn with_reviews(reviews: &[(&str, ReviewState)]) -> Self {
        Self {
            reviews: reviews
                .iter()
                .enumerate()
                .map(|(i, (reviewer, state))| Review::new(i as u64 + 1, *reviewer, *state))
                .collect(),
            ..Self::default()
        }
    }

    fn labelled(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    fn permission(mut self, user: &str, level: PermissionLevel) -> Self {
        self.permissions.insert(user.to_string(), level);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::ApplyLabel(..) | Call::RemoveLabel(..) | Call::PostComment(..)
                )
            })
            .collect()
    }
}

#[async_trait]
impl PullRequestApi for FakeGitHub {
    async fn fetch_pull_request(
        &self,
        _repo: &Repository,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        self.record(Call::FetchPullRequest(number));
        Ok(PullRequest {
            number,
            labels: self
                .labels
                .iter()
                .map(|name| Label { name: name.clone() })
                .collect(),
        })
    }

    async fn fetch_reviews(
        &self,
        _repo: &Repository,
        number: u64,
    ) -> Result<Vec<Review>, GitHubError> {
        self.record(Call::FetchReviews(number));
        if self.fail_reviews {
            return Err(GitHubError::ApiError {
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }
        Ok(self.reviews.clone())
    }

    async fn fetch_permission(
        &self,
        _repo: &Repository,
        username: &str,
    ) -> Result<PermissionLevel, GitHubError> {
        self.record(Call::FetchPermission(username.to_string()));
        Ok(self
            .permissions
            .get(username)
            .copied()
            .unwrap_or(PermissionLevel::Read))
    }

    async fn apply_label(
        &self,
        _repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        self.record(Call::ApplyLabel(number, label.to_string()));
        Ok(())
    }

    async fn remove_label(
        &self,
        _repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        self.record(Call::RemoveLabel(number, label.to_string()));
        Ok(())
    }

    async fn post_comment(
        &self,
        _repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        self.record(Call::PostComment(number, body.to_string()));
        Ok(())
    }
}

fn repo() -> Repository {
    Repository::new("5dlabs", "cto")
}

fn settings(label: &str) -> ApprovalSettings {
    ApprovalSettings {
        label: Some(label.to_string()),
        ..ApprovalSettings::default()
    }
}

mod evaluation {
    use super::*;

    #[tokio::test]
    async fn test_approved_pull_request_gets_label_and_comment() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let settings = ApprovalSettings {
            comment: Some("Ready to merge :tada:".to_string()),
            ..settings("approved")
        };

        let outputs = evaluate_pull_request(&api, &repo(), 12, &settings)
            .await
            .unwrap();

        assert_eq!(
            outputs,
            RunOutputs {
                is_approved: true,
                should_label_be_set: true,
                should_label_be_removed: false,
            }
        );
        assert_eq!(
            api.mutations(),
            vec![
                Call::ApplyLabel(12, "approved".to_string()),
                Call::PostComment(12, "Ready to merge :tada:".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_label_already_present_is_left_alone() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]).labelled("approved");
        let settings = ApprovalSettings {
            comment: Some("hello".to_string()),
            ..settings("approved")
        };

        let outputs = evaluate_pull_request(&api, &repo(), 12, &settings)
            .await
            .unwrap();

        assert!(outputs.is_approved);
        assert!(!outputs.should_label_be_set);
        assert!(!outputs.should_label_be_removed);
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_empty_comment_is_not_posted() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);

        evaluate_pull_request(&api, &repo(), 3, &settings("approved"))
            .await
            .unwrap();

        assert_eq!(
            api.mutations(),
            vec![Call::ApplyLabel(3, "approved".to_string())]
        );
    }

    #[tokio::test]
    async fn test_late_changes_request_wins() {
        let api = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::Approved),
            ("alice", ReviewState::ChangesRequested),
        ]);

        let outputs = evaluate_pull_request(&api, &repo(), 1, &settings("approved"))
            .await
            .unwrap();

        assert!(!outputs.is_approved);
    }

    #[tokio::test]
    async fn test_late_approval_wins() {
        let api = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::ChangesRequested),
            ("alice", ReviewState::Approved),
        ]);

        let outputs = evaluate_pull_request(&api, &repo(), 1, &settings("approved"))
            .await
            .unwrap();

        assert!(outputs.is_approved);
    }

    #[tokio::test]
    async fn test_veto_from_another_reviewer() {
        let api = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::Approved),
            ("bob", ReviewState::ChangesRequested),
        ]);

        let outputs = evaluate_pull_request(&api, &repo(), 1, &settings("approved"))
            .await
            .unwrap();

        assert!(!outputs.is_approved);
        assert!(!outputs.should_label_be_set);
    }

    #[tokio::test]
    async fn test_threshold_of_two() {
        let settings = ApprovalSettings {
            required_approvals: NonZeroUsize::new(2).unwrap(),
            ..settings("approved")
        };

        let one = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let outputs = evaluate_pull_request(&one, &repo(), 1, &settings)
            .await
            .unwrap();
        assert!(!outputs.is_approved);

        let two = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::Approved),
            ("bob", ReviewState::Approved),
        ]);
        let outputs = evaluate_pull_request(&two, &repo(), 1, &settings)
            .await
            .unwrap();
        assert!(outputs.is_approved);
    }

    #[tokio::test]
    async fn test_duplicate_approvals_count_once() {
        let settings = ApprovalSettings {
            required_approvals: NonZeroUsize::new(2).unwrap(),
            ..settings("approved")
        };
        let api = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::Approved),
            ("alice", ReviewState::Approved),
        ]);

        let outputs = evaluate_pull_request(&api, &repo(), 1, &settings)
            .await
            .unwrap();

        assert!(!outputs.is_approved);
    }

    #[tokio::test]
    async fn test_committer_filter_ignores_outside_reviews() {
        let settings = ApprovalSettings {
            require_committers_approval: true,
            ..settings("approved")
        };
        let api = FakeGitHub::with_reviews(&[
            ("outsider", ReviewState::Approved),
            ("outsider", ReviewState::Approved),
        ])
        .permission("outsider", PermissionLevel::Read);

        let outputs = evaluate_pull_request(&api, &repo(), 9, &settings)
            .await
            .unwrap();

        assert!(!outputs.is_approved);
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_committer_filter_drops_outside_veto() {
        let settings = ApprovalSettings {
            require_committers_approval: true,
            ..settings("approved")
        };
        let api = FakeGitHub::with_reviews(&[
            ("maintainer", ReviewState::Approved),
            ("outsider", ReviewState::ChangesRequested),
        ])
        .permission("maintainer", PermissionLevel::Admin);

        let outputs = evaluate_pull_request(&api, &repo(), 9, &settings)
            .await
            .unwrap();

        assert!(outputs.is_approved);
        assert!(outputs.should_label_be_set);
    }

    #[tokio::test]
    async fn test_permission_checked_once_per_reviewer() {
        let settings = ApprovalSettings {
            require_committers_approval: true,
            ..settings("approved")
        };
        let api = FakeGitHub::with_reviews(&[
            ("alice", ReviewState::ChangesRequested),
            ("bob", ReviewState::Approved),
            ("alice", ReviewState::Approved),
            ("bob", ReviewState::Approved),
            ("alice", ReviewState::Approved),
        ])
        .permission("alice", PermissionLevel::Write)
        .permission("bob", PermissionLevel::Write);

        evaluate_pull_request(&api, &repo(), 5, &settings)
            .await
            .unwrap();

        let lookups: Vec<Call> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::FetchPermission(_)))
            .collect();
        assert_eq!(
            lookups,
            vec![
                Call::FetchPermission("alice".to_string()),
                Call::FetchPermission("bob".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_label_removed_when_approval_missing() {
        let settings = ApprovalSettings {
            remove_label_when_approval_missing: true,
            ..settings("approved")
        };
        let api =
            FakeGitHub::with_reviews(&[("alice", ReviewState::ChangesRequested)]).labelled("approved");

        let outputs = evaluate_pull_request(&api, &repo(), 4, &settings)
            .await
            .unwrap();

        assert_eq!(
            outputs,
            RunOutputs {
                is_approved: false,
                should_label_be_set: false,
                should_label_be_removed: true,
            }
        );
        assert_eq!(
            api.mutations(),
            vec![Call::RemoveLabel(4, "approved".to_string())]
        );
    }

    #[tokio::test]
    async fn test_label_kept_without_remove_flag() {
        let api =
            FakeGitHub::with_reviews(&[("alice", ReviewState::ChangesRequested)]).labelled("approved");

        let outputs = evaluate_pull_request(&api, &repo(), 4, &settings("approved"))
            .await
            .unwrap();

        assert!(!outputs.should_label_be_set);
        assert!(!outputs.should_label_be_removed);
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_labelling_disabled_still_reports_approval() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let settings = ApprovalSettings {
            comment: Some("hello".to_string()),
            ..ApprovalSettings::default()
        };

        let outputs = evaluate_pull_request(&api, &repo(), 4, &settings)
            .await
            .unwrap();

        assert!(outputs.is_approved);
        assert!(!outputs.should_label_be_set);
        assert!(!outputs.should_label_be_removed);
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_aborts_before_side_effects() {
        let api = FakeGitHub {
            fail_reviews: true,
            ..FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)])
        };

        let err = evaluate_pull_request(&api, &repo(), 4, &settings("approved"))
            .await
            .unwrap_err();

        assert!(matches!(err, GitHubError::ApiError { status: 502, .. }));
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_same_inputs_same_outputs() {
        let reviews = [
            ("alice", ReviewState::Approved),
            ("bob", ReviewState::Commented),
            ("carol", ReviewState::Approved),
        ];
        let first = evaluate_pull_request(
            &FakeGitHub::with_reviews(&reviews),
            &repo(),
            2,
            &settings("approved"),
        )
        .await
        .unwrap();
        let second = evaluate_pull_request(
            &FakeGitHub::with_reviews(&reviews),
            &repo(),
            2,
            &settings("approved"),
        )
        .await
        .unwrap();

        assert_eq!(first, second);
    }
}

mod trigger_context {
    use super::*;

    fn config(args: &[&str]) -> Config {
        let mut argv = vec![
            "approval-labeler",
            "--token",
            "ghs_test",
            "--repository",
            "5dlabs/cto",
            "--label",
            "approved",
        ];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_workflow_run_without_number_is_soft_exit() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let config = config(&["--event-name", "workflow_run"]);

        let outcome = run(&config, &api).await.unwrap();

        assert_eq!(outcome, RunOutcome::Skipped);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_workflow_run_with_explicit_number() {
        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let config = config(&["--event-name", "workflow_run", "--pull-request-number", "88"]);

        let outcome = run(&config, &api).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Completed(outputs) if outputs.is_approved));
        assert_eq!(api.calls()[0], Call::FetchPullRequest(88));
    }

    #[tokio::test]
    async fn test_pull_request_review_reads_payload() {
        let mut payload = NamedTempFile::new().unwrap();
        payload
            .write_all(br#"{"action":"submitted","review":{"state":"approved"},"pull_request":{"number":31}}"#)
            .unwrap();
        let path = payload.path().to_str().unwrap().to_string();

        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let config = config(&["--event-name", "pull_request_review", "--event-path", &path]);

        let outcome = run(&config, &api).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(
            api.mutations(),
            vec![Call::ApplyLabel(31, "approved".to_string())]
        );
    }

    #[tokio::test]
    async fn test_pull_request_review_ignores_malformed_explicit_number() {
        let mut payload = NamedTempFile::new().unwrap();
        payload
            .write_all(br#"{"pull_request":{"number":31}}"#)
            .unwrap();
        let path = payload.path().to_str().unwrap().to_string();

        let api = FakeGitHub::with_reviews(&[("alice", ReviewState::Approved)]);
        let config = config(&[
            "--event-name",
            "pull_request_review",
            "--event-path",
            &path,
            "--pull-request-number",
            "abc",
        ]);

        let outcome = run(&config, &api).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Completed(outputs) if outputs.is_approved));
        assert_eq!(api.calls()[0], Call::FetchPullRequest(31));
    }

    #[tokio::test]
    async fn test_workflow_run_with_malformed_number_is_fatal() {
        let api = FakeGitHub::default();
        let config = config(&["--event-name", "workflow_run", "--pull-request-number", "abc"]);

        let err = run(&config, &api).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::InvalidInput {
                name: "pullRequestNumber",
                ..
            })
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_is_fatal_before_soft_exit() {
        let api = FakeGitHub::default();
        let config = Config::try_parse_from([
            "approval-labeler",
            "--token",
            "",
            "--repository",
            "5dlabs/cto",
            "--event-name",
            "workflow_run",
        ])
        .unwrap();

        let err = run(&config, &api).await.unwrap_err();

        assert!(matches!(err, RunError::Config(ConfigError::MissingToken)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_review_without_pull_request_is_fatal() {
        let mut payload = NamedTempFile::new().unwrap();
        payload.write_all(br#"{"action":"submitted"}"#).unwrap();
        let path = payload.path().to_str().unwrap().to_string();

        let api = FakeGitHub::default();
        let config = config(&["--event-name", "pull_request_review", "--event-path", &path]);

        let err = run(&config, &api).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::MissingPullRequest { .. })
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_event_is_fatal() {
        let api = FakeGitHub::default();
        let config = config(&["--event-name", "push", "--pull-request-number", "1"]);

        let err = run(&config, &api).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::UnsupportedEvent(ref name)) if name == "push"
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_api_errors_surface_as_run_errors() {
        let api = FakeGitHub {
            fail_reviews: true,
            ..FakeGitHub::default()
        };
        let config = config(&["--event-name", "workflow_run", "--pull-request-number", "2"]);

        let err = run(&config, &api).await.unwrap_err();

        assert!(matches!(err, RunError::GitHub(_)));
        assert_eq!(err.to_string(), "GitHub API error: 502 - Bad Gateway");
    }
}
