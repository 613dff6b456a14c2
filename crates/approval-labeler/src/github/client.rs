//! # GitHub REST Client
//!
//! reqwest implementation of [`PullRequestApi`]. Rate limit exhaustion and
//! authentication failures are surfaced as typed errors; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, Method, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{PermissionLevel, PullRequest, PullRequestApi, Repository, Review, ReviewState};
use crate::error::GitHubError;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "approval-labeler/1.0";
const API_VERSION: &str = "2022-11-28";
const REVIEWS_PER_PAGE: usize = 100;

/// GitHub API client authenticated with a single token
#[derive(Clone)]
pub struct GitHubClient {
    http_client: HttpClient,
    base_url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    id: u64,
    /// `None` when the reviewer's account was deleted
    user: Option<RawUser>,
    state: ReviewState,
    #[serde(default)]
    submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawPermission {
    permission: PermissionLevel,
}

impl GitHubClient {
    /// Create a client for the given API base URL (e.g. `GITHUB_API_URL`).
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed or the HTTP client cannot
    /// be built.
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, GitHubError> {
        let base_url =
            Url::parse(api_url).map_err(|_| GitHubError::InvalidBaseUrl(api_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidBaseUrl(api_url.to_string()));
        }

        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            token: token.into(),
        })
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GitHubError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GitHubError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, repo: &Repository, rest: &[&str]) -> Result<Url, GitHubError> {
        let mut segments = vec!["repos", repo.owner.as_str(), repo.name.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    /// Send a request and map error statuses to [`GitHubError`]
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Response, GitHubError> {
        let mut request = self
            .http_client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;

        if let Some(remaining) = header_value::<i64>(&response, "x-ratelimit-remaining") {
            debug!(remaining, "GitHub rate limit");
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS)
            && header_value::<i64>(&response, "x-ratelimit-remaining") == Some(0)
        {
            return Err(GitHubError::RateLimitExceeded {
                reset_in: Self::get_rate_limit_reset(&response).unwrap_or(Duration::from_secs(60)),
            });
        }

        let message = Self::error_message(response).await;
        if status == StatusCode::UNAUTHORIZED {
            return Err(GitHubError::AuthenticationFailed(message));
        }

        Err(GitHubError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    /// GitHub's `message` field, or the raw body when it is not JSON
    async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(text) => serde_json::from_str::<GitHubErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or_else(|_| {
                    if text.trim().is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        text
                    }
                }),
            Err(e) => e.to_string(),
        }
    }

    /// Extract rate limit reset time from response
    fn get_rate_limit_reset(response: &Response) -> Option<Duration> {
        header_value::<i64>(response, "x-ratelimit-reset").map(|reset_timestamp| {
            let now = chrono::Utc::now().timestamp();
            #[allow(clippy::cast_sign_loss)]
            let seconds_until_reset = (reset_timestamp - now).max(0) as u64;
            Duration::from_secs(seconds_until_reset)
        })
    }
}

fn header_value<T: std::str::FromStr>(response: &Response, name: &str) -> Option<T> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<T>().ok())
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn fetch_pull_request(
        &self,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        let url = self.repo_endpoint(repo, &["pulls", &number.to_string()])?;
        let pr: PullRequest = self.send(Method::GET, url, None).await?.json().await?;

        debug!("Retrieved {} labels for PR #{}", pr.labels.len(), number);
        Ok(pr)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn fetch_reviews(
        &self,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Review>, GitHubError> {
        let mut reviews = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url = self.repo_endpoint(repo, &["pulls", &number.to_string(), "reviews"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &REVIEWS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let raw: Vec<RawReview> = self.send(Method::GET, url, None).await?.json().await?;
            let count = raw.len();

            reviews.extend(raw.into_iter().filter_map(|review| match review.user {
                Some(user) => Some(Review {
                    id: review.id,
                    reviewer: user.login,
                    state: review.state,
                    submitted_at: review.submitted_at,
                }),
                None => {
                    debug!(review_id = review.id, "Skipping review from deleted account");
                    None
                }
            }));

            if count < REVIEWS_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!("Retrieved {} reviews for PR #{}", reviews.len(), number);
        Ok(reviews)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn fetch_permission(
        &self,
        repo: &Repository,
        username: &str,
    ) -> Result<PermissionLevel, GitHubError> {
        let url = self.repo_endpoint(repo, &["collaborators", username, "permission"])?;
        let raw: RawPermission = self.send(Method::GET, url, None).await?.json().await?;
        Ok(raw.permission)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn apply_label(
        &self,
        repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        let url = self.repo_endpoint(repo, &["issues", &number.to_string(), "labels"])?;
        let body = serde_json::json!({ "labels": [label] });
        self.send(Method::POST, url, Some(body)).await?;

        info!("Added label '{}' to PR #{}", label, number);
        Ok(())
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn remove_label(
        &self,
        repo: &Repository,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        let url = self.repo_endpoint(repo, &["issues", &number.to_string(), "labels", label])?;

        match self.send(Method::DELETE, url, None).await {
            Ok(_) => {
                info!("Removed label '{}' from PR #{}", label, number);
                Ok(())
            }
            Err(GitHubError::ApiError { status: 404, .. }) => {
                debug!(
                    "Label '{}' not found on PR #{} (already removed)",
                    label, number
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, repo, body), fields(repo = %repo))]
    async fn post_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let url = self.repo_endpoint(repo, &["issues", &number.to_string(), "comments"])?;
        let body = serde_json::json!({ "body": body });
        self.send(Method::POST, url, Some(body)).await?;

        info!("Posted comment on PR #{}", number);
        Ok(())
    }
}
