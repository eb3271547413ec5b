//! GitHub REST Client
//!
//! Lists organization repositories page by page. Rate-limited pages are
//! retried in place with exponential backoff so pagination resumes where it
//! stopped instead of starting over.

use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::GithubConfig;
use crate::constants;
use crate::types::{DiscoveryError, RepoRef, Result};

/// Attempts per page before a transient failure is surfaced
const MAX_PAGE_ATTEMPTS: u32 = 10;

const USER_AGENT: &str = concat!("sbs-discovery/", env!("CARGO_PKG_VERSION"));

/// Repository as returned by the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub owner: GithubOwner,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubOwner {
    pub login: String,
}

impl From<GithubRepo> for RepoRef {
    fn from(repo: GithubRepo) -> Self {
        RepoRef {
            owner: repo.owner.login,
            name: repo.name,
            url: repo.html_url,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            archived: repo.archived,
        }
    }
}

/// Result of fetching one page
#[derive(Debug)]
pub enum PageResult<T> {
    Items(Vec<T>),
    /// Retry the same page after backing off
    RateLimited,
}

// =============================================================================
// Backoff
// =============================================================================

/// Doubling delay with a ceiling, reset after every successful page
#[derive(Debug, Clone)]
pub struct RateLimitBackoff {
    initial: Duration,
    current: Duration,
    max: Duration,
}

impl RateLimitBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            current: initial,
            max,
        }
    }

    /// Delay to sleep now, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = calculate_backoff(self.current, constants::github::BACKOFF_FACTOR, self.max);
        delay + random_jitter(delay)
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}

fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}

/// Whether a response is GitHub's rate limit answer
pub fn is_rate_limited(status: u16, body: &str) -> bool {
    status == 429 || (status == 403 && body.to_lowercase().contains("rate limit"))
}

/// Fetch pages starting at 1 until an empty page.
///
/// Rate-limited pages and transient errors are retried on the same page.
pub async fn paginate<T, F, Fut>(mut backoff: RateLimitBackoff, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PageResult<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let retry_reason = match fetch(page).await {
            Ok(PageResult::Items(batch)) if batch.is_empty() => return Ok(items),
            Ok(PageResult::Items(batch)) => {
                debug!(page, count = batch.len(), "Fetched page");
                items.extend(batch);
                page += 1;
                attempts = 0;
                backoff.reset();
                continue;
            }
            Ok(PageResult::RateLimited) => "rate limited".to_string(),
            Err(e) if e.is_recoverable() && attempts < MAX_PAGE_ATTEMPTS => e.to_string(),
            Err(e) => return Err(e),
        };

        let delay = backoff.next_delay();
        warn!(page, attempt = attempts, delay_ms = delay.as_millis() as u64, reason = %retry_reason, "Retrying page");
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// Client
// =============================================================================

pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<SecretString>,
    per_page: u32,
    max_backoff: Duration,
    skip_archived: bool,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl GithubClient {
    pub fn new(config: &GithubConfig, token: Option<SecretString>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DiscoveryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            per_page: config.per_page,
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            skip_archived: config.skip_archived,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Every repository of an organization, archived ones filtered when configured
    #[instrument(skip(self))]
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<RepoRef>> {
        let backoff = RateLimitBackoff::new(
            Duration::from_secs(constants::github::INITIAL_BACKOFF_SECS),
            self.max_backoff,
        );

        let repos: Vec<GithubRepo> =
            paginate(backoff, |page| self.fetch_org_page(org, page)).await?;
        let total = repos.len();

        let repos: Vec<RepoRef> = repos
            .into_iter()
            .filter(|r| !(self.skip_archived && r.archived))
            .map(RepoRef::from)
            .collect();

        info!(total, selected = repos.len(), "Listed organization repositories");
        Ok(repos)
    }

    async fn fetch_org_page(&self, org: &str, page: u32) -> Result<PageResult<GithubRepo>> {
        let url = format!(
            "{}/orgs/{}/repos?per_page={}&page={}",
            self.api_base, org, self.per_page, page
        );
        let response = self.get(&url).send().await?;
        let status = response.status().as_u16();

        if response.status().is_success() {
            return Ok(PageResult::Items(response.json().await?));
        }

        let body = response.text().await.unwrap_or_default();
        if is_rate_limited(status, &body) {
            return Ok(PageResult::RateLimited);
        }
        if status == 404 {
            return Err(DiscoveryError::NotFound(format!("organization {}", org)));
        }
        Err(DiscoveryError::github(status, body))
    }

    /// A single repository
    #[instrument(skip(self))]
    pub async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoRef> {
        let url = format!("{}/repos/{}/{}", self.api_base, owner, name);
        let response = self.get(&url).send().await?;
        let status = response.status().as_u16();

        if response.status().is_success() {
            let repo: GithubRepo = response.json().await?;
            return Ok(repo.into());
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            404 => Err(DiscoveryError::NotFound(format!("repository {}/{}", owner, name))),
            _ => Err(DiscoveryError::github(status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fast_backoff() -> RateLimitBackoff {
        RateLimitBackoff::new(Duration::from_millis(1), Duration::from_millis(4))
    }

    #[test]
    fn test_backoff_doubles_to_ceiling() {
        let mut backoff =
            RateLimitBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
        let mut seen = Vec::new();
        for _ in 0..8 {
            backoff.next_delay();
            seen.push(backoff.current().as_secs());
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 32, 60, 60, 60]);

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut backoff =
            RateLimitBackoff::new(Duration::from_secs(4), Duration::from_secs(60));
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_secs(4));
        assert!(delay < Duration::from_secs(5));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(429, ""));
        assert!(is_rate_limited(403, "API rate limit exceeded for installation"));
        assert!(!is_rate_limited(403, "Resource not accessible by integration"));
        assert!(!is_rate_limited(500, "rate limit"));
    }

    #[tokio::test]
    async fn test_paginate_retries_same_page() {
        let calls = Mutex::new(Vec::new());
        let result = paginate(fast_backoff(), |page| {
            let attempt = {
                let mut calls = calls.lock().unwrap();
                calls.push(page);
                calls.len()
            };
            async move {
                Ok(match (page, attempt) {
                    (1, _) => PageResult::Items(vec![1, 2]),
                    (2, 2) => PageResult::RateLimited,
                    (2, _) => PageResult::Items(vec![3]),
                    _ => PageResult::Items(vec![]),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec![1, 2, 3]);
        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_fatal_error() {
        let result: Result<Vec<u32>> = paginate(fast_backoff(), |_page| async {
            Err(DiscoveryError::NotFound("organization ghost".into()))
        })
        .await;
        assert!(matches!(result, Err(DiscoveryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_paginate_gives_up_on_persistent_transient_errors() {
        let calls = Mutex::new(0u32);
        let result: Result<Vec<u32>> = paginate(fast_backoff(), |_page| {
            *calls.lock().unwrap() += 1;
            async { Err(DiscoveryError::github(502, "bad gateway")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), MAX_PAGE_ATTEMPTS);
    }

    #[test]
    fn test_repo_conversion() {
        let repo: GithubRepo = serde_json::from_str(
            r#"{"name": "shop", "owner": {"login": "acme"}, "html_url": "https://github.com/acme/shop",
                "default_branch": "develop", "archived": true, "private": false}"#,
        )
        .unwrap();
        let repo: RepoRef = repo.into();
        assert_eq!(repo.full_name(), "acme/shop");
        assert_eq!(repo.default_branch, "develop");
        assert!(repo.archived);
    }

    #[test]
    fn test_debug_redacts_token() {
        let client =
            GithubClient::new(&GithubConfig::default(), Some(SecretString::from("ghp_secret")))
                .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("REDACTED"));
    }
}
