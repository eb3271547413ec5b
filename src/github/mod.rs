//! GitHub access: URL helpers and the REST client used to select repositories

mod client;
mod url;

pub use client::{
    GithubClient, GithubRepo, PageResult, RateLimitBackoff, is_rate_limited, paginate,
};
pub use self::url::{extract_org, parse_github_url, validate_repo_format};
