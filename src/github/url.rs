//! GitHub URL and repository-name helpers

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::types::{DiscoveryError, Result};

static REPO_FORMAT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+/[A-Za-z0-9._-]+$").ok());

/// Check an `owner/name` argument
pub fn validate_repo_format(repo: &str) -> Result<(String, String)> {
    if !REPO_FORMAT.as_ref().is_some_and(|re| re.is_match(repo)) {
        return Err(DiscoveryError::Validation(format!(
            "Invalid repository '{}', expected owner/name",
            repo
        )));
    }
    match repo.split_once('/') {
        Some((owner, name)) => Ok((owner.to_string(), name.to_string())),
        None => Err(DiscoveryError::Validation(format!(
            "Invalid repository '{}', expected owner/name",
            repo
        ))),
    }
}

/// `(owner, repo)` of a `https://github.com/<owner>/<repo>[.git]` URL
pub fn parse_github_url(raw: &str) -> Result<(String, String)> {
    let invalid = || DiscoveryError::Validation(format!("Not a GitHub repository URL: {}", raw));

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.host_str() {
        Some("github.com") | Some("www.github.com") => {}
        _ => return Err(invalid()),
    }

    let mut segments = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(invalid)?;
    let repo = segments.next().ok_or_else(invalid)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}

/// Organization of an https or scp-style (`git@github.com:org/repo`) URL
pub fn extract_org(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim();
    if let Some(rest) = trimmed.strip_prefix("git@github.com:") {
        return rest
            .split('/')
            .next()
            .filter(|org| !org.is_empty())
            .map(str::to_string);
    }
    parse_github_url(trimmed).ok().map(|(owner, _)| owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_repo_format() {
        assert_eq!(
            validate_repo_format("acme/shop.api").unwrap(),
            ("acme".to_string(), "shop.api".to_string())
        );
        for bad in ["acme", "acme/shop/x", "/shop", "acme/", "ac me/shop"] {
            let err = validate_repo_format(bad).unwrap_err();
            assert_eq!(err.exit_code(), 5, "{}", bad);
        }
    }

    #[test]
    fn test_parse_github_url() {
        assert_eq!(
            parse_github_url("https://github.com/acme/shop.git").unwrap(),
            ("acme".to_string(), "shop".to_string())
        );
        assert_eq!(
            parse_github_url("https://www.github.com/acme/shop/tree/main/api").unwrap(),
            ("acme".to_string(), "shop".to_string())
        );
        assert!(parse_github_url("https://gitlab.com/acme/shop").is_err());
        assert!(parse_github_url("https://github.com/acme").is_err());
        assert!(parse_github_url("not a url").is_err());
    }

    #[test]
    fn test_extract_org() {
        assert_eq!(extract_org("https://github.com/acme/shop").as_deref(), Some("acme"));
        assert_eq!(extract_org("git@github.com:acme/shop.git").as_deref(), Some("acme"));
        assert_eq!(extract_org("https://example.com/acme/shop"), None);
    }
}
