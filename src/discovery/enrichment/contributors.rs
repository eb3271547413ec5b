//! Individual contributors from git history

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::{EnrichmentContext, EnrichmentStage};
use crate::ai::agents::{ContributorEntry, ContributorsAgent};
use crate::snapshot::run_git;
use crate::types::{Result, SelfBuiltComponent};

static SHORTLOG_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(.*?)\s+<(.+)>$").ok());

/// Parse `git shortlog -sne` output, dropping ignored authors
pub fn parse_shortlog(output: &str, ignored: &[String]) -> Vec<ContributorEntry> {
    let Some(re) = SHORTLOG_LINE.as_ref() else {
        return Vec::new();
    };

    output
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let commits = caps[1].parse().ok()?;
            let name = caps[2].trim().to_string();
            let lowered = name.to_lowercase();
            if ignored.iter().any(|i| lowered.contains(&i.to_lowercase())) {
                return None;
            }
            Some(ContributorEntry {
                commits,
                name,
                email: caps[3].trim().to_string(),
            })
        })
        .collect()
}

pub struct ContributorsStage;

#[async_trait]
impl EnrichmentStage for ContributorsStage {
    fn name(&self) -> &'static str {
        "contributors"
    }

    async fn enrich(
        &self,
        ctx: &EnrichmentContext<'_>,
        components: &[SelfBuiltComponent],
    ) -> Result<Vec<SelfBuiltComponent>> {
        let timeout = Duration::from_secs(ctx.settings.contributors_timeout_secs);
        let mut enriched = components.to_vec();

        for component in &mut enriched {
            let dir = component.dir().to_string();
            let output = run_git(
                ctx.checkout_root,
                &["shortlog", "HEAD", "-sne", "--", &dir],
                timeout,
                None,
            )
            .await?;

            let entries = parse_shortlog(&output, &ctx.settings.ignored_contributors);
            if entries.is_empty() {
                debug!(component = %component.name, "No contributors in history");
                continue;
            }

            component.owner.individuals = match ContributorsAgent::merge(ctx.provider, &entries).await {
                Ok(individuals) => individuals,
                Err(e) => {
                    warn!(component = %component.name, error = %e, "Contributor merge failed, keeping raw authors");
                    entries.into_iter().map(ContributorEntry::into_individual).collect()
                }
            };
        }

        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;
    use crate::config::DiscoveryConfig;
    use crate::discovery::enrichment::test_support::{context, repo};

    const SHORTLOG: &str = "    42\tJane Doe <jane@acme.io>\n     7\trenovate[bot] <bot@renovateapp.com>\n     3\tJ. Doe <jane@users.noreply.github.com>\n";

    #[test]
    fn test_parse_shortlog() {
        let entries = parse_shortlog(SHORTLOG, &["renovate".to_string()]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commits, 42);
        assert_eq!(entries[0].name, "Jane Doe");
        assert_eq!(entries[0].email, "jane@acme.io");
        assert_eq!(entries[1].name, "J. Doe");
    }

    #[test]
    fn test_parse_skips_garbage() {
        assert!(parse_shortlog("not a shortlog line\n\n", &[]).is_empty());
    }

    #[tokio::test]
    async fn test_git_failure_is_stage_error() {
        // plain directory, not a repository
        let (temp, snapshot) = repo(&[("main.go", "")]);
        let provider = ScriptedProvider::failing();
        let settings = DiscoveryConfig::default();
        let ctx = context(&provider, &snapshot, temp.path(), &settings);

        let result = ContributorsStage
            .enrich(&ctx, &[SelfBuiltComponent::new("x", "")])
            .await;
        assert!(result.is_err());
        assert_eq!(provider.call_count(), 0);
    }
}
