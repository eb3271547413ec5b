//! Team ownership from CODEOWNERS

use async_trait::async_trait;
use tracing::{debug, info};

use super::{EnrichmentContext, EnrichmentStage};
use crate::ai::agents::OwnersAgent;
use crate::ai::agents::owners::teams_for;
use crate::types::{Result, SelfBuiltComponent};

/// Where GitHub looks for CODEOWNERS, in lookup order
pub const CODEOWNERS_LOCATIONS: &[&str] = &["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

pub struct OwnersStage;

#[async_trait]
impl EnrichmentStage for OwnersStage {
    fn name(&self) -> &'static str {
        "owners"
    }

    async fn enrich(
        &self,
        ctx: &EnrichmentContext<'_>,
        components: &[SelfBuiltComponent],
    ) -> Result<Vec<SelfBuiltComponent>> {
        let Some(path) = CODEOWNERS_LOCATIONS
            .iter()
            .find(|p| ctx.snapshot.exists(p))
        else {
            debug!("No CODEOWNERS file");
            return Ok(components.to_vec());
        };

        let content = ctx.snapshot.read_to_string(path)?;
        let entries = OwnersAgent::extract(ctx.provider, &content).await?;
        info!(path, entries = entries.len(), "CODEOWNERS parsed");

        let mut enriched = components.to_vec();
        for component in &mut enriched {
            if let Some(teams) = teams_for(&entries, &component.name) {
                component.owner.teams = teams;
            }
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

    #[tokio::test]
    async fn test_assigns_specific_and_default_teams() {
        let (temp, snapshot) = repo(&[(
            ".github/CODEOWNERS",
            "* @acme/platform\n/services/payments/ @acme/pay\n",
        )]);
        let provider = ScriptedProvider::new(vec![
            r#"{"owners": [{"service": "*", "owner_team": "@acme/platform"}, {"service": "/services/payments/", "owner_team": "@acme/pay"}]}"#,
        ]);
        let settings = DiscoveryConfig::default();
        let ctx = context(&provider, &snapshot, temp.path(), &settings);

        let components = vec![
            SelfBuiltComponent::new("payments", "services/payments"),
            SelfBuiltComponent::new("search", "services/search"),
        ];
        let out = OwnersStage.enrich(&ctx, &components).await.unwrap();

        assert_eq!(out[0].owner.teams, vec!["@acme/pay"]);
        assert_eq!(out[1].owner.teams, vec!["@acme/platform"]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_codeowners_no_call() {
        let (temp, snapshot) = repo(&[("README.md", "")]);
        let provider = ScriptedProvider::failing();
        let settings = DiscoveryConfig::default();
        let ctx = context(&provider, &snapshot, temp.path(), &settings);

        let components = vec![SelfBuiltComponent::new("x", "")];
        let out = OwnersStage.enrich(&ctx, &components).await.unwrap();
        assert_eq!(out, components);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_stage_error() {
        let (temp, snapshot) = repo(&[("CODEOWNERS", "* @x")]);
        let provider = ScriptedProvider::failing();
        let settings = DiscoveryConfig::default();
        let ctx = context(&provider, &snapshot, temp.path(), &settings);
        assert!(
            OwnersStage
                .enrich(&ctx, &[SelfBuiltComponent::new("x", "")])
                .await
                .is_err()
        );
    }
}
