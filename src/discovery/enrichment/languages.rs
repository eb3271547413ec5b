//! Language detection per component

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{EnrichmentContext, EnrichmentStage};
use crate::ai::agents::{LanguageEvidence, LanguagesAgent};
use crate::snapshot::RepositorySnapshot;
use crate::types::{LanguageInfo, Result, SelfBuiltComponent};

struct LanguageSpec {
    name: &'static str,
    extensions: &'static [&'static str],
    /// Manifest names looked up in the component directory itself
    manifests: &'static [&'static str],
}

const GRADLE_MAVEN: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "pom.xml",
    "gradle.properties",
    "libs.versions.toml",
];

const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec { name: "Kotlin", extensions: &["kt", "kts"], manifests: GRADLE_MAVEN },
    LanguageSpec { name: "Java", extensions: &["java"], manifests: GRADLE_MAVEN },
    LanguageSpec {
        name: "TypeScript",
        extensions: &["ts"],
        manifests: &["package.json", "yarn.lock", "pnpm-lock.yaml", "project.json"],
    },
    LanguageSpec { name: "JavaScript", extensions: &["js"], manifests: &[".node-version"] },
    LanguageSpec {
        name: "Python",
        extensions: &["py"],
        manifests: &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile", "poetry.lock", "Dockerfile"],
    },
    LanguageSpec { name: "C#", extensions: &["cs"], manifests: &["*.csproj", "*.sln", "packages.config"] },
    LanguageSpec { name: "Go", extensions: &["go"], manifests: &["go.mod"] },
    LanguageSpec { name: "Rust", extensions: &["rs"], manifests: &["Cargo.toml"] },
    LanguageSpec { name: "Ruby", extensions: &["rb"], manifests: &["Gemfile"] },
    LanguageSpec { name: "HCL", extensions: &["tf"], manifests: &[".terraform.lock.hcl", "versions.tf"] },
    LanguageSpec { name: "PHP", extensions: &["php"], manifests: &[] },
    LanguageSpec { name: "Lua", extensions: &["lua"], manifests: &["Dockerfile"] },
];

fn manifest_matches(pattern: &str, file_name: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => file_name.ends_with(suffix),
        None => file_name == pattern,
    }
}

/// Source-file counts and manifests for every language present under `dir`
pub fn collect_language_evidence(
    snapshot: &dyn RepositorySnapshot,
    dir: &str,
) -> Vec<LanguageEvidence> {
    let files = snapshot.files_under(dir);

    LANGUAGES
        .iter()
        .filter_map(|spec| {
            let file_count = files
                .iter()
                .filter(|f| {
                    f.name()
                        .rsplit_once('.')
                        .is_some_and(|(_, ext)| spec.extensions.contains(&ext))
                })
                .count();
            if file_count == 0 {
                return None;
            }

            let manifests = files
                .iter()
                .filter(|f| f.dir() == dir)
                .filter(|f| spec.manifests.iter().any(|m| manifest_matches(m, f.name())))
                .filter_map(|f| match snapshot.read_to_string(&f.path) {
                    Ok(content) => Some((f.path.clone(), content)),
                    Err(e) => {
                        debug!(path = %f.path, error = %e, "Skipping unreadable manifest");
                        None
                    }
                })
                .collect();

            Some(LanguageEvidence {
                language: spec.name.to_string(),
                file_count,
                manifests,
            })
        })
        .collect()
}

/// Language with the most source files; ties keep table order
fn most_files(evidence: &[LanguageEvidence]) -> Option<&LanguageEvidence> {
    evidence.iter().reduce(|best, e| if e.file_count > best.file_count { e } else { best })
}

pub struct LanguagesStage;

#[async_trait]
impl EnrichmentStage for LanguagesStage {
    fn name(&self) -> &'static str {
        "languages"
    }

    async fn enrich(
        &self,
        ctx: &EnrichmentContext<'_>,
        components: &[SelfBuiltComponent],
    ) -> Result<Vec<SelfBuiltComponent>> {
        let mut enriched = components.to_vec();

        for component in &mut enriched {
            let dir = component.dir().to_string();
            let evidence = collect_language_evidence(ctx.snapshot, &dir);

            let Some(fallback) = most_files(&evidence) else {
                debug!(component = %component.name, "No source files, language not applicable");
                component.language = Some(LanguageInfo::not_applicable());
                continue;
            };
            let fallback = LanguageInfo {
                name: fallback.language.clone(),
                version: String::new(),
                reason: format!("Most source files ({})", fallback.file_count),
            };

            component.language = match LanguagesAgent::detect(ctx.provider, &component.name, &evidence).await {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(
                        component = %component.name,
                        dir = %dir,
                        error = %e,
                        "Language detection failed, using file counts"
                    );
                    Some(fallback)
                }
            };
        }

        Ok(enriched)
    }
}
