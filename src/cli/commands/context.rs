//! Context Command
//!
//! Usage:
//!   sbs-discovery context init --org <org> [--force]
//!   sbs-discovery context init --repo [--force]

use crate::cli::ui::Output;
use crate::config::Config;
use crate::discovery::context::{init_org_context, init_repo_context};
use crate::types::{DiscoveryError, Result};

/// Write an org or repository context template
pub fn init(config: &Config, org: Option<&str>, repo: bool, force: bool) -> Result<()> {
    let path = match (org, repo) {
        (Some(org), false) => {
            let dir = config.discovery.org_context_dir().ok_or_else(|| {
                DiscoveryError::Config("Cannot determine org context directory".to_string())
            })?;
            init_org_context(&dir, org, force)?
        }
        (None, true) => init_repo_context(&std::env::current_dir()?, force)?,
        _ => {
            return Err(DiscoveryError::Validation(
                "Specify exactly one of --org <org> or --repo".to_string(),
            ));
        }
    };

    Output::new().success(&format!("Context template written to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_org_context_goes_to_configured_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.discovery.org_context_dir = Some(temp.path().to_path_buf());

        init(&config, Some("acme"), false, false).unwrap();
        assert!(temp.path().join("acme.md").exists());
    }

    #[test]
    fn test_requires_exactly_one_target() {
        let config = Config::default();
        let err = init(&config, None, false, false).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(init(&config, Some("acme"), true, false).is_err());
    }
}
