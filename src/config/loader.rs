//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/sbs-discovery/config.toml)
//! 3. Project config (.sbs-discovery/config.toml)
//! 4. Environment variables (SBS_DISCOVERY_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{DiscoveryError, Result};

const ENV_PREFIX: &str = "SBS_DISCOVERY_";
const PROJECT_DIR: &str = ".sbs-discovery";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layered(Self::global_config_path().as_deref(), &Self::project_config_path())
    }

    fn load_layered(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // SBS_DISCOVERY_DISCOVERY__REFERENCE_THRESHOLD -> discovery.reference_threshold
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| DiscoveryError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| DiscoveryError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (honors XDG_CONFIG_HOME)
    pub fn global_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sbs-discovery")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Project data directory (config and database)
    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| DiscoveryError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            DiscoveryError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_template(&global_dir, DEFAULT_GLOBAL_CONFIG, force)
    }

    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_template(&Self::project_dir(), DEFAULT_PROJECT_CONFIG, force)
    }

    fn write_template(dir: &Path, template: &str, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, template)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }
}

const DEFAULT_GLOBAL_CONFIG: &str = r#"# sbs-discovery global configuration
# Project settings in .sbs-discovery/config.toml override these.

version = "1.0"

[llm]
# auto | openai | azure-openai | anthropic
provider = "auto"
timeout_secs = 120
temperature = 0.0

[github]
skip_archived = true
clone_timeout_secs = 300

[workers]
concurrency = 4
"#;

const DEFAULT_PROJECT_CONFIG: &str = r#"# sbs-discovery project configuration

version = "1.0"

[discovery]
reference_threshold = 4
mono_repo_score_threshold = 3
ignored_contributors = ["renovate"]

[storage]
database_path = ".sbs-discovery/discovery.db"
"#;
