//! Database Command
//!
//! Usage:
//!   sbs-discovery db init

use crate::cli::ui::Output;
use crate::config::Config;
use crate::storage::Database;
use crate::types::Result;

/// Create the schema at the configured database path
pub fn init(config: &Config) -> Result<()> {
    let path = &config.storage.database_path;
    let db = Database::open(path)?;
    db.initialize()?;

    Output::new().success(&format!(
        "Database ready (schema v{})",
        db.schema_version()?
    ));
    println!("  Path: {}", path.display());
    Ok(())
}
