//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite store for discovery results:
//! - Connection pooling via r2d2
//! - Panic-safe transactions with automatic rollback
//! - Schema version tracked in `user_version`
//! - WAL mode for concurrent readers while a batch writes

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::types::{
    ComponentType, Confidence, DiscoveryError, LanguageInfo, Owner, ParseWithDefault, RepoType,
    RepositoryOutcome, Result, ResultExt, SelfBuiltComponent, TechStack, log_filter_warn,
};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version
const SCHEMA_VERSION: u32 = 1;

/// Repository attributes written by [`Database::upsert_repository`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub url: String,
    pub organization: Option<String>,
    pub deployable: bool,
    pub repo_type: Option<RepoType>,
    pub repo_type_evidence: String,
    pub signal_files: Vec<String>,
}

impl RepositoryMetadata {
    pub fn from_outcome(outcome: &RepositoryOutcome, organization: Option<String>) -> Self {
        Self {
            url: outcome.url.clone(),
            organization,
            deployable: outcome.deployable,
            repo_type: outcome.repo_type,
            repo_type_evidence: outcome.repo_type_evidence.clone(),
            signal_files: outcome.deployable_signal_files.clone(),
        }
    }
}

/// A stored repository row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRepository {
    pub id: String,
    pub full_name: String,
    pub metadata: RepositoryMetadata,
    pub created_at: String,
    pub updated_at: String,
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 2;
    const MAX_POOL_SIZE: u32 = 16;

    /// One connection per core, clamped
    pub fn auto() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        let max_size = cores.clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE);
        Self {
            max_size,
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (creating parent directories) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(Self::configure_connection);
        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| {
                DiscoveryError::Storage(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        // a second in-memory connection would be a different database
        let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
            DiscoveryError::Storage(format!("Failed to create in-memory pool: {}", e))
        })?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            DiscoveryError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Create tables if missing and record the schema version.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        let current: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);
        if current > SCHEMA_VERSION {
            return Err(DiscoveryError::Storage(format!(
                "Database schema version {} is newer than supported version {}",
                current, SCHEMA_VERSION
            )));
        }

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32> {
        self.conn()?
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .with_context("Failed to read schema version")
    }

    /// Raw connection for inspection.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.conn()
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// If the closure fails or panics the transaction is rolled back and the
    /// pooled connection stays usable.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + std::panic::UnwindSafe,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!(panic = %panic_msg, "Transaction panicked");
                Err(DiscoveryError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    pub fn ensure_organization(&self, name: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT OR IGNORE INTO organizations (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )
            .with_context_fn(|| format!("Failed to record organization {}", name))?;
        Ok(())
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Insert or update a repository by full name and return its id.
    ///
    /// The id is assigned on first insert and kept on every later update.
    pub fn upsert_repository(&self, full_name: &str, metadata: &RepositoryMetadata) -> Result<String> {
        let now = chrono::Utc::now().to_rfc3339();
        let signal_files = serde_json::to_string(&metadata.signal_files)?;
        let repo_type = metadata.repo_type.map(|t| t.as_str());

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO repositories
                (id, full_name, organization, url, deployable, repo_type, repo_type_evidence,
                 signal_files, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(full_name) DO UPDATE SET
                organization = excluded.organization,
                url = excluded.url,
                deployable = excluded.deployable,
                repo_type = excluded.repo_type,
                repo_type_evidence = excluded.repo_type_evidence,
                signal_files = excluded.signal_files,
                updated_at = excluded.updated_at",
            params![
                uuid::Uuid::new_v4().to_string(),
                full_name,
                metadata.organization,
                metadata.url,
                metadata.deployable,
                repo_type,
                metadata.repo_type_evidence,
                signal_files,
                now,
            ],
        )
        .with_context_fn(|| format!("Failed to upsert repository {}", full_name))?;

        conn.query_row(
            "SELECT id FROM repositories WHERE full_name = ?1",
            params![full_name],
            |row| row.get(0),
        )
        .with_context_fn(|| format!("Failed to read id of repository {}", full_name))
    }

    pub fn get_repository(&self, full_name: &str) -> Result<Option<StoredRepository>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, full_name, organization, url, deployable, repo_type,
                        repo_type_evidence, signal_files, created_at, updated_at
                 FROM repositories WHERE full_name = ?1",
                params![full_name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                    ))
                },
            )
            .optional()
            .with_context("Failed to load repository")?;

        let Some((id, full_name, organization, url, deployable, repo_type, evidence, signal_files, created_at, updated_at)) = row
        else {
            return Ok(None);
        };

        Ok(Some(StoredRepository {
            id,
            full_name,
            metadata: RepositoryMetadata {
                url,
                organization,
                deployable,
                repo_type: repo_type.as_deref().map(RepoType::parse_or_default),
                repo_type_evidence: evidence,
                signal_files: serde_json::from_str(&signal_files).unwrap_or_default(),
            },
            created_at,
            updated_at,
        }))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Replace every component of a repository in one transaction.
    pub fn replace_components(
        &self,
        repository_id: &str,
        components: &[SelfBuiltComponent],
    ) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        let rows = components
            .iter()
            .map(|c| -> Result<_> {
                Ok((
                    c,
                    c.language.as_ref().map(serde_json::to_string).transpose()?,
                    serde_json::to_string(&c.owner)?,
                    serde_json::to_string(&c.tech_stacks)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.transaction(|conn| {
            conn.execute(
                "DELETE FROM components WHERE repository_id = ?1",
                params![repository_id],
            )
            .with_context("Failed to delete components")?;

            let mut stmt = conn
                .prepare(
                    "INSERT INTO components
                        (id, repository_id, name, path, display_url, component_type, confidence,
                         evidence, language, owner, tech_stacks, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                )
                .with_context("Failed to prepare component insert")?;

            for (component, language, owner, tech_stacks) in &rows {
                stmt.execute(params![
                    component.id,
                    repository_id,
                    component.name,
                    component.path,
                    component.display_url,
                    component.component_type.to_string(),
                    component.confidence.to_string(),
                    component.evidence,
                    language,
                    owner,
                    tech_stacks,
                    now,
                ])
                .with_context_fn(|| format!("Failed to insert component {}", component.name))?;
            }
            Ok(rows.len())
        })
    }

    pub fn load_components(&self, repository_id: &str) -> Result<Vec<SelfBuiltComponent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, path, display_url, component_type, confidence, evidence,
                    language, owner, tech_stacks
             FROM components WHERE repository_id = ?1 ORDER BY path, name",
        )?;

        let components = stmt
            .query_map(params![repository_id], |row| {
                let language: Option<String> = row.get(7)?;
                let owner: String = row.get(8)?;
                let tech_stacks: String = row.get(9)?;
                Ok(SelfBuiltComponent {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    path: row.get(2)?,
                    display_url: row.get(3)?,
                    component_type: ComponentType::parse_or_default(&row.get::<_, String>(4)?),
                    confidence: Confidence::parse_or_default(&row.get::<_, String>(5)?),
                    evidence: row.get(6)?,
                    language: language
                        .and_then(|l| serde_json::from_str::<LanguageInfo>(&l).ok()),
                    owner: serde_json::from_str::<Owner>(&owner).unwrap_or_default(),
                    tech_stacks: serde_json::from_str::<Vec<TechStack>>(&tech_stacks)
                        .unwrap_or_default(),
                })
            })?
            .filter_map(|r| log_filter_warn(r, "Skipping unreadable component row"))
            .collect();

        Ok(components)
    }

    pub fn count_repositories(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))
            .with_context("Failed to count repositories")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Individual, LanguageInfo};
    use tempfile::TempDir;

    fn db() -> Database {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        db.initialize().expect("Failed to initialize schema");
        db
    }

    fn metadata(deployable: bool) -> RepositoryMetadata {
        RepositoryMetadata {
            url: "https://github.com/acme/shop".into(),
            organization: Some("acme".into()),
            deployable,
            repo_type: Some(RepoType::MonoRepo),
            repo_type_evidence: "manifests=4 dockerfiles=2 dirs_with_hits=3".into(),
            signal_files: vec!["Dockerfile".into()],
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let db = db();
        let conn = db.connection().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        drop(conn);

        assert_eq!(tables, vec!["components", "organizations", "repositories"]);
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        // idempotent
        db.initialize().unwrap();
    }

    #[test]
    fn test_upsert_keeps_id() {
        let db = db();
        db.ensure_organization("acme").unwrap();
        db.ensure_organization("acme").unwrap();

        let first = db.upsert_repository("acme/shop", &metadata(false)).unwrap();
        let second = db.upsert_repository("acme/shop", &metadata(true)).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.count_repositories().unwrap(), 1);

        let stored = db.get_repository("acme/shop").unwrap().unwrap();
        assert!(stored.metadata.deployable);
        assert_eq!(stored.metadata.repo_type, Some(RepoType::MonoRepo));
        assert_eq!(stored.metadata.signal_files, vec!["Dockerfile"]);
        assert!(db.get_repository("acme/other").unwrap().is_none());
    }

    #[test]
    fn test_replace_components() {
        let db = db();
        db.ensure_organization("acme").unwrap();
        let id = db.upsert_repository("acme/shop", &metadata(true)).unwrap();

        let mut api = SelfBuiltComponent::new("api", "services/api")
            .with_confidence(Confidence::High);
        api.language = Some(LanguageInfo {
            name: "Go".into(),
            version: "1.22".into(),
            reason: "go.mod".into(),
        });
        api.owner.teams = vec!["@acme/api".into()];
        api.owner.individuals = vec![Individual {
            name: "Jane".into(),
            github: None,
            emails: vec!["jane@acme.io".into()],
        }];
        let web = SelfBuiltComponent::new("web", "apps/web");

        assert_eq!(db.replace_components(&id, &[api.clone(), web]).unwrap(), 2);
        assert_eq!(db.replace_components(&id, &[api.clone()]).unwrap(), 1);

        let loaded = db.load_components(&id).unwrap();
        assert_eq!(loaded, vec![api]);
    }

    #[test]
    fn test_components_need_repository() {
        let db = db();
        let result = db.replace_components("missing", &[SelfBuiltComponent::new("x", "")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_transaction_panic_safety() {
        let db = db();
        let result = db.transaction(|_conn| {
            panic!("Intentional panic for testing");
            #[allow(unreachable_code)]
            Ok(())
        });

        assert!(result.unwrap_err().to_string().contains("panicked"));
        assert!(db.connection().is_ok());
    }

    #[test]
    fn test_open_file_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/discovery.db");
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        assert!(path.exists());
    }
}
