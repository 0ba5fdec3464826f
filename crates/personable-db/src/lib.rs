//! # personable-db
//!
//! PostgreSQL document store for personable.
//!
//! This crate provides:
//! - Connection pool management
//! - Validated collection naming
//! - Predicate rendering to parameterized SQL
//! - A generic JSONB document collection implementing `Repository`
//! - The lead collection's atomic conversion update (`LeadStore`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use personable_db::{Database, Repository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/personable").await?;
//!     db.ensure_collections().await?;
//!
//!     let leads = db.leads.find_all().await;
//!     println!("{}", leads.kind());
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod leads;
pub mod pool;
pub mod predicate_sql;
pub mod settings;

// Always compiled so integration tests (in tests/) can use it.
pub mod test_fixtures;

// Re-export core types
pub use personable_core::*;

pub use collection::{PgCollection, StoredDocument};
pub use leads::PgLeadRepository;
pub use pool::{log_pool_metrics, open_pool, PoolConfig};
pub use predicate_sql::{PredicateQueryBuilder, QueryParam};
pub use settings::{validate_collection_name, CollectionSettings};

use sqlx::PgPool;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// All collections over one connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
    pub leads: PgLeadRepository,
    pub contacts: PgCollection<Contact>,
    pub users: PgCollection<User>,
}

impl Database {
    /// Bind the collections named in `settings` to `pool`.
    pub fn new(pool: PgPool, settings: &CollectionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            leads: PgCollection::new(pool.clone(), settings.leads.clone())?,
            contacts: PgCollection::new(pool.clone(), settings.contacts.clone())?,
            users: PgCollection::new(pool.clone(), settings.users.clone())?,
            pool,
        })
    }

    /// Connect with the default pool configuration and collection names.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, &PoolConfig::default(), &CollectionSettings::default())
            .await
    }

    pub async fn connect_with(
        database_url: &str,
        config: &PoolConfig,
        settings: &CollectionSettings,
    ) -> Result<Self> {
        let pool = open_pool(database_url, config).await?;
        Self::new(pool, settings)
    }

    /// Create any missing collection tables.
    pub async fn ensure_collections(&self) -> Result<()> {
        self.leads.ensure_table().await?;
        self.contacts.ensure_table().await?;
        self.users.ensure_table().await?;
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        log_pool_metrics(&self.pool);
        Ok(())
    }
}
