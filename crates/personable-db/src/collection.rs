//! Generic JSONB document collection.
//!
//! Each collection is a table `(id UUID PRIMARY KEY, doc JSONB NOT NULL)`.
//! The entity's JSON form is stored whole in `doc`, so predicates address the
//! same camelCase paths on the wire and in storage.

use std::marker::PhantomData;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use personable_core::{Document, Error, Outcome, Predicate, Repository, Result};

use crate::predicate_sql::{PredicateQueryBuilder, QueryParam};
use crate::settings::validate_collection_name;

/// Bounds every stored entity satisfies.
pub trait StoredDocument: Document + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<E> StoredDocument for E where E: Document + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// PostgreSQL-backed collection of `E` documents.
pub struct PgCollection<E> {
    pub(crate) pool: PgPool,
    pub(crate) table: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgCollection<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            table: self.table.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: StoredDocument> PgCollection<E> {
    /// Bind a collection to a table. The name must be a valid identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_collection_name(&table)?;
        Ok(Self {
            pool,
            table,
            _entity: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the backing table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        debug!(subsystem = "db", collection = %self.table, op = "ensure_table", "Collection ready");
        Ok(())
    }

    /// Drop the backing table.
    pub async fn drop_table(&self) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            self.table
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    pub async fn query(&self, predicate: &Predicate) -> Result<Vec<E>> {
        let start = Instant::now();
        let (where_sql, params) = PredicateQueryBuilder::new(predicate, 0).build();
        let sql = format!(
            "SELECT doc FROM {} WHERE {} ORDER BY id",
            self.table, where_sql
        );

        let mut q = sqlx::query_scalar::<_, JsonValue>(&sql);
        for param in params {
            q = match param {
                QueryParam::Timestamp(ts) => q.bind(ts),
                QueryParam::String(s) => q.bind(s),
                QueryParam::StringArray(arr) => q.bind(arr),
                QueryParam::Json(v) => q.bind(v),
            };
        }

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        let docs = rows
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Error::from))
            .collect::<Result<Vec<E>>>()?;

        debug!(
            subsystem = "db",
            collection = %self.table,
            op = "query",
            clause_count = predicate.clauses().len(),
            result_count = docs.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(docs)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<E>> {
        let doc: Option<JsonValue> = sqlx::query_scalar(&format!(
            "SELECT doc FROM {} WHERE id = $1",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        doc.map(|d| serde_json::from_value(d).map_err(Error::from))
            .transpose()
    }

    pub async fn create(&self, entity: &E) -> Result<()> {
        let doc = serde_json::to_value(entity)?;
        sqlx::query(&format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2)",
            self.table
        ))
        .bind(entity.id())
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Overwrite an existing document. Returns false when `id` is absent.
    pub async fn overwrite(&self, id: Uuid, entity: &E) -> Result<bool> {
        let doc = serde_json::to_value(entity)?;
        let result = sqlx::query(&format!("UPDATE {} SET doc = $2 WHERE id = $1", self.table))
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a document in one statement.
    ///
    /// The returned row is the acknowledgement: no row means nothing was
    /// stored under `id`, including when a concurrent delete won.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let removed: Option<Uuid> = sqlx::query_scalar(&format!(
            "DELETE FROM {} WHERE id = $1 RETURNING id",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::record_not_found(&self.table, id)),
        }
    }

    /// Fold a storage result into an outcome, logging faults.
    pub(crate) fn settle<T>(&self, op: &'static str, id: Option<Uuid>, result: Result<T>) -> Outcome<T> {
        let outcome = Outcome::from(result);
        if let Outcome::Failed(err) = &outcome {
            error!(
                subsystem = "db",
                collection = %self.table,
                op,
                record_id = ?id,
                error = %err,
                "Storage operation failed"
            );
        }
        outcome
    }
}

#[async_trait]
impl<E: StoredDocument> Repository<E> for PgCollection<E> {
    fn collection(&self) -> &str {
        &self.table
    }

    async fn find_by_predicate(&self, predicate: &Predicate) -> Outcome<Vec<E>> {
        self.settle("find_by_predicate", None, self.query(predicate).await)
    }

    async fn find_by_id(&self, id: Uuid) -> Outcome<E> {
        match self.get(id).await {
            Ok(Some(entity)) => Outcome::Successful(entity),
            Ok(None) => Outcome::NotFound,
            Err(err) => self.settle("find_by_id", Some(id), Err(err)),
        }
    }

    async fn insert(&self, entity: E) -> Outcome<E> {
        let id = entity.id();
        let result = self.create(&entity).await.map(|()| entity);
        self.settle("insert", Some(id), result)
    }

    async fn replace(&self, id: Uuid, entity: E) -> Outcome<E> {
        if entity.id() != id {
            return Outcome::bad_request(format!(
                "Document id {} does not match target id {}",
                entity.id(),
                id
            ));
        }
        match self.overwrite(id, &entity).await {
            Ok(true) => Outcome::Successful(entity),
            Ok(false) => Outcome::NotFound,
            Err(err) => self.settle("replace", Some(id), Err(err)),
        }
    }

    async fn delete(&self, id: Uuid) -> Outcome<bool> {
        let result = self.remove(id).await.map(|()| true);
        self.settle("delete", Some(id), result)
    }
}
