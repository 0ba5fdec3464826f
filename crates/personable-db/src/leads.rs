//! Lead collection with the single-statement conversion update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use personable_core::{
    already_converted_message, Error, Lead, LeadDetails, LeadStore, Outcome, Result,
};

use crate::collection::PgCollection;

/// Lead collection.
pub type PgLeadRepository = PgCollection<Lead>;

/// Why a conversion update matched no row.
enum ConvertMiss {
    Missing,
    AlreadyConverted,
}

impl PgCollection<Lead> {
    /// Flip `converted` and record the pending marker in one `UPDATE`.
    ///
    /// The `converted = false` guard in the `WHERE` clause is what makes two
    /// racing conversions produce a single winner.
    async fn convert_in_place(
        &self,
        id: Uuid,
        actor: Uuid,
        now: DateTime<Utc>,
        contact_id: Uuid,
    ) -> Result<std::result::Result<Lead, ConvertMiss>> {
        let patch = json!({
            "converted": true,
            "modifiedBy": actor,
            "pendingConversion": {
                "contactId": contact_id,
                "convertedBy": actor,
                "since": now,
            },
        });

        let doc: Option<JsonValue> = sqlx::query_scalar(&format!(
            r#"
            UPDATE {}
            SET doc = doc || $2::jsonb || jsonb_build_object(
                'lastModifiedTime',
                GREATEST((doc->>'createdTime')::timestamptz, $3::timestamptz)
            )
            WHERE id = $1
              AND COALESCE((doc->>'converted')::boolean, false) = false
            RETURNING doc
            "#,
            self.table
        ))
        .bind(id)
        .bind(patch)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match doc {
            Some(doc) => Ok(Ok(serde_json::from_value(doc)?)),
            None if self.exists(id).await? => Ok(Err(ConvertMiss::AlreadyConverted)),
            None => Ok(Err(ConvertMiss::Missing)),
        }
    }

    /// Merge the editable fields over the stored document in one `UPDATE`.
    ///
    /// Only top-level keys present in the patch are replaced, so
    /// `converted` and `pendingConversion` keep the value they have at
    /// write time. Absent optionals are written as JSON null.
    async fn merge_details(
        &self,
        id: Uuid,
        details: &LeadDetails,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let mut patch = serde_json::to_value(details)?;
        if let Some(fields) = patch.as_object_mut() {
            fields.insert("modifiedBy".to_string(), json!(actor));
        }

        let doc: Option<JsonValue> = sqlx::query_scalar(&format!(
            r#"
            UPDATE {}
            SET doc = doc || $2::jsonb || jsonb_build_object(
                'lastModifiedTime',
                GREATEST((doc->>'createdTime')::timestamptz, $3::timestamptz)
            )
            WHERE id = $1
            RETURNING doc
            "#,
            self.table
        ))
        .bind(id)
        .bind(patch)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        doc.map(|d| serde_json::from_value(d).map_err(Error::from))
            .transpose()
    }

    async fn remove_pending_marker(&self, id: Uuid) -> Result<Option<Lead>> {
        let doc: Option<JsonValue> = sqlx::query_scalar(&format!(
            "UPDATE {} SET doc = doc - 'pendingConversion' WHERE id = $1 RETURNING doc",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        doc.map(|d| serde_json::from_value(d).map_err(Error::from))
            .transpose()
    }
}

#[async_trait]
impl LeadStore for PgCollection<Lead> {
    async fn mark_converted(
        &self,
        id: Uuid,
        actor: Uuid,
        now: DateTime<Utc>,
        contact_id: Uuid,
    ) -> Outcome<Lead> {
        match self.convert_in_place(id, actor, now, contact_id).await {
            Ok(Ok(lead)) => {
                debug!(subsystem = "db", collection = %self.table, op = "mark_converted", record_id = %id, "Lead marked converted");
                Outcome::Successful(lead)
            }
            Ok(Err(ConvertMiss::AlreadyConverted)) => {
                Outcome::bad_request(already_converted_message(id))
            }
            Ok(Err(ConvertMiss::Missing)) => Outcome::NotFound,
            Err(err) => self.settle("mark_converted", Some(id), Err(err)),
        }
    }

    async fn update_details(
        &self,
        id: Uuid,
        details: LeadDetails,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Outcome<Lead> {
        match self.merge_details(id, &details, actor, now).await {
            Ok(Some(lead)) => {
                debug!(subsystem = "db", collection = %self.table, op = "update_details", record_id = %id, "Lead details updated");
                Outcome::Successful(lead)
            }
            Ok(None) => Outcome::NotFound,
            Err(err) => self.settle("update_details", Some(id), Err(err)),
        }
    }

    async fn clear_pending_conversion(&self, id: Uuid) -> Outcome<Lead> {
        match self.remove_pending_marker(id).await {
            Ok(Some(lead)) => Outcome::Successful(lead),
            Ok(None) => Outcome::NotFound,
            Err(err) => self.settle("clear_pending_conversion", Some(id), Err(err)),
        }
    }
}
