use std::collections::BTreeMap;

use sqlx::Row;

use sparky_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use sparky_core::domain::chat::SessionId;
use sparky_core::domain::lead::LeadId;

use super::{decode_err, format_timestamp, parse_timestamp, AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_category(s: &str) -> AuditCategory {
    match s {
        "chat" => AuditCategory::Chat,
        "dialogue" => AuditCategory::Dialogue,
        "lead" => AuditCategory::Lead,
        "notification" => AuditCategory::Notification,
        _ => AuditCategory::System,
    }
}

fn parse_outcome(s: &str) -> AuditOutcome {
    match s {
        "rejected" => AuditOutcome::Rejected,
        "failed" => AuditOutcome::Failed,
        _ => AuditOutcome::Success,
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let event_id: String = row.try_get("id").map_err(decode_err)?;
    let lead_id: Option<String> = row.try_get("lead_id").map_err(decode_err)?;
    let session_id: Option<String> = row.try_get("session_id").map_err(decode_err)?;
    let correlation_id: String = row.try_get("correlation_id").map_err(decode_err)?;
    let event_type: String = row.try_get("event_type").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let actor: String = row.try_get("actor").map_err(decode_err)?;
    let outcome: String = row.try_get("outcome").map_err(decode_err)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(decode_err)?;
    let occurred_at_str: String = row.try_get("occurred_at").map_err(decode_err)?;

    let metadata: BTreeMap<String, String> =
        serde_json::from_str(&metadata_json).map_err(decode_err)?;

    Ok(AuditEvent {
        event_id,
        lead_id: lead_id.map(LeadId),
        session_id: session_id.map(SessionId),
        correlation_id,
        event_type,
        category: parse_category(&category),
        actor,
        outcome: parse_outcome(&outcome),
        metadata,
        occurred_at: parse_timestamp(&occurred_at_str)?,
    })
}

#[async_trait::async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        let metadata_json = serde_json::to_string(&event.metadata).map_err(decode_err)?;

        sqlx::query(
            "INSERT INTO audit_event (id, lead_id, session_id, correlation_id, event_type,
                                      category, actor, outcome, metadata_json, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.lead_id.as_ref().map(|id| id.0.as_str()))
        .bind(event.session_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(&metadata_json)
        .bind(format_timestamp(&event.occurred_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, lead_id, session_id, correlation_id, event_type, category, actor,
                    outcome, metadata_json, occurred_at
             FROM audit_event WHERE lead_id = ?
             ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(&lead_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }
}
