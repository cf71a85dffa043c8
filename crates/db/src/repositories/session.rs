use sqlx::Row;

use sparky_core::domain::chat::{ChatSession, ChatTurn, SessionId};
use sparky_core::domain::lead::{LeadDraft, LeadId};
use sparky_core::flows::DialogueState;

use super::{decode_err, format_timestamp, parse_timestamp, ChatSessionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChatSessionRepository {
    pool: DbPool,
}

impl SqlChatSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let state_str: String = row.try_get("state").map_err(decode_err)?;
    let draft_json: String = row.try_get("draft_json").map_err(decode_err)?;
    let turns_json: String = row.try_get("turns_json").map_err(decode_err)?;
    let lead_id: Option<String> = row.try_get("lead_id").map_err(decode_err)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at_str: String = row.try_get("updated_at").map_err(decode_err)?;

    let state = DialogueState::parse(&state_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown dialogue state `{state_str}`")))?;
    let draft: LeadDraft = serde_json::from_str(&draft_json).map_err(decode_err)?;
    let turns: Vec<ChatTurn> = serde_json::from_str(&turns_json).map_err(decode_err)?;

    Ok(ChatSession {
        id: SessionId(id),
        state,
        draft,
        turns,
        lead_id: lead_id.map(LeadId),
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl ChatSessionRepository for SqlChatSessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, state, draft_json, turns_json, lead_id, created_at, updated_at
             FROM chat_session WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let draft_json = serde_json::to_string(&session.draft).map_err(decode_err)?;
        let turns_json = serde_json::to_string(&session.turns).map_err(decode_err)?;

        sqlx::query(
            "INSERT INTO chat_session (id, state, draft_json, turns_json, lead_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 state = excluded.state,
                 draft_json = excluded.draft_json,
                 turns_json = excluded.turns_json,
                 lead_id = excluded.lead_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.id.0)
        .bind(session.state.as_str())
        .bind(&draft_json)
        .bind(&turns_json)
        .bind(session.lead_id.as_ref().map(|id| id.0.as_str()))
        .bind(format_timestamp(&session.created_at))
        .bind(format_timestamp(&session.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
