use chrono::Utc;
use sqlx::Row;

use sparky_core::domain::chat::SessionId;
use sparky_core::domain::lead::{Lead, LeadDraft, LeadFlag, LeadId, LeadStats, LeadStatus};
use sparky_core::errors::DomainError;

use super::{
    decode_err, format_timestamp, parse_timestamp, FlagUpdate, LeadRepository, RepositoryError,
    SessionCapture,
};
use crate::DbPool;

const LEAD_COLUMNS: &str = "id, name, phone, suburb, job_description, status, sms_sent, \
     email_sent, quote_sent, review_requested, created_at";

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts an already-built lead as is. Used by seeding.
    pub async fn insert(&self, lead: &Lead) -> Result<(), RepositoryError> {
        self.insert_row(lead, None).await?;
        Ok(())
    }

    /// Returns false when `session` already owns a lead.
    async fn insert_row(
        &self,
        lead: &Lead,
        session: Option<&SessionId>,
    ) -> Result<bool, RepositoryError> {
        let created_at = format_timestamp(&lead.created_at);
        let result = sqlx::query(
            "INSERT INTO lead (id, name, phone, suburb, job_description, status, sms_sent,
                               email_sent, quote_sent, review_requested, session_id,
                               created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO NOTHING",
        )
        .bind(&lead.id.0)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.suburb)
        .bind(&lead.job_description)
        .bind(lead.status.as_str())
        .bind(lead.sms_sent)
        .bind(lead.email_sent)
        .bind(lead.quote_sent)
        .bind(lead.review_requested)
        .bind(session.map(|id| id.0.as_str()))
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn row_to_lead(row: &sqlx::sqlite::SqliteRow) -> Result<Lead, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let phone: String = row.try_get("phone").map_err(decode_err)?;
    let suburb: Option<String> = row.try_get("suburb").map_err(decode_err)?;
    let job_description: String = row.try_get("job_description").map_err(decode_err)?;
    let status_str: String = row.try_get("status").map_err(decode_err)?;
    let sms_sent: bool = row.try_get("sms_sent").map_err(decode_err)?;
    let email_sent: bool = row.try_get("email_sent").map_err(decode_err)?;
    let quote_sent: bool = row.try_get("quote_sent").map_err(decode_err)?;
    let review_requested: bool = row.try_get("review_requested").map_err(decode_err)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_err)?;

    let status = status_str.parse::<LeadStatus>().map_err(decode_err)?;

    Ok(Lead {
        id: LeadId(id),
        name,
        phone,
        suburb,
        job_description,
        status,
        created_at: parse_timestamp(&created_at_str)?,
        sms_sent,
        email_sent,
        quote_sent,
        review_requested,
    })
}

#[async_trait::async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn create(&self, draft: &LeadDraft) -> Result<Lead, RepositoryError> {
        let lead = Lead::from_draft(LeadId::generate(), draft, Utc::now())?;
        self.insert(&lead).await?;
        Ok(lead)
    }

    async fn create_for_session(
        &self,
        session: &SessionId,
        draft: &LeadDraft,
    ) -> Result<SessionCapture, RepositoryError> {
        let lead = Lead::from_draft(LeadId::generate(), draft, Utc::now())?;
        if self.insert_row(&lead, Some(session)).await? {
            return Ok(SessionCapture { lead, created: true });
        }

        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM lead WHERE session_id = ?"))
            .bind(&session.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(SessionCapture { lead: row_to_lead(&row)?, created: false })
    }

    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM lead WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_lead(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Lead>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {LEAD_COLUMNS} FROM lead ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_lead).collect::<Result<Vec<_>, _>>()
    }

    async fn stats(&self) -> Result<LeadStats, RepositoryError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM lead GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut stats = LeadStats::default();
        for row in &rows {
            let status_str: String = row.try_get("status").map_err(decode_err)?;
            let count: i64 = row.try_get("count").map_err(decode_err)?;
            let count = u64::try_from(count).map_err(decode_err)?;
            stats.total_leads += count;
            match status_str.parse::<LeadStatus>().map_err(decode_err)? {
                LeadStatus::New => stats.new_leads += count,
                LeadStatus::Contacted => stats.contacted += count,
                LeadStatus::Booked => stats.booked += count,
                LeadStatus::Completed => stats.completed += count,
            }
        }

        Ok(stats)
    }

    async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
    ) -> Result<Lead, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM lead WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let mut lead = match row {
            Some(ref r) => row_to_lead(r)?,
            None => return Err(RepositoryError::NotFound(id.0.clone())),
        };

        if lead.status == status {
            tx.commit().await?;
            return Ok(lead);
        }
        lead.transition_to(status)?;

        sqlx::query("UPDATE lead SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_timestamp(&Utc::now()))
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(lead)
    }

    async fn set_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<FlagUpdate, RepositoryError> {
        let column = flag.column();
        let status_guard =
            if flag == LeadFlag::ReviewRequested { " AND status = 'completed'" } else { "" };

        let result = sqlx::query(&format!(
            "UPDATE lead SET {column} = 1, updated_at = ? WHERE id = ? AND {column} = 0{status_guard}"
        ))
        .bind(format_timestamp(&Utc::now()))
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        let lead =
            self.find_by_id(id).await?.ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;

        if result.rows_affected() == 1 {
            return Ok(FlagUpdate { lead, changed: true });
        }
        if flag.is_set(&lead) {
            return Ok(FlagUpdate { lead, changed: false });
        }

        Err(DomainError::ReviewNotAllowed { status: lead.status }.into())
    }

    async fn clear_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<bool, RepositoryError> {
        let column = flag.column();
        let result = sqlx::query(&format!(
            "UPDATE lead SET {column} = 0, updated_at = ? WHERE id = ? AND {column} = 1"
        ))
        .bind(format_timestamp(&Utc::now()))
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM lead WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
