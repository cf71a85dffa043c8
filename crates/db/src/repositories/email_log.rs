use sqlx::Row;

use sparky_core::domain::lead::LeadId;
use sparky_core::domain::notification::{DeliveryStatus, EmailKind, EmailLog};

use super::{decode_err, format_timestamp, parse_timestamp, EmailLogRepository, RepositoryError};
use crate::DbPool;

const EMAIL_LOG_COLUMNS: &str = "id, lead_id, kind, recipient_name, recipient_phone, subject, \
     body, delivery_status, sent_at";

pub struct SqlEmailLogRepository {
    pool: DbPool,
}

impl SqlEmailLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_email_log(row: &sqlx::sqlite::SqliteRow) -> Result<EmailLog, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let lead_id: String = row.try_get("lead_id").map_err(decode_err)?;
    let kind_str: String = row.try_get("kind").map_err(decode_err)?;
    let recipient_name: String = row.try_get("recipient_name").map_err(decode_err)?;
    let recipient_phone: String = row.try_get("recipient_phone").map_err(decode_err)?;
    let subject: String = row.try_get("subject").map_err(decode_err)?;
    let body: String = row.try_get("body").map_err(decode_err)?;
    let status_str: String = row.try_get("delivery_status").map_err(decode_err)?;
    let sent_at_str: String = row.try_get("sent_at").map_err(decode_err)?;

    Ok(EmailLog {
        id,
        lead_id: LeadId(lead_id),
        kind: kind_str.parse::<EmailKind>().map_err(decode_err)?,
        recipient_name,
        recipient_phone,
        subject,
        body,
        sent_at: parse_timestamp(&sent_at_str)?,
        status: status_str.parse::<DeliveryStatus>().map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl EmailLogRepository for SqlEmailLogRepository {
    async fn record(&self, entry: &EmailLog) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO email_log (id, lead_id, kind, recipient_name, recipient_phone, subject,
                                    body, delivery_status, sent_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.lead_id.0)
        .bind(entry.kind.as_str())
        .bind(&entry.recipient_name)
        .bind(&entry.recipient_phone)
        .bind(&entry.subject)
        .bind(&entry.body)
        .bind(entry.status.as_str())
        .bind(format_timestamp(&entry.sent_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, lead_id: Option<&LeadId>) -> Result<Vec<EmailLog>, RepositoryError> {
        let rows = if let Some(lead_id) = lead_id {
            sqlx::query(&format!(
                "SELECT {EMAIL_LOG_COLUMNS} FROM email_log WHERE lead_id = ?
                 ORDER BY sent_at DESC, rowid DESC"
            ))
            .bind(&lead_id.0)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {EMAIL_LOG_COLUMNS} FROM email_log ORDER BY sent_at DESC, rowid DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_email_log).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sparky_core::domain::lead::{Lead, LeadDraft};
    use sparky_core::domain::notification::{DeliveryStatus, EmailContent, EmailKind, EmailLog};

    use super::SqlEmailLogRepository;
    use crate::repositories::{
        EmailLogRepository, LeadRepository, RepositoryError, SqlLeadRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn draft(name: &str) -> LeadDraft {
        LeadDraft {
            name: Some(name.to_string()),
            phone: Some("0412345678".to_string()),
            suburb: None,
            job_description: Some("install downlights".to_string()),
        }
    }

    fn entry(lead: &Lead, kind: EmailKind) -> EmailLog {
        EmailLog::for_lead(
            lead,
            kind,
            EmailContent { subject: "Subject".to_string(), body: "Body".to_string() },
            DeliveryStatus::Simulated,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn logs_are_filtered_by_lead_and_newest_first() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let leads = SqlLeadRepository::new(pool.clone());
        let logs = SqlEmailLogRepository::new(pool);

        let sam = leads.create(&draft("Sam")).await.expect("sam");
        let alex = leads.create(&draft("Alex")).await.expect("alex");

        logs.record(&entry(&sam, EmailKind::Confirmation)).await.expect("confirmation");
        logs.record(&entry(&sam, EmailKind::Quote)).await.expect("quote");
        logs.record(&entry(&alex, EmailKind::Confirmation)).await.expect("alex confirmation");

        let all = logs.list(None).await.expect("all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].recipient_name, "Alex");

        let for_sam = logs.list(Some(&sam.id)).await.expect("sam logs");
        assert_eq!(for_sam.len(), 2);
        assert_eq!(for_sam[0].kind, EmailKind::Quote);
        assert_eq!(for_sam[1].kind, EmailKind::Confirmation);
        assert!(for_sam.iter().all(|log| log.status == DeliveryStatus::Simulated));
    }

    #[tokio::test]
    async fn log_for_unknown_lead_is_rejected() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let logs = SqlEmailLogRepository::new(pool);

        let orphan = Lead::from_draft(
            sparky_core::domain::lead::LeadId("ghost".to_string()),
            &draft("Nobody"),
            Utc::now(),
        )
        .expect("valid lead");

        let result = logs.record(&entry(&orphan, EmailKind::Quote)).await;
        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
