use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use sparky_core::audit::AuditEvent;
use sparky_core::domain::chat::{ChatSession, SessionId};
use sparky_core::domain::lead::{Lead, LeadDraft, LeadFlag, LeadId, LeadStats, LeadStatus};
use sparky_core::domain::notification::EmailLog;
use sparky_core::errors::DomainError;

use super::{
    AuditRepository, ChatSessionRepository, EmailLogRepository, FlagUpdate, LeadRepository,
    RepositoryError, SessionCapture,
};

/// Leads kept in insertion order so that equal timestamps still list newest first.
#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<Vec<Lead>>,
    by_session: RwLock<HashMap<String, LeadId>>,
}

impl InMemoryLeadRepository {
    pub async fn insert(&self, lead: Lead) {
        self.leads.write().await.push(lead);
    }
}

#[async_trait::async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn create(&self, draft: &LeadDraft) -> Result<Lead, RepositoryError> {
        let lead = Lead::from_draft(LeadId::generate(), draft, Utc::now())?;
        self.leads.write().await.push(lead.clone());
        Ok(lead)
    }

    async fn create_for_session(
        &self,
        session: &SessionId,
        draft: &LeadDraft,
    ) -> Result<SessionCapture, RepositoryError> {
        let mut by_session = self.by_session.write().await;
        let mut leads = self.leads.write().await;
        if let Some(existing) = by_session
            .get(&session.0)
            .and_then(|id| leads.iter().find(|lead| &lead.id == id))
        {
            return Ok(SessionCapture { lead: existing.clone(), created: false });
        }

        let lead = Lead::from_draft(LeadId::generate(), draft, Utc::now())?;
        by_session.insert(session.0.clone(), lead.id.clone());
        leads.push(lead.clone());
        Ok(SessionCapture { lead, created: true })
    }

    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.iter().find(|lead| &lead.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        let mut listed: Vec<Lead> = leads.iter().rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn stats(&self) -> Result<LeadStats, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(LeadStats::from_statuses(leads.iter().map(|lead| lead.status)))
    }

    async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
    ) -> Result<Lead, RepositoryError> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|lead| &lead.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;

        lead.transition_to(status)?;
        Ok(lead.clone())
    }

    async fn set_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<FlagUpdate, RepositoryError> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|lead| &lead.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;

        if flag.is_set(lead) {
            return Ok(FlagUpdate { lead: lead.clone(), changed: false });
        }
        if flag == LeadFlag::ReviewRequested && lead.status != LeadStatus::Completed {
            return Err(DomainError::ReviewNotAllowed { status: lead.status }.into());
        }

        flag.set(lead);
        Ok(FlagUpdate { lead: lead.clone(), changed: true })
    }

    async fn clear_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<bool, RepositoryError> {
        let mut leads = self.leads.write().await;
        let Some(lead) = leads.iter_mut().find(|lead| &lead.id == id) else {
            return Ok(false);
        };
        if !flag.is_set(lead) {
            return Ok(false);
        }
        flag.clear(lead);
        Ok(true)
    }

    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let mut leads = self.leads.write().await;
        let before = leads.len();
        leads.retain(|lead| &lead.id != id);
        Ok(leads.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryChatSessionRepository {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

#[async_trait::async_trait]
impl ChatSessionRepository for InMemoryChatSessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEmailLogRepository {
    entries: RwLock<Vec<EmailLog>>,
}

#[async_trait::async_trait]
impl EmailLogRepository for InMemoryEmailLogRepository {
    async fn record(&self, entry: &EmailLog) -> Result<(), RepositoryError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, lead_id: Option<&LeadId>) -> Result<Vec<EmailLog>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut listed: Vec<EmailLog> = entries
            .iter()
            .rev()
            .filter(|entry| lead_id.map_or(true, |id| &entry.lead_id == id))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<AuditEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.lead_id.as_ref() == Some(lead_id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sparky_core::domain::chat::{ChatSession, SessionId};
    use sparky_core::domain::lead::{LeadDraft, LeadFlag, LeadStatus};
    use sparky_core::domain::notification::{DeliveryStatus, EmailContent, EmailKind, EmailLog};
    use sparky_core::errors::DomainError;

    use crate::repositories::{
        ChatSessionRepository, EmailLogRepository, InMemoryChatSessionRepository,
        InMemoryEmailLogRepository, InMemoryLeadRepository, LeadRepository, RepositoryError,
    };

    fn draft(name: &str) -> LeadDraft {
        LeadDraft {
            name: Some(name.to_string()),
            phone: Some("+61 412 345 678".to_string()),
            suburb: Some("Berwick".to_string()),
            job_description: Some("replace a powerpoint".to_string()),
        }
    }

    #[tokio::test]
    async fn in_memory_lead_repo_matches_store_contract() {
        let repo = InMemoryLeadRepository::default();
        let first = repo.create(&draft("Sam")).await.expect("first");
        let second = repo.create(&draft("Alex")).await.expect("second");

        assert_eq!(first.phone, "0412345678");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        repo.update_status(&first.id, LeadStatus::Completed).await.expect("complete");
        let backwards = repo.update_status(&first.id, LeadStatus::Contacted).await;
        assert!(matches!(backwards, Err(RepositoryError::Domain(_))));

        let stats = repo.stats().await.expect("stats");
        assert_eq!(stats.total_leads, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.new_leads, 1);
    }

    #[tokio::test]
    async fn in_memory_flags_are_check_and_set() {
        let repo = InMemoryLeadRepository::default();
        let lead = repo.create(&draft("Sam")).await.expect("create");

        assert!(repo.set_flag(&lead.id, LeadFlag::SmsSent).await.expect("sms").changed);
        assert!(!repo.set_flag(&lead.id, LeadFlag::SmsSent).await.expect("sms again").changed);

        let review = repo.set_flag(&lead.id, LeadFlag::ReviewRequested).await;
        assert!(matches!(
            review,
            Err(RepositoryError::Domain(DomainError::ReviewNotAllowed { .. }))
        ));

        assert!(repo.delete(&lead.id).await.expect("delete"));
        let missing = repo.set_flag(&lead.id, LeadFlag::SmsSent).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn in_memory_session_and_email_repos_round_trip() {
        let sessions = InMemoryChatSessionRepository::default();
        let session = ChatSession::new(SessionId("s-1".to_string()), Utc::now());
        sessions.save(&session).await.expect("save");
        assert_eq!(sessions.load(&session.id).await.expect("load"), Some(session));

        let leads = InMemoryLeadRepository::default();
        let lead = leads.create(&draft("Sam")).await.expect("lead");
        let logs = InMemoryEmailLogRepository::default();
        let entry = EmailLog::for_lead(
            &lead,
            EmailKind::Confirmation,
            EmailContent { subject: "Hi".to_string(), body: "Thanks".to_string() },
            DeliveryStatus::Simulated,
            Utc::now(),
        );
        logs.record(&entry).await.expect("record");

        assert_eq!(logs.list(Some(&lead.id)).await.expect("list"), vec![entry]);
        assert!(logs.list(Some(&sparky_core::domain::lead::LeadId("x".to_string())))
            .await
            .expect("list")
            .is_empty());
    }
}
