use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use sparky_core::audit::AuditEvent;
use sparky_core::domain::chat::{ChatSession, SessionId};
use sparky_core::domain::lead::{Lead, LeadDraft, LeadFlag, LeadId, LeadStats, LeadStatus};
use sparky_core::domain::notification::EmailLog;
use sparky_core::errors::{ApplicationError, DomainError};

pub mod audit;
pub mod email_log;
pub mod lead;
pub mod memory;
pub mod session;

pub use audit::SqlAuditRepository;
pub use email_log::SqlEmailLogRepository;
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryAuditRepository, InMemoryChatSessionRepository, InMemoryEmailLogRepository,
    InMemoryLeadRepository,
};
pub use session::SqlChatSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("lead {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => ApplicationError::NotFound(id),
            RepositoryError::Domain(domain) => ApplicationError::Domain(domain),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Result of a check-and-set on a lead flag. `changed` is false when the
/// flag was already set before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagUpdate {
    pub lead: Lead,
    pub changed: bool,
}

/// Result of promoting a chat session's draft. `created` is false when the
/// session had already produced a lead, which is returned instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCapture {
    pub lead: Lead,
    pub created: bool,
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Promotes a complete draft to a persisted lead with status `new`.
    async fn create(&self, draft: &LeadDraft) -> Result<Lead, RepositoryError>;
    /// Like `create`, but at most one lead per chat session.
    async fn create_for_session(
        &self,
        session: &SessionId,
        draft: &LeadDraft,
    ) -> Result<SessionCapture, RepositoryError>;
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Lead>, RepositoryError>;
    async fn stats(&self) -> Result<LeadStats, RepositoryError>;
    async fn update_status(&self, id: &LeadId, status: LeadStatus)
        -> Result<Lead, RepositoryError>;
    async fn set_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<FlagUpdate, RepositoryError>;
    /// Releases a claimed flag whose delivery failed. Returns false when the
    /// flag was not set.
    async fn clear_flag(&self, id: &LeadId, flag: LeadFlag) -> Result<bool, RepositoryError>;
    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError>;
    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn record(&self, entry: &EmailLog) -> Result<(), RepositoryError>;
    /// Newest first, optionally narrowed to one lead.
    async fn list(&self, lead_id: Option<&LeadId>) -> Result<Vec<EmailLog>, RepositoryError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError>;
    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<AuditEvent>, RepositoryError>;
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
