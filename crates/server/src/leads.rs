use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use sparky_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use sparky_core::domain::chat::SessionId;
use sparky_core::domain::lead::{Lead, LeadDraft, LeadFlag, LeadId, LeadStats, LeadStatus};
use sparky_core::domain::notification::{EmailKind, EmailLog};
use sparky_core::errors::{ApplicationError, DomainError};
use sparky_db::repositories::{AuditRepository, EmailLogRepository, LeadRepository};

use crate::email::{EmailPreview, EmailRenderer};
use crate::notify::{new_lead_sms, NotificationSender};

/// Admin-side operations on leads plus the notifications they trigger.
pub struct LeadService {
    leads: Arc<dyn LeadRepository>,
    email_logs: Arc<dyn EmailLogRepository>,
    audit: Arc<dyn AuditRepository>,
    notifier: Arc<dyn NotificationSender>,
    renderer: EmailRenderer,
}

impl LeadService {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        email_logs: Arc<dyn EmailLogRepository>,
        audit: Arc<dyn AuditRepository>,
        notifier: Arc<dyn NotificationSender>,
        renderer: EmailRenderer,
    ) -> Self {
        Self { leads, email_logs, audit, notifier, renderer }
    }

    pub async fn list(&self) -> Result<Vec<Lead>, ApplicationError> {
        Ok(self.leads.list().await?)
    }

    pub async fn stats(&self) -> Result<LeadStats, ApplicationError> {
        Ok(self.leads.stats().await?)
    }

    pub async fn get(&self, id: &LeadId) -> Result<Lead, ApplicationError> {
        self.leads.find_by_id(id).await?.ok_or_else(|| ApplicationError::NotFound(id.0.clone()))
    }

    /// Persists the lead a chat session produced and, when `confirm` is set,
    /// sends the customer confirmation. A session that already produced a lead
    /// gets that lead back with nothing sent. A failed confirmation is logged
    /// and audited but does not undo the lead.
    pub async fn capture(
        &self,
        session: &SessionId,
        draft: &LeadDraft,
        confirm: bool,
        context: &AuditContext,
    ) -> Result<Lead, ApplicationError> {
        let captured = self.leads.create_for_session(session, draft).await?;
        if !captured.created {
            info!(
                event_name = "lead.capture.replayed",
                correlation_id = %context.correlation_id,
                session_id = %session,
                lead_id = %captured.lead.id,
                "session already produced a lead"
            );
            return Ok(captured.lead);
        }

        let lead = captured.lead;
        self.record_created(&lead, context).await;
        if !confirm {
            return Ok(lead);
        }
        match self.send_confirmation(&lead, context).await {
            Ok(entry) => Ok(self.leads.find_by_id(&entry.lead_id).await?.unwrap_or(lead)),
            Err(error) => {
                warn!(
                    event_name = "notification.confirmation.failed",
                    correlation_id = %context.correlation_id,
                    lead_id = %lead.id,
                    error = %error,
                    "confirmation email failed after lead capture"
                );
                Ok(lead)
            }
        }
    }

    pub async fn create(
        &self,
        draft: &LeadDraft,
        context: &AuditContext,
    ) -> Result<Lead, ApplicationError> {
        let lead = self.leads.create(draft).await?;
        self.record_created(&lead, context).await;
        Ok(lead)
    }

    async fn record_created(&self, lead: &Lead, context: &AuditContext) {
        info!(
            event_name = "lead.created",
            correlation_id = %context.correlation_id,
            lead_id = %lead.id,
            has_suburb = lead.suburb.is_some(),
            "lead created"
        );
        self.record_audit(context, &lead.id, "lead.created", AuditCategory::Lead, AuditOutcome::Success, &[])
            .await;
    }

    pub async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        context: &AuditContext,
    ) -> Result<Lead, ApplicationError> {
        let lead = self.leads.update_status(id, status).await?;
        info!(
            event_name = "lead.status_updated",
            correlation_id = %context.correlation_id,
            lead_id = %lead.id,
            status = lead.status.as_str(),
            "lead status updated"
        );
        self.record_audit(
            context,
            id,
            "lead.status_updated",
            AuditCategory::Lead,
            AuditOutcome::Success,
            &[("status", status.as_str())],
        )
        .await;
        Ok(lead)
    }

    pub async fn delete(&self, id: &LeadId, context: &AuditContext) -> Result<(), ApplicationError> {
        if !self.leads.delete(id).await? {
            return Err(ApplicationError::NotFound(id.0.clone()));
        }
        info!(
            event_name = "lead.deleted",
            correlation_id = %context.correlation_id,
            lead_id = %id,
            "lead deleted"
        );
        Ok(())
    }

    /// Alerts the business about a lead by SMS, at most once per lead.
    pub async fn send_sms(
        &self,
        id: &LeadId,
        context: &AuditContext,
    ) -> Result<Lead, ApplicationError> {
        let lead = self.get(id).await?;
        if lead.sms_sent {
            return Err(already_done("sms", id));
        }

        // Claim the flag first so two concurrent requests cannot both deliver.
        let update = self.leads.set_flag(id, LeadFlag::SmsSent).await?;
        if !update.changed {
            return Err(already_done("sms", id));
        }

        if let Err(error) = self.notifier.send_sms(&update.lead, &new_lead_sms(&update.lead)).await {
            self.release_flag(id, LeadFlag::SmsSent, context).await;
            self.record_audit(
                context,
                id,
                "notification.sms_failed",
                AuditCategory::Notification,
                AuditOutcome::Failed,
                &[("provider", self.notifier.provider())],
            )
            .await;
            return Err(error);
        }

        self.record_audit(
            context,
            id,
            "notification.sms_sent",
            AuditCategory::Notification,
            AuditOutcome::Success,
            &[("provider", self.notifier.provider())],
        )
        .await;
        Ok(update.lead)
    }

    /// Quote emails may be sent again; each one is logged.
    pub async fn send_quote_email(
        &self,
        id: &LeadId,
        context: &AuditContext,
    ) -> Result<EmailLog, ApplicationError> {
        let lead = self.get(id).await?;
        let entry = self.deliver_email(&lead, EmailKind::Quote, context).await?;
        self.leads.set_flag(id, LeadFlag::QuoteSent).await?;
        Ok(entry)
    }

    pub async fn send_review_request(
        &self,
        id: &LeadId,
        context: &AuditContext,
    ) -> Result<EmailLog, ApplicationError> {
        let lead = self.get(id).await?;
        if lead.status != LeadStatus::Completed {
            return Err(DomainError::ReviewNotAllowed { status: lead.status }.into());
        }
        if lead.review_requested {
            return Err(already_done("review request", id));
        }

        let update = self.leads.set_flag(id, LeadFlag::ReviewRequested).await?;
        if !update.changed {
            return Err(already_done("review request", id));
        }

        match self.deliver_email(&update.lead, EmailKind::ReviewRequest, context).await {
            Ok(entry) => Ok(entry),
            Err(error) => {
                self.release_flag(id, LeadFlag::ReviewRequested, context).await;
                Err(error)
            }
        }
    }

    pub async fn preview_emails(&self, id: &LeadId) -> Result<EmailPreview, ApplicationError> {
        let lead = self.get(id).await?;
        self.renderer.preview(&lead)
    }

    pub async fn email_logs(
        &self,
        lead_id: Option<&LeadId>,
    ) -> Result<Vec<EmailLog>, ApplicationError> {
        Ok(self.email_logs.list(lead_id).await?)
    }

    async fn send_confirmation(
        &self,
        lead: &Lead,
        context: &AuditContext,
    ) -> Result<EmailLog, ApplicationError> {
        let entry = self.deliver_email(lead, EmailKind::Confirmation, context).await?;
        self.leads.set_flag(&lead.id, LeadFlag::EmailSent).await?;
        Ok(entry)
    }

    async fn deliver_email(
        &self,
        lead: &Lead,
        kind: EmailKind,
        context: &AuditContext,
    ) -> Result<EmailLog, ApplicationError> {
        let content = self.renderer.render(kind, lead)?;
        let status = match self.notifier.send_email(lead, kind, &content).await {
            Ok(status) => status,
            Err(error) => {
                self.record_audit(
                    context,
                    &lead.id,
                    "notification.email_failed",
                    AuditCategory::Notification,
                    AuditOutcome::Failed,
                    &[("kind", kind.as_str())],
                )
                .await;
                return Err(error);
            }
        };

        let entry = EmailLog::for_lead(lead, kind, content, status, Utc::now());
        self.email_logs.record(&entry).await?;
        info!(
            event_name = "notification.email_logged",
            correlation_id = %context.correlation_id,
            lead_id = %lead.id,
            email_kind = kind.as_str(),
            delivery_status = status.as_str(),
            "email recorded"
        );
        self.record_audit(
            context,
            &lead.id,
            "notification.email_sent",
            AuditCategory::Notification,
            AuditOutcome::Success,
            &[("kind", kind.as_str())],
        )
        .await;
        Ok(entry)
    }

    /// Undoes a claim whose delivery failed so the operator can retry. A
    /// release that cannot be written leaves the lead marked as sent.
    async fn release_flag(&self, id: &LeadId, flag: LeadFlag, context: &AuditContext) {
        if let Err(error) = self.leads.clear_flag(id, flag).await {
            warn!(
                event_name = "notification.flag_release_failed",
                correlation_id = %context.correlation_id,
                lead_id = %id,
                flag = flag.column(),
                error = %error,
                "claimed flag could not be released after a failed delivery"
            );
        }
    }

    async fn record_audit(
        &self,
        context: &AuditContext,
        lead_id: &LeadId,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: &[(&str, &str)],
    ) {
        let scoped = AuditContext { lead_id: Some(lead_id.clone()), ..context.clone() };
        let event = metadata.iter().fold(
            AuditEvent::new(&scoped, event_type, category, outcome),
            |event, (key, value)| event.with_metadata(*key, *value),
        );
        if let Err(error) = self.audit.record(&event).await {
            warn!(
                event_name = "system.audit.write_failed",
                correlation_id = %context.correlation_id,
                event_type,
                error = %error,
                "audit event could not be stored"
            );
        }
    }
}

fn already_done(action: &str, id: &LeadId) -> ApplicationError {
    ApplicationError::AlreadyDone { action: action.to_string(), lead_id: id.0.clone() }
}
