use async_trait::async_trait;
use tracing::info;

use sparky_core::domain::lead::Lead;
use sparky_core::domain::notification::{DeliveryStatus, EmailContent, EmailKind};
use sparky_core::errors::ApplicationError;

/// Outbound delivery channel for lead notifications. Real carriers (SMS
/// gateway, transactional email) plug in here.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn send_sms(&self, lead: &Lead, message: &str)
        -> Result<DeliveryStatus, ApplicationError>;

    async fn send_email(
        &self,
        lead: &Lead,
        kind: EmailKind,
        content: &EmailContent,
    ) -> Result<DeliveryStatus, ApplicationError>;
}

/// Logs every message instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedNotifier;

#[async_trait]
impl NotificationSender for SimulatedNotifier {
    fn provider(&self) -> &'static str {
        "simulated"
    }

    async fn send_sms(
        &self,
        lead: &Lead,
        message: &str,
    ) -> Result<DeliveryStatus, ApplicationError> {
        info!(
            event_name = "notification.sms.simulated",
            lead_id = %lead.id,
            recipient_phone = %lead.phone,
            chars = message.chars().count(),
            "sms delivery simulated"
        );
        Ok(DeliveryStatus::Simulated)
    }

    async fn send_email(
        &self,
        lead: &Lead,
        kind: EmailKind,
        content: &EmailContent,
    ) -> Result<DeliveryStatus, ApplicationError> {
        info!(
            event_name = "notification.email.simulated",
            lead_id = %lead.id,
            email_kind = kind.as_str(),
            recipient_name = %lead.name,
            subject = %content.subject,
            "email delivery simulated"
        );
        Ok(DeliveryStatus::Simulated)
    }
}

/// New-lead alert sent to the business, not the customer.
pub fn new_lead_sms(lead: &Lead) -> String {
    format!(
        "New lead from {}! Phone: {}, Suburb: {}, Job: {}",
        lead.name,
        lead.phone,
        lead.suburb_or_default(),
        lead.job_description
    )
}
