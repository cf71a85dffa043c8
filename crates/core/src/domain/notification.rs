use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Lead, LeadFlag, LeadId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Confirmation,
    Quote,
    ReviewRequest,
}

impl EmailKind {
    pub const ALL: [EmailKind; 3] = [EmailKind::Confirmation, EmailKind::Quote, EmailKind::ReviewRequest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Quote => "quote",
            Self::ReviewRequest => "review_request",
        }
    }

    /// The lead flag that records this email went out.
    pub fn flag(&self) -> LeadFlag {
        match self {
            Self::Confirmation => LeadFlag::EmailSent,
            Self::Quote => LeadFlag::QuoteSent,
            Self::ReviewRequest => LeadFlag::ReviewRequested,
        }
    }
}

impl fmt::Display for EmailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "confirmation" => Ok(Self::Confirmation),
            "quote" => Ok(Self::Quote),
            "review_request" => Ok(Self::ReviewRequest),
            other => Err(DomainError::InvariantViolation(format!("unknown email kind `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Simulated,
    Sent,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Sent => "sent",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "simulated" => Ok(Self::Simulated),
            "sent" => Ok(Self::Sent),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown delivery status `{other}`")))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: String,
    pub lead_id: LeadId,
    pub kind: EmailKind,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl EmailLog {
    pub fn for_lead(
        lead: &Lead,
        kind: EmailKind,
        content: EmailContent,
        status: DeliveryStatus,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id: lead.id.clone(),
            kind,
            recipient_name: lead.name.clone(),
            recipient_phone: lead.phone.clone(),
            subject: content.subject,
            body: content.body,
            sent_at,
            status,
        }
    }
}
