use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Booked,
    Completed,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] =
        [LeadStatus::New, LeadStatus::Contacted, LeadStatus::Booked, LeadStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Booked => "booked",
            Self::Completed => "completed",
        }
    }

    /// Status only moves forward along new → contacted → booked → completed.
    /// Skipping ahead is allowed; re-selecting the current status is a no-op.
    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "booked" => Ok(Self::Booked),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// A single structured field the dialogue collects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSlot {
    Name,
    Phone,
    Suburb,
    JobDescription,
}

impl LeadSlot {
    /// Collection order used by the dialogue.
    pub const ORDER: [LeadSlot; 4] =
        [LeadSlot::Name, LeadSlot::Phone, LeadSlot::Suburb, LeadSlot::JobDescription];

    /// Slots that must be present before a draft becomes a lead.
    pub const REQUIRED: [LeadSlot; 3] =
        [LeadSlot::Name, LeadSlot::Phone, LeadSlot::JobDescription];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone number",
            Self::Suburb => "suburb",
            Self::JobDescription => "job description",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
}

impl LeadDraft {
    pub fn get(&self, slot: LeadSlot) -> Option<&str> {
        let value = match slot {
            LeadSlot::Name => &self.name,
            LeadSlot::Phone => &self.phone,
            LeadSlot::Suburb => &self.suburb,
            LeadSlot::JobDescription => &self.job_description,
        };
        value.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn is_filled(&self, slot: LeadSlot) -> bool {
        self.get(slot).is_some()
    }

    /// Fills `slot` unless it already holds a value. Returns whether the draft changed.
    pub fn fill(&mut self, slot: LeadSlot, value: impl Into<String>) -> bool {
        if self.is_filled(slot) {
            return false;
        }
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return false;
        }
        *self.slot_mut(slot) = Some(trimmed.to_string());
        true
    }

    pub fn missing_slots(&self) -> Vec<LeadSlot> {
        LeadSlot::ORDER.into_iter().filter(|slot| !self.is_filled(*slot)).collect()
    }

    pub fn missing_required(&self) -> Vec<LeadSlot> {
        LeadSlot::REQUIRED.into_iter().filter(|slot| !self.is_filled(*slot)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        LeadSlot::ORDER.iter().all(|slot| !self.is_filled(*slot))
    }

    /// Slots filled in `self` that were empty in `before`.
    pub fn newly_filled(&self, before: &LeadDraft) -> Vec<LeadSlot> {
        LeadSlot::ORDER
            .into_iter()
            .filter(|slot| self.is_filled(*slot) && !before.is_filled(*slot))
            .collect()
    }

    fn slot_mut(&mut self, slot: LeadSlot) -> &mut Option<String> {
        match slot {
            LeadSlot::Name => &mut self.name,
            LeadSlot::Phone => &mut self.phone,
            LeadSlot::Suburb => &mut self.suburb,
            LeadSlot::JobDescription => &mut self.job_description,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub phone: String,
    pub suburb: Option<String>,
    pub job_description: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub sms_sent: bool,
    pub email_sent: bool,
    pub quote_sent: bool,
    pub review_requested: bool,
}

impl Lead {
    /// Promotes a draft to a new lead. Fails when a required slot is missing
    /// or the phone number is not a valid Australian number.
    pub fn from_draft(
        id: LeadId,
        draft: &LeadDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let missing = draft.missing_required();
        if !missing.is_empty() {
            return Err(DomainError::MissingRequiredFields { missing });
        }

        let raw_phone = draft.get(LeadSlot::Phone).unwrap_or_default();
        let phone =
            normalize_phone(raw_phone).ok_or_else(|| DomainError::InvalidPhone(raw_phone.into()))?;

        Ok(Self {
            id,
            name: draft.get(LeadSlot::Name).unwrap_or_default().to_string(),
            phone,
            suburb: draft.get(LeadSlot::Suburb).map(str::to_string),
            job_description: draft.get(LeadSlot::JobDescription).unwrap_or_default().to_string(),
            status: LeadStatus::New,
            created_at,
            sms_sent: false,
            email_sent: false,
            quote_sent: false,
            review_requested: false,
        })
    }

    pub fn transition_to(&mut self, next: LeadStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidStatusTransition { from: self.status, to: next })
    }

    pub fn suburb_or_default(&self) -> &str {
        self.suburb.as_deref().unwrap_or("Not provided")
    }
}

/// Boolean notification markers on a lead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeadFlag {
    SmsSent,
    EmailSent,
    QuoteSent,
    ReviewRequested,
}

impl LeadFlag {
    pub fn column(&self) -> &'static str {
        match self {
            Self::SmsSent => "sms_sent",
            Self::EmailSent => "email_sent",
            Self::QuoteSent => "quote_sent",
            Self::ReviewRequested => "review_requested",
        }
    }

    pub fn is_set(&self, lead: &Lead) -> bool {
        match self {
            Self::SmsSent => lead.sms_sent,
            Self::EmailSent => lead.email_sent,
            Self::QuoteSent => lead.quote_sent,
            Self::ReviewRequested => lead.review_requested,
        }
    }

    pub fn set(&self, lead: &mut Lead) {
        match self {
            Self::SmsSent => lead.sms_sent = true,
            Self::EmailSent => lead.email_sent = true,
            Self::QuoteSent => lead.quote_sent = true,
            Self::ReviewRequested => lead.review_requested = true,
        }
    }

    pub fn clear(&self, lead: &mut Lead) {
        match self {
            Self::SmsSent => lead.sms_sent = false,
            Self::EmailSent => lead.email_sent = false,
            Self::QuoteSent => lead.quote_sent = false,
            Self::ReviewRequested => lead.review_requested = false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStats {
    pub total_leads: u64,
    pub new_leads: u64,
    pub contacted: u64,
    pub booked: u64,
    pub completed: u64,
}

impl LeadStats {
    pub fn from_statuses(statuses: impl IntoIterator<Item = LeadStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total_leads += 1;
            match status {
                LeadStatus::New => stats.new_leads += 1,
                LeadStatus::Contacted => stats.contacted += 1,
                LeadStatus::Booked => stats.booked += 1,
                LeadStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}

/// Normalises an Australian phone number to its 10-digit national form.
///
/// Accepts spaces, dashes, dots and parentheses as separators and folds a
/// `+61` / `61` country prefix into the leading `0`. Mobiles (`04`) and
/// landlines (`02`, `03`, `07`, `08`) are accepted.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for (index, character) in raw.trim().chars().enumerate() {
        match character {
            '0'..='9' => digits.push(character),
            '+' if index == 0 => {}
            ' ' | '-' | '(' | ')' | '.' => {}
            _ => return None,
        }
    }

    let national = match digits.strip_prefix("61") {
        Some(rest) if rest.len() == 9 => format!("0{rest}"),
        _ => digits,
    };

    let bytes = national.as_bytes();
    let valid = bytes.len() == 10 && bytes[0] == b'0' && matches!(bytes[1], b'2' | b'3' | b'4' | b'7' | b'8');
    valid.then_some(national)
}
