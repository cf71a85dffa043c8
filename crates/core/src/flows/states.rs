use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadSlot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogueState {
    #[default]
    AwaitingIntent,
    CollectingName,
    CollectingPhone,
    CollectingSuburb,
    #[serde(rename = "COLLECTING_JOB_DESC")]
    CollectingJobDescription,
    Complete,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingIntent => "AWAITING_INTENT",
            Self::CollectingName => "COLLECTING_NAME",
            Self::CollectingPhone => "COLLECTING_PHONE",
            Self::CollectingSuburb => "COLLECTING_SUBURB",
            Self::CollectingJobDescription => "COLLECTING_JOB_DESC",
            Self::Complete => "COMPLETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AWAITING_INTENT" => Some(Self::AwaitingIntent),
            "COLLECTING_NAME" => Some(Self::CollectingName),
            "COLLECTING_PHONE" => Some(Self::CollectingPhone),
            "COLLECTING_SUBURB" => Some(Self::CollectingSuburb),
            "COLLECTING_JOB_DESC" => Some(Self::CollectingJobDescription),
            "COMPLETE" => Some(Self::Complete),
            _ => None,
        }
    }

    /// The slot this state is currently asking the user for.
    pub fn solicited_slot(&self) -> Option<LeadSlot> {
        match self {
            Self::CollectingName => Some(LeadSlot::Name),
            Self::CollectingPhone => Some(LeadSlot::Phone),
            Self::CollectingSuburb => Some(LeadSlot::Suburb),
            Self::CollectingJobDescription => Some(LeadSlot::JobDescription),
            Self::AwaitingIntent | Self::Complete => None,
        }
    }

    pub fn for_slot(slot: LeadSlot) -> Self {
        match slot {
            LeadSlot::Name => Self::CollectingName,
            LeadSlot::Phone => Self::CollectingPhone,
            LeadSlot::Suburb => Self::CollectingSuburb,
            LeadSlot::JobDescription => Self::CollectingJobDescription,
        }
    }

    /// Position along the capture sequence; transitions never lower it.
    pub fn rank(&self) -> u8 {
        match self {
            Self::AwaitingIntent => 0,
            Self::CollectingName => 1,
            Self::CollectingPhone => 2,
            Self::CollectingSuburb => 3,
            Self::CollectingJobDescription => 4,
            Self::Complete => 5,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.solicited_slot().is_some()
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    /// The user expressed a capture intent (quote request, emergency, contact details).
    CaptureRequested,
    /// Any other message.
    MessageReceived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueAction {
    PromptForSlot(LeadSlot),
    SubmitLead,
    SendConfirmation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogueState,
    pub to: DialogueState,
    pub event: DialogueEvent,
    pub actions: Vec<DialogueAction>,
}

impl TransitionOutcome {
    pub fn entered_complete(&self) -> bool {
        self.from != DialogueState::Complete && self.to == DialogueState::Complete
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}
