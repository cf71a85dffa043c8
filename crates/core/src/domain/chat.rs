use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::{LeadDraft, LeadId};
use crate::flows::DialogueState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Everything the pipeline knows about one widget conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub state: DialogueState,
    pub draft: LeadDraft,
    pub turns: Vec<ChatTurn>,
    pub lead_id: Option<LeadId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: DialogueState::AwaitingIntent,
            draft: LeadDraft::default(),
            turns: Vec::new(),
            lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_user(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        self.push_turn(TurnRole::User, text.into(), at);
    }

    pub fn record_bot(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        self.push_turn(TurnRole::Bot, text.into(), at);
    }

    pub fn last_bot_turn(&self) -> Option<&ChatTurn> {
        self.turns.iter().rev().find(|turn| turn.role == TurnRole::Bot)
    }

    fn push_turn(&mut self, role: TurnRole, text: String, at: DateTime<Utc>) {
        self.turns.push(ChatTurn { role, text, at });
        self.updated_at = at;
    }
}
