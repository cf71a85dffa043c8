pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use domain::chat::{ChatSession, ChatTurn, SessionId, TurnRole};
pub use domain::lead::{
    normalize_phone, Lead, LeadDraft, LeadFlag, LeadId, LeadSlot, LeadStats, LeadStatus,
};
pub use domain::notification::{DeliveryStatus, EmailContent, EmailKind, EmailLog};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{DialogueAction, DialogueEvent, DialogueState, DialogueTracker, TransitionOutcome};
