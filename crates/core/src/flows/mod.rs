pub mod engine;
pub mod states;

pub use engine::{DialogueTracker, FlowDefinition, LeadCaptureFlow};
pub use states::{DialogueAction, DialogueEvent, DialogueState, TransitionOutcome};
