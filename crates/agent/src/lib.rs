//! Agent Runtime - rule-based chat pipeline for lead capture
//!
//! This crate is the "brain" of the sparky chat widget:
//! - Classifies free text into a closed set of intents
//! - Extracts lead slots (name, phone, suburb, job) across turns
//! - Answers common service questions from a static FAQ table
//! - Redirects DIY electrical questions towards a licensed visit
//! - Composes the reply text and quick-reply suggestions
//!
//! # Architecture
//!
//! Each message runs one pass over an explicit `ChatSession` value:
//! 1. **Intent Classification** (`intent`) - phrase tables → `Intent`
//! 2. **Slot Extraction** (`slots`) - text + draft → updated `LeadDraft`
//! 3. **Dialogue Tracking** (`sparky_core::flows`) - next state and actions
//! 4. **Response Composition** (`composer`) - canned templates per state
//!
//! Nothing here performs I/O. Persisting the session and the lead is left to
//! the caller, driven by the actions on the returned `ChatTurnResult`.

pub mod composer;
pub mod guardrails;
pub mod intent;
pub mod knowledge;
pub mod runtime;
pub mod slots;
mod text;

pub use composer::{BotReply, ResponseComposer};
pub use intent::{Intent, IntentClassifier};
pub use runtime::{AgentRuntime, ChatTurnResult};
pub use slots::SlotExtractor;
