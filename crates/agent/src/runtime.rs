use chrono::{DateTime, Utc};
use tracing::debug;

use sparky_core::audit::{AuditSink, NoopAuditSink};
use sparky_core::audit::AuditContext;
use sparky_core::config::BusinessConfig;
use sparky_core::domain::chat::ChatSession;
use sparky_core::domain::lead::LeadSlot;
use sparky_core::flows::{DialogueAction, DialogueEvent, DialogueState, DialogueTracker, TransitionOutcome};

use crate::composer::{BotReply, Browsing, ReplyContext, ResponseComposer};
use crate::guardrails::GuardrailPolicy;
use crate::intent::{is_affirmative, Intent, IntentClassifier};
use crate::knowledge::{is_question, KnowledgeBase};
use crate::slots::SlotExtractor;

/// Result of running one user message through the pipeline.
#[derive(Clone, Debug)]
pub struct ChatTurnResult {
    pub session: ChatSession,
    pub intent: Intent,
    pub outcome: TransitionOutcome,
    pub newly_filled: Vec<LeadSlot>,
    pub reply: BotReply,
}

impl ChatTurnResult {
    /// True on the turn the draft became complete; the caller persists the lead.
    pub fn should_submit_lead(&self) -> bool {
        self.outcome.actions.contains(&DialogueAction::SubmitLead)
    }

    pub fn should_send_confirmation(&self) -> bool {
        self.outcome.actions.contains(&DialogueAction::SendConfirmation)
    }
}

/// classify → extract → track → compose, over an explicit session value.
pub struct AgentRuntime {
    classifier: IntentClassifier,
    extractor: SlotExtractor,
    knowledge: KnowledgeBase,
    guardrails: GuardrailPolicy,
    tracker: DialogueTracker,
    composer: ResponseComposer,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(BusinessConfig::default(), GuardrailPolicy::default())
    }
}

impl AgentRuntime {
    pub fn new(business: BusinessConfig, guardrails: GuardrailPolicy) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            extractor: SlotExtractor::new(),
            knowledge: KnowledgeBase::new(business.clone()),
            guardrails,
            tracker: DialogueTracker::default(),
            composer: ResponseComposer::new(business),
        }
    }

    pub fn composer(&self) -> &ResponseComposer {
        &self.composer
    }

    pub fn handle_message(
        &self,
        session: ChatSession,
        text: &str,
        now: DateTime<Utc>,
    ) -> ChatTurnResult {
        let audit = AuditContext::new(None, Some(session.id.clone()), session.id.0.clone(), "agent-runtime");
        self.handle_message_with_audit(session, text, now, &NoopAuditSink, &audit)
    }

    pub fn handle_message_with_audit(
        &self,
        mut session: ChatSession,
        text: &str,
        now: DateTime<Utc>,
        sink: &dyn AuditSink,
        audit: &AuditContext,
    ) -> ChatTurnResult {
        let text = text.trim();
        session.record_user(text, now);

        let intent = self.classifier.classify(text);
        let question = is_question(text);
        let guardrail = self.guardrails.evaluate(text);
        let topic = self.knowledge.lookup(text);
        let browsing = Browsing::detect(text);

        let previous_draft = session.draft.clone();
        let draft = if session.state == DialogueState::Complete {
            previous_draft.clone()
        } else {
            self.extractor.extract(text, &previous_draft, session.state.solicited_slot())
        };
        let newly_filled = draft.newly_filled(&previous_draft);

        // A plain "yes" after any bot offer starts capture from the idle state.
        let accepted_offer = session.state == DialogueState::AwaitingIntent
            && intent == Intent::Unknown
            && is_affirmative(text)
            && session.last_bot_turn().is_some();
        let event = if intent.is_capture() || accepted_offer {
            DialogueEvent::CaptureRequested
        } else {
            DialogueEvent::MessageReceived
        };

        let outcome = self.tracker.advance_with_audit(session.state, event, &draft, sink, audit);
        debug!(
            event_name = "chat.turn.classified",
            correlation_id = %audit.correlation_id,
            session_id = %session.id,
            intent = intent.as_str(),
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            filled = newly_filled.len(),
            "chat turn processed"
        );

        session.draft = draft;
        session.state = outcome.to;

        let reply = self.composer.compose(&ReplyContext {
            intent,
            outcome: &outcome,
            draft: &session.draft,
            newly_filled: &newly_filled,
            question,
            topic,
            guardrail: &guardrail,
            browsing,
        });
        session.record_bot(reply.text.clone(), now);

        ChatTurnResult { session, intent, outcome, newly_filled, reply }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sparky_core::audit::{AuditContext, InMemoryAuditSink};
    use sparky_core::domain::chat::{ChatSession, SessionId};
    use sparky_core::domain::lead::LeadSlot;
    use sparky_core::flows::DialogueState;

    use super::AgentRuntime;
    use crate::intent::Intent;

    fn new_session() -> ChatSession {
        ChatSession::new(SessionId("s-test".to_owned()), Utc::now())
    }

    #[test]
    fn scripted_capture_reaches_complete() {
        let runtime = AgentRuntime::default();

        let first = runtime.handle_message(new_session(), "My name is Sam", Utc::now());
        assert_eq!(first.intent, Intent::ProvideContactInfo);
        assert_eq!(first.session.state, DialogueState::CollectingPhone);
        assert!(first.reply.text.starts_with("Thanks Sam!"));

        let second = runtime.handle_message(first.session, "0412 345 678", Utc::now());
        assert_eq!(second.session.state, DialogueState::CollectingSuburb);
        assert_eq!(second.newly_filled, vec![LeadSlot::Phone]);

        let third =
            runtime.handle_message(second.session, "Clyde North, fix a broken switchboard", Utc::now());
        assert_eq!(third.session.state, DialogueState::Complete);
        assert!(third.should_submit_lead());
        assert!(third.should_send_confirmation());
        assert_eq!(third.session.draft.name.as_deref(), Some("Sam"));
        assert_eq!(third.session.draft.phone.as_deref(), Some("0412345678"));
        assert_eq!(third.session.draft.suburb.as_deref(), Some("Clyde North"));
        assert_eq!(
            third.session.draft.job_description.as_deref(),
            Some("fix a broken switchboard")
        );
        assert_eq!(third.session.turns.len(), 6);
    }

    #[test]
    fn opening_complaint_does_not_become_the_name() {
        let runtime = AgentRuntime::default();
        let result =
            runtime.handle_message(new_session(), "I'm after a quote for downlights", Utc::now());

        assert_eq!(result.intent, Intent::QuoteRequest);
        assert_eq!(result.session.draft.name, None);
        assert_eq!(result.session.state, DialogueState::CollectingName);
        assert!(!result.reply.text.contains("After"));
    }

    #[test]
    fn emergency_starts_capture_with_phone_in_reply() {
        let runtime = AgentRuntime::default();
        let result = runtime.handle_message(
            new_session(),
            "I need an urgent powerpoint fixed, emergency!",
            Utc::now(),
        );

        assert_eq!(result.intent, Intent::Emergency);
        assert_eq!(result.session.state, DialogueState::CollectingName);
        assert!(result.reply.text.contains("0448 195 614"));
        assert!(result.reply.text.contains("immediate help"));
    }

    #[test]
    fn greeting_keeps_session_idle() {
        let runtime = AgentRuntime::default();
        let result = runtime.handle_message(new_session(), "hello", Utc::now());

        assert_eq!(result.session.state, DialogueState::AwaitingIntent);
        assert!(!result.should_submit_lead());
        assert_eq!(result.reply.quick_replies.len(), 3);
    }

    #[test]
    fn yes_after_an_offer_starts_capture() {
        let runtime = AgentRuntime::default();
        let faq = runtime.handle_message(new_session(), "do you install ceiling fans?", Utc::now());
        assert_eq!(faq.session.state, DialogueState::AwaitingIntent);
        assert!(faq.reply.text.contains("free quote"));

        let accepted = runtime.handle_message(faq.session, "yes", Utc::now());
        assert_eq!(accepted.session.state, DialogueState::CollectingName);
    }

    #[test]
    fn question_mid_capture_keeps_state_and_reminds() {
        let runtime = AgentRuntime::default();
        let started = runtime.handle_message(new_session(), "Get a free quote", Utc::now());
        assert_eq!(started.session.state, DialogueState::CollectingName);

        let asked = runtime.handle_message(started.session, "how much does a switchboard cost?", Utc::now());
        assert_eq!(asked.session.state, DialogueState::CollectingName);
        assert!(asked.session.draft.is_empty());
        assert!(asked.reply.text.contains("your name to continue"));
    }

    #[test]
    fn complete_session_stays_complete() {
        let runtime = AgentRuntime::default();
        let mut session = new_session();
        for message in ["My name is Sam", "0412 345 678", "Clyde North, fix a broken switchboard"] {
            session = runtime.handle_message(session, message, Utc::now()).session;
        }

        let after = runtime.handle_message(session, "Do you do smoke alarms?", Utc::now());
        assert_eq!(after.session.state, DialogueState::Complete);
        assert!(!after.should_submit_lead());
        assert!(after.reply.text.contains("Smoke alarm"));
    }

    #[test]
    fn transitions_are_audited_with_session_correlation() {
        let runtime = AgentRuntime::default();
        let sink = InMemoryAuditSink::default();
        let session = new_session();
        let audit = AuditContext::new(None, Some(session.id.clone()), "req-7", "agent-runtime");

        runtime.handle_message_with_audit(session, "Get a free quote", Utc::now(), &sink, &audit);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-7");
        assert_eq!(events[0].session_id.as_ref().map(|id| id.0.as_str()), Some("s-test"));
    }
}
