use serde::{Deserialize, Serialize};

use sparky_core::config::BusinessConfig;
use sparky_core::domain::lead::{LeadDraft, LeadSlot};
use sparky_core::flows::{DialogueState, TransitionOutcome};

use crate::guardrails::GuardrailDecision;
use crate::intent::{is_negative, Intent};
use crate::knowledge::{KnowledgeBase, ServiceTopic};
use crate::text::{contains_any, normalize_text};

pub const MAX_QUICK_REPLIES: usize = 4;

pub const GREETING_REPLIES: &[&str] = &["Get a free quote", "What areas do you service?", "Emergency help"];
pub const FAQ_FOLLOWUP_REPLIES: &[&str] = &["Yes, book now", "No thanks", "Tell me more"];
pub const DIY_REPLIES: &[&str] = &["Yes, get a quote", "No thanks"];
pub const SUBURB_REPLIES: &[&str] = &["Clyde North", "Cranbourne", "Berwick", "Pakenham"];
pub const JOB_REPLIES: &[&str] =
    &["Powerpoint installation", "Switchboard upgrade", "Lighting", "EV charger"];
pub const LEAD_SAVED_REPLIES: &[&str] = &["Ask another question", "That's all, thanks"];
pub const NEGATIVE_REPLIES: &[&str] = &["Actually, yes book me in", "Ask another question"];
pub const SERVICES_MENU_REPLIES: &[&str] = &["Powerpoints", "Switchboards", "Lighting", "EV Chargers"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub text: String,
    pub quick_replies: Vec<String>,
}

impl BotReply {
    pub fn new(text: impl Into<String>, quick_replies: &[&str]) -> Self {
        Self {
            text: text.into(),
            quick_replies: quick_replies
                .iter()
                .take(MAX_QUICK_REPLIES)
                .map(|reply| (*reply).to_string())
                .collect(),
        }
    }
}

/// What the composer needs to know about the turn being answered.
#[derive(Clone, Debug)]
pub struct ReplyContext<'a> {
    pub intent: Intent,
    pub outcome: &'a TransitionOutcome,
    pub draft: &'a LeadDraft,
    pub newly_filled: &'a [LeadSlot],
    pub question: bool,
    pub topic: Option<ServiceTopic>,
    pub guardrail: &'a GuardrailDecision,
    pub browsing: Browsing,
}

/// Non-capture conversational moves detected on the raw message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Browsing {
    #[default]
    None,
    Declined,
    ExploreServices,
}

const EXPLORE_PHRASES: &[&str] = &[
    "tell me more",
    "more info",
    "what else",
    "other services",
    "what do you do",
    "services",
    "ask another question",
];

impl Browsing {
    pub fn detect(text: &str) -> Self {
        if is_negative(text) {
            return Self::Declined;
        }
        if contains_any(&normalize_text(text), EXPLORE_PHRASES) {
            return Self::ExploreServices;
        }
        Self::None
    }
}

#[derive(Clone, Debug)]
pub struct ResponseComposer {
    business: BusinessConfig,
    knowledge: KnowledgeBase,
}

impl ResponseComposer {
    pub fn new(business: BusinessConfig) -> Self {
        let knowledge = KnowledgeBase::new(business.clone());
        Self { business, knowledge }
    }

    pub fn business(&self) -> &BusinessConfig {
        &self.business
    }

    pub fn compose(&self, context: &ReplyContext<'_>) -> BotReply {
        let reply = self.compose_body(context);
        if context.intent == Intent::Emergency {
            return BotReply { text: format!("{}\n\n{}", self.emergency_banner(), reply.text), ..reply };
        }
        reply
    }

    /// Shown when the chat backend cannot be reached.
    pub fn fallback_reply(&self) -> BotReply {
        BotReply::new(
            format!(
                "Sorry, I'm having trouble connecting. Please call us directly on {} for immediate assistance!",
                self.business.phone
            ),
            &[],
        )
    }

    fn compose_body(&self, context: &ReplyContext<'_>) -> BotReply {
        let outcome = context.outcome;
        if outcome.entered_complete() {
            return self.completion_summary(context.draft);
        }

        match outcome.to.solicited_slot() {
            Some(slot) => self.collecting_reply(context, slot),
            None if outcome.to == DialogueState::Complete => self.after_capture_reply(context),
            None => self.browsing_reply(context),
        }
    }

    fn emergency_banner(&self) -> String {
        format!(
            "If this is an emergency or anything is unsafe, please call us now on {} for immediate help.",
            self.business.phone
        )
    }

    fn completion_summary(&self, draft: &LeadDraft) -> BotReply {
        let name = draft.get(LeadSlot::Name).unwrap_or("there");
        let text = format!(
            "Awesome! Thanks {name}! I've passed your details to the team at {business} and sent you a confirmation.\n\n\
             Your request:\n\
             • Name: {name}\n\
             • Phone: {phone}\n\
             • Suburb: {suburb}\n\
             • Job: {job}\n\n\
             We'll be in touch shortly. If it's urgent, call us on {business_phone}. Is there anything else I can help with?",
            business = self.business.name,
            phone = draft.get(LeadSlot::Phone).unwrap_or_default(),
            suburb = draft.get(LeadSlot::Suburb).unwrap_or("Not provided"),
            job = draft.get(LeadSlot::JobDescription).unwrap_or_default(),
            business_phone = self.business.phone,
        );
        BotReply::new(text, LEAD_SAVED_REPLIES)
    }

    fn collecting_reply(&self, context: &ReplyContext<'_>, slot: LeadSlot) -> BotReply {
        let slot_replies = quick_replies_for(slot);

        if let GuardrailDecision::Redirect { user_message, .. } = context.guardrail {
            return BotReply::new(format!("{user_message}{}", reminder(slot)), slot_replies);
        }

        if context.question && context.newly_filled.is_empty() {
            let answer = match context.topic {
                Some(topic) => self.knowledge.answer(topic),
                None => "Good question! The team can go through that with you when they call.".to_string(),
            };
            return BotReply::new(format!("{answer}{}", reminder(slot)), slot_replies);
        }

        let outcome = context.outcome;
        if outcome.from == DialogueState::AwaitingIntent && slot == LeadSlot::Name {
            return BotReply::new(
                "Great! I'd love to help you book a service. Let me grab a few details so we can get back to you quickly. What's your name?",
                slot_replies,
            );
        }

        if outcome.changed() || !context.newly_filled.is_empty() {
            return BotReply::new(self.prompt_for(slot, context.draft, context.newly_filled), slot_replies);
        }

        BotReply::new(reask(slot), slot_replies)
    }

    fn prompt_for(&self, slot: LeadSlot, draft: &LeadDraft, newly_filled: &[LeadSlot]) -> String {
        let acknowledgement = match (newly_filled.first(), draft.get(LeadSlot::Name)) {
            (Some(LeadSlot::Name), Some(name)) => format!("Thanks {name}! "),
            (Some(LeadSlot::Phone), _) => "Perfect, got your number! ".to_string(),
            (Some(_), _) => "Great! ".to_string(),
            (None, _) => String::new(),
        };

        let question = match slot {
            LeadSlot::Name => "What's your name?",
            LeadSlot::Phone => "What's the best phone number to reach you on?",
            LeadSlot::Suburb => "What suburb are you located in?",
            LeadSlot::JobDescription => "Now, briefly describe the electrical work you need done:",
        };

        format!("{acknowledgement}{question}")
    }

    fn after_capture_reply(&self, context: &ReplyContext<'_>) -> BotReply {
        if let GuardrailDecision::Redirect { user_message, .. } = context.guardrail {
            return BotReply::new(user_message.clone(), LEAD_SAVED_REPLIES);
        }

        let name = context.draft.get(LeadSlot::Name).unwrap_or("there");
        match context.browsing {
            Browsing::Declined => {
                return BotReply::new(
                    format!("No worries, thanks for chatting {name}! The team will be in touch soon."),
                    &[],
                );
            }
            Browsing::ExploreServices => {
                return BotReply::new(
                    "Sure! What would you like to know? Tap a service below or type your question:",
                    SERVICES_MENU_REPLIES,
                );
            }
            Browsing::None => {}
        }

        if let Some(topic) = self.topic_for(context) {
            return BotReply::new(
                format!("{}\n\nIs there anything else I can help with?", self.knowledge.answer(topic)),
                LEAD_SAVED_REPLIES,
            );
        }

        if context.intent.is_capture() && context.intent != Intent::Emergency {
            return BotReply::new(
                format!(
                    "We've already got your details, {name}. If you have another job in mind, mention it when we call or ring us on {}.",
                    self.business.phone
                ),
                LEAD_SAVED_REPLIES,
            );
        }

        BotReply::new("Is there anything else I can help with?", LEAD_SAVED_REPLIES)
    }

    fn browsing_reply(&self, context: &ReplyContext<'_>) -> BotReply {
        if let GuardrailDecision::Redirect { user_message, .. } = context.guardrail {
            return BotReply::new(user_message.clone(), DIY_REPLIES);
        }

        match context.browsing {
            Browsing::Declined => {
                return BotReply::new(
                    "No worries! Is there anything else I can help you with today?",
                    NEGATIVE_REPLIES,
                );
            }
            Browsing::ExploreServices => {
                return BotReply::new(
                    "We offer a wide range of electrical services! Here are some of our most popular ones - tap to learn more, or type your own question:",
                    SERVICES_MENU_REPLIES,
                );
            }
            Browsing::None => {}
        }

        if let Some(topic) = self.topic_for(context) {
            return BotReply::new(
                format!(
                    "{}\n\nWould you like to book a job or get a free quote? I can grab your details!",
                    self.knowledge.answer(topic)
                ),
                FAQ_FOLLOWUP_REPLIES,
            );
        }

        if context.intent == Intent::Greeting {
            let business = &self.business;
            return BotReply::new(
                format!(
                    "G'day! Welcome to {} - your trusted local sparky in {} with a {} rating! How can I help you today? I can answer questions about our services or help you book a job.",
                    business.name, business.service_area, business.rating
                ),
                GREETING_REPLIES,
            );
        }

        BotReply::new(
            "I'm here to help with electrical questions! What would you like to know about? Tap a service below or type your question:",
            SERVICES_MENU_REPLIES,
        )
    }

    fn topic_for(&self, context: &ReplyContext<'_>) -> Option<ServiceTopic> {
        match (context.intent, context.topic) {
            (Intent::ServiceArea, _) => Some(ServiceTopic::ServiceArea),
            (_, Some(ServiceTopic::General)) if context.intent == Intent::Greeting => None,
            (_, topic) => topic,
        }
    }
}

fn quick_replies_for(slot: LeadSlot) -> &'static [&'static str] {
    match slot {
        LeadSlot::Suburb => SUBURB_REPLIES,
        LeadSlot::JobDescription => JOB_REPLIES,
        LeadSlot::Name | LeadSlot::Phone => &[],
    }
}

fn reminder(slot: LeadSlot) -> String {
    format!(
        "\n\nBy the way, I was just collecting your details for a free quote. Just tell me your {} to continue.",
        slot.label()
    )
}

fn reask(slot: LeadSlot) -> &'static str {
    match slot {
        LeadSlot::Name => "I didn't quite catch that. Could you please tell me your name?",
        LeadSlot::Phone => "Hmm, that doesn't look like a valid phone number. Could you please enter your Australian mobile or landline number? (e.g., 0412 345 678)",
        LeadSlot::Suburb => "Which suburb are you in? Tap one below or type your suburb.",
        LeadSlot::JobDescription => "Could you briefly describe the electrical work you need done? (e.g., install two new powerpoints)",
    }
}

#[cfg(test)]
mod tests {
    use sparky_core::config::BusinessConfig;
    use sparky_core::domain::lead::{LeadDraft, LeadSlot};
    use sparky_core::flows::{DialogueAction, DialogueEvent, DialogueState, TransitionOutcome};

    use super::{Browsing, ReplyContext, ResponseComposer, MAX_QUICK_REPLIES, SUBURB_REPLIES};
    use crate::guardrails::GuardrailDecision;
    use crate::intent::Intent;
    use crate::knowledge::ServiceTopic;

    fn outcome(from: DialogueState, to: DialogueState) -> TransitionOutcome {
        TransitionOutcome { from, to, event: DialogueEvent::MessageReceived, actions: Vec::new() }
    }

    fn context<'a>(
        intent: Intent,
        outcome: &'a TransitionOutcome,
        draft: &'a LeadDraft,
        newly_filled: &'a [LeadSlot],
        guardrail: &'a GuardrailDecision,
    ) -> ReplyContext<'a> {
        ReplyContext {
            intent,
            outcome,
            draft,
            newly_filled,
            question: false,
            topic: None,
            guardrail,
            browsing: Browsing::None,
        }
    }

    #[test]
    fn emergency_reply_carries_phone_and_immediate_help() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::AwaitingIntent, DialogueState::CollectingName);
        let draft = LeadDraft::default();
        let reply = composer.compose(&context(Intent::Emergency, &outcome, &draft, &[], &GuardrailDecision::Allow));

        assert!(reply.text.contains("0448 195 614"));
        assert!(reply.text.contains("immediate help"));
        assert!(reply.text.contains("What's your name?"));
        assert!(reply.quick_replies.iter().all(|reply| !reply.contains("0448")));
    }

    #[test]
    fn prompts_interpolate_the_captured_name() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::CollectingName, DialogueState::CollectingPhone);
        let draft = LeadDraft { name: Some("Sam".to_owned()), ..LeadDraft::default() };
        let reply = composer.compose(&context(
            Intent::Unknown,
            &outcome,
            &draft,
            &[LeadSlot::Name],
            &GuardrailDecision::Allow,
        ));

        assert_eq!(reply.text, "Thanks Sam! What's the best phone number to reach you on?");
        assert!(reply.quick_replies.is_empty());
    }

    #[test]
    fn suburb_prompt_offers_suburb_quick_replies() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::CollectingPhone, DialogueState::CollectingSuburb);
        let draft = LeadDraft {
            name: Some("Sam".to_owned()),
            phone: Some("0412345678".to_owned()),
            ..LeadDraft::default()
        };
        let reply = composer.compose(&context(
            Intent::ProvideContactInfo,
            &outcome,
            &draft,
            &[LeadSlot::Phone],
            &GuardrailDecision::Allow,
        ));

        assert!(reply.text.contains("What suburb"));
        assert_eq!(reply.quick_replies, SUBURB_REPLIES);
        assert!(reply.quick_replies.len() <= MAX_QUICK_REPLIES);
    }

    #[test]
    fn unfilled_slot_is_asked_again() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::CollectingPhone, DialogueState::CollectingPhone);
        let draft = LeadDraft { name: Some("Sam".to_owned()), ..LeadDraft::default() };
        let reply = composer.compose(&context(Intent::Unknown, &outcome, &draft, &[], &GuardrailDecision::Allow));

        assert!(reply.text.contains("doesn't look like a valid phone number"));
    }

    #[test]
    fn question_mid_capture_answers_and_reminds() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::CollectingSuburb, DialogueState::CollectingSuburb);
        let draft = LeadDraft::default();
        let mut ctx = context(Intent::QuoteRequest, &outcome, &draft, &[], &GuardrailDecision::Allow);
        ctx.question = true;
        ctx.topic = Some(ServiceTopic::Pricing);
        let reply = composer.compose(&ctx);

        assert!(reply.text.starts_with("We offer free quotes"));
        assert!(reply.text.contains("your suburb to continue"));
    }

    #[test]
    fn completion_summarises_the_lead() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let mut outcome = outcome(DialogueState::CollectingSuburb, DialogueState::Complete);
        outcome.actions = vec![DialogueAction::SubmitLead, DialogueAction::SendConfirmation];
        let draft = LeadDraft {
            name: Some("Sam".to_owned()),
            phone: Some("0412345678".to_owned()),
            suburb: Some("Clyde North".to_owned()),
            job_description: Some("fix a broken switchboard".to_owned()),
        };
        let reply = composer.compose(&context(Intent::Unknown, &outcome, &draft, &[], &GuardrailDecision::Allow));

        assert!(reply.text.contains("• Suburb: Clyde North"));
        assert!(reply.text.contains("• Job: fix a broken switchboard"));
        assert!(reply.text.contains("0448 195 614"));
        assert_eq!(reply.quick_replies, vec!["Ask another question", "That's all, thanks"]);
    }

    #[test]
    fn greeting_and_unknown_in_browsing_mode() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::AwaitingIntent, DialogueState::AwaitingIntent);
        let draft = LeadDraft::default();

        let greeting = composer.compose(&context(Intent::Greeting, &outcome, &draft, &[], &GuardrailDecision::Allow));
        assert!(greeting.text.starts_with("G'day! Welcome to Add Power Electrics"));
        assert_eq!(greeting.quick_replies.len(), 3);

        let unknown = composer.compose(&context(Intent::Unknown, &outcome, &draft, &[], &GuardrailDecision::Allow));
        assert!(unknown.text.contains("electrical questions"));
        assert_eq!(unknown.quick_replies.len(), MAX_QUICK_REPLIES);
    }

    #[test]
    fn diy_redirect_replaces_instructions() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let outcome = outcome(DialogueState::AwaitingIntent, DialogueState::AwaitingIntent);
        let draft = LeadDraft::default();
        let guardrail = GuardrailDecision::Redirect {
            reason_code: "diy_electrical_work",
            user_message: "For your safety, call a sparky.".to_owned(),
        };
        let reply = composer.compose(&context(Intent::Unknown, &outcome, &draft, &[], &guardrail));

        assert_eq!(reply.text, "For your safety, call a sparky.");
        assert_eq!(reply.quick_replies, vec!["Yes, get a quote", "No thanks"]);
    }

    #[test]
    fn fallback_reply_points_to_the_phone() {
        let composer = ResponseComposer::new(BusinessConfig::default());
        let reply = composer.fallback_reply();
        assert!(reply.text.contains("call us directly on 0448 195 614"));
        assert!(reply.quick_replies.is_empty());
    }
}
