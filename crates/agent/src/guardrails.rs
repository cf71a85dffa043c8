use crate::text::{contains_any, normalize_text};

const DIY_PHRASES: &[&str] = &[
    "how to", "how do i", "how can i", "diy", "myself", "manually", "tutorial", "guide",
    "steps to", "can i do", "do it myself", "wire it myself",
];

/// Phrases that make a "how do I ..." message a booking question instead.
const BOOKING_PHRASES: &[&str] = &["book", "booking", "quote", "contact you", "reach you", "pay"];

const DIY_REDIRECT: &str = "For your safety, we strongly recommend NOT doing electrical work yourself. In Australia, DIY electrical work is illegal and can void your insurance, cause fires or serious injury.\n\nWe offer affordable rates and can usually come out within 24-48 hours. Want me to grab your details for a free quote?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Redirect { reason_code: &'static str, user_message: String },
}

impl GuardrailDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub diy_redirect_enabled: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { diy_redirect_enabled: true }
    }
}

impl GuardrailPolicy {
    /// Never hand out electrical how-to instructions; steer towards a licensed visit.
    pub fn evaluate(&self, text: &str) -> GuardrailDecision {
        if !self.diy_redirect_enabled {
            return GuardrailDecision::Allow;
        }

        let normalized = normalize_text(text);
        if contains_any(&normalized, DIY_PHRASES) && !contains_any(&normalized, BOOKING_PHRASES) {
            return GuardrailDecision::Redirect {
                reason_code: "diy_electrical_work",
                user_message: DIY_REDIRECT.to_string(),
            };
        }

        GuardrailDecision::Allow
    }
}
