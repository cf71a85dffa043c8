use std::fmt;

use serde::{Deserialize, Serialize};

use crate::slots::find_phone;
use crate::text::{contains_any, normalize_text};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    QuoteRequest,
    ServiceArea,
    Emergency,
    ProvideContactInfo,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::QuoteRequest => "quote_request",
            Self::ServiceArea => "service_area",
            Self::Emergency => "emergency",
            Self::ProvideContactInfo => "provide_contact_info",
            Self::Unknown => "unknown",
        }
    }

    /// Intents that start lead capture.
    pub fn is_capture(&self) -> bool {
        matches!(self, Self::QuoteRequest | Self::Emergency | Self::ProvideContactInfo)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EMERGENCY_PHRASES: &[&str] = &[
    "emergency",
    "emergency help",
    "urgent",
    "urgently",
    "asap",
    "right now",
    "sparking",
    "sparks",
    "burning smell",
    "smells like burning",
    "on fire",
    "electric shock",
    "got a shock",
    "exposed wires",
    "no power",
    "power out",
    "power outage",
    "blackout",
];

const QUOTE_PHRASES: &[&str] = &[
    "quote",
    "quotes",
    "free quote",
    "get a quote",
    "quotation",
    "estimate",
    "book",
    "booking",
    "book in",
    "appointment",
    "schedule",
    "come out",
    "visit",
    "call me",
    "call back",
    "callback",
    "contact me",
    "how much",
    "price",
    "pricing",
    "cost",
    "hire",
    "continue booking",
];

const SERVICE_AREA_PHRASES: &[&str] = &[
    "service area",
    "service areas",
    "what areas",
    "which areas",
    "do you service",
    "do you cover",
    "do you come to",
    "travel to",
    "suburbs",
    "where are you",
    "where are you based",
    "located",
    "location",
];

const CONTACT_PHRASES: &[&str] = &[
    "my name is",
    "my name's",
    "name is",
    "my number is",
    "my phone",
    "my mobile",
    "phone number is",
    "mobile is",
    "reach me on",
    "call me on",
    "contact me on",
];

const GREETING_PHRASES: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "howdy",
    "g'day",
    "gday",
    "good morning",
    "good afternoon",
    "good evening",
];

const AFFIRMATIVE_WORDS: &[&str] =
    &["yes", "yeah", "yep", "sure", "ok", "okay", "please", "definitely", "absolutely", "yes please"];

const NEGATIVE_PHRASES: &[&str] =
    &["no", "nah", "nope", "no thanks", "no thank you", "that's all", "thats all", "not now", "maybe later"];

/// Closed-set intent classifier over static phrase tables.
///
/// Tables are checked in priority order (emergency, quote request, service area,
/// contact details, greeting); the first table with a word-bounded hit wins. A message
/// carrying a valid Australian phone number counts as contact details.
#[derive(Clone, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Intent::Unknown;
        }

        if contains_any(&normalized, EMERGENCY_PHRASES) {
            return Intent::Emergency;
        }
        if contains_any(&normalized, QUOTE_PHRASES) {
            return Intent::QuoteRequest;
        }
        if contains_any(&normalized, SERVICE_AREA_PHRASES) {
            return Intent::ServiceArea;
        }
        if contains_any(&normalized, CONTACT_PHRASES) || find_phone(text).is_some() {
            return Intent::ProvideContactInfo;
        }
        if contains_any(&normalized, GREETING_PHRASES) {
            return Intent::Greeting;
        }

        Intent::Unknown
    }
}

/// Whole-message yes ("yes", "sure", "ok thanks").
pub fn is_affirmative(text: &str) -> bool {
    let normalized = normalize_text(text);
    AFFIRMATIVE_WORDS.iter().any(|word| {
        normalized == *word
            || normalized.starts_with(&format!("{word} "))
            || normalized.ends_with(&format!(" {word}"))
    })
}

pub fn is_negative(text: &str) -> bool {
    let normalized = normalize_text(text);
    NEGATIVE_PHRASES.iter().any(|phrase| {
        normalized == *phrase || normalized.starts_with(&format!("{phrase} "))
    })
}
