use serde::{Deserialize, Serialize};

use sparky_core::config::BusinessConfig;

use crate::text::{contains_any, contains_phrase, normalize_text};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTopic {
    EvCharger,
    Powerpoint,
    Switchboard,
    Lighting,
    CeilingFan,
    SmokeAlarm,
    TvAndData,
    PowerFault,
    HotWater,
    ServiceArea,
    Availability,
    Pricing,
    Licensing,
    General,
}

/// Topic keyword table, most specific first.
const TOPIC_KEYWORDS: &[(ServiceTopic, &[&str])] = &[
    (
        ServiceTopic::EvCharger,
        &["ev", "evs", "electric vehicle", "ev charger", "tesla charger", "car charger", "charging station", "ev chargers"],
    ),
    (
        ServiceTopic::Powerpoint,
        &["powerpoint", "powerpoints", "power point", "power points", "outlet", "outlets", "socket", "sockets", "gpo", "gpos"],
    ),
    (
        ServiceTopic::Switchboard,
        &["switchboard", "switchboards", "fuse box", "safety switch", "rcd", "rcds", "circuit breaker"],
    ),
    (
        ServiceTopic::Lighting,
        &["light", "lights", "downlight", "downlights", "led", "leds", "lighting", "lamp"],
    ),
    (ServiceTopic::CeilingFan, &["ceiling fan", "ceiling fans", "fan", "fans"]),
    (
        ServiceTopic::SmokeAlarm,
        &["smoke alarm", "smoke alarms", "smoke detector", "smoke detectors", "fire alarm"],
    ),
    (
        ServiceTopic::TvAndData,
        &["tv", "television", "antenna", "data", "network", "internet"],
    ),
    (
        ServiceTopic::PowerFault,
        &["tripping", "trips", "trip", "keeps tripping", "power out", "no power", "fault", "faulty"],
    ),
    (ServiceTopic::HotWater, &["hot water", "water heater"]),
    (
        ServiceTopic::ServiceArea,
        &["area", "areas", "suburb", "suburbs", "location", "service area", "melbourne"],
    ),
    (
        ServiceTopic::Availability,
        &["available", "availability", "today", "tomorrow", "this week", "weekend", "hours", "open"],
    ),
    (
        ServiceTopic::Pricing,
        &["quote", "cost", "costs", "price", "prices", "how much", "pricing", "rates", "charge", "call out fee"],
    ),
    (
        ServiceTopic::Licensing,
        &["license", "licence", "licensed", "licenced", "insured", "insurance", "qualified", "certified"],
    ),
    (
        ServiceTopic::General,
        &["help", "service", "services", "work", "job", "install", "electrician", "sparky"],
    ),
];

const QUESTION_PHRASES: &[&str] = &[
    "how much", "how to", "how do", "how can", "how long", "what is", "what's", "what are",
    "what do", "when", "where", "why", "which", "can you", "can i", "do you", "is it",
    "are you", "cost", "price", "charge", "rate",
];

/// Heuristic: does the message read as a question rather than an answer?
pub fn is_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }
    let normalized = normalize_text(text);
    contains_any(&normalized, QUESTION_PHRASES)
}

/// Static FAQ answers for common electrical services.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    business: BusinessConfig,
}

impl KnowledgeBase {
    pub fn new(business: BusinessConfig) -> Self {
        Self { business }
    }

    pub fn lookup(&self, text: &str) -> Option<ServiceTopic> {
        let normalized = normalize_text(text);
        TOPIC_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| contains_phrase(&normalized, keyword)))
            .map(|(topic, _)| *topic)
    }

    pub fn answer(&self, topic: ServiceTopic) -> String {
        let business = &self.business;
        match topic {
            ServiceTopic::EvCharger => "EV charger installation is one of our growing specialties! We install home charging stations for Tesla, BYD, Hyundai and all other electric vehicles, from 7kW single-phase to 22kW three-phase chargers.".to_string(),
            ServiceTopic::Powerpoint => "Yes, we install powerpoints! Whether you need additional outlets, USB powerpoints or outdoor weatherproof GPOs, we've got you covered.".to_string(),
            ServiceTopic::Switchboard => "Switchboard upgrades are one of our specialties! We can upgrade old fuse boxes to modern safety switch boards, add circuits or install new RCDs.".to_string(),
            ServiceTopic::Lighting => "We're experts in lighting! LED downlights, pendant lights, outdoor security lighting, sensor lights - you name it.".to_string(),
            ServiceTopic::CeilingFan => "Ceiling fan installation is a popular service! We can install new fans or replace existing ones, including running new cabling where needed.".to_string(),
            ServiceTopic::SmokeAlarm => "Smoke alarm installation and testing is essential for safety! We install interconnected smoke alarms that comply with Australian regulations.".to_string(),
            ServiceTopic::TvAndData => "Yes! We do TV wall mounting, antenna installation and data points, with clean cable management included.".to_string(),
            ServiceTopic::PowerFault => format!(
                "Power tripping can be caused by faulty appliances, overloaded circuits or safety switch issues. This needs attention! If anything is sparking or smells like burning, call us now on {}.",
                business.phone
            ),
            ServiceTopic::HotWater => "We can help with hot water system electrical connections and troubleshooting, as well as wiring for new electric systems.".to_string(),
            ServiceTopic::ServiceArea => format!(
                "We service all of {}! From the CBD to the outer suburbs - Clyde North, Cranbourne, Berwick, Pakenham, Werribee, you name it.",
                business.service_area
            ),
            ServiceTopic::Availability => format!(
                "We're open {} and try to fit in urgent jobs where we can. For emergencies, call us on {}.",
                business.hours, business.phone
            ),
            ServiceTopic::Pricing => "We offer free quotes for most jobs! Pricing depends on the scope of work, so we'll give you an accurate, no-obligation price once we know the details.".to_string(),
            ServiceTopic::Licensing => format!(
                "Absolutely! {} is fully licensed and insured. All our work meets Australian electrical standards and we provide certificates of compliance.",
                business.name
            ),
            ServiceTopic::General => "We offer a full range of residential and commercial electrical services, including powerpoints, lighting, switchboards, smoke alarms, ceiling fans and EV chargers.".to_string(),
        }
    }
}
