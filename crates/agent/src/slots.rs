use once_cell::sync::Lazy;
use regex::Regex;

use sparky_core::domain::lead::{normalize_phone, LeadDraft, LeadSlot};

use crate::knowledge::is_question;
use crate::text::{contains_any, normalize_text, title_case, tokenize};

// Mobiles and landlines with an optional +61/61 prefix; separators between digits.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?(?:\+?61[\s-]?|0)[2-478]\)?(?:[\s.-]?\d){8}").expect("valid phone pattern")
});

static STRONG_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:my name is|my name's|name is|name's)\s+([a-z][a-z'\-]*(?:\s+[a-z][a-z'\-]*){0,2})")
        .expect("valid name pattern")
});

// Trusted only while the name is solicited or when the name closes its clause.
static WEAK_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:this is|i am|i'm|im)\s+([a-z][a-z'\-]*(?:\s+[a-z][a-z'\-]*){0,2})")
        .expect("valid name pattern")
});

/// Suburbs recognised without prompting. Matched longest first.
pub const KNOWN_SUBURBS: &[&str] = &[
    "Beaconsfield",
    "Berwick",
    "Box Hill",
    "Brighton",
    "Brunswick",
    "Carrum Downs",
    "Clayton",
    "Clyde",
    "Clyde North",
    "Coburg",
    "Craigieburn",
    "Cranbourne",
    "Cranbourne East",
    "Cranbourne North",
    "Cranbourne West",
    "Dandenong",
    "Dandenong North",
    "Doncaster",
    "Doveton",
    "Endeavour Hills",
    "Ferntree Gully",
    "Footscray",
    "Frankston",
    "Glen Waverley",
    "Hallam",
    "Hampton Park",
    "Hoppers Crossing",
    "Keysborough",
    "Lynbrook",
    "Lyndhurst",
    "Melbourne",
    "Mulgrave",
    "Narre Warren",
    "Narre Warren South",
    "Officer",
    "Pakenham",
    "Point Cook",
    "Preston",
    "Richmond",
    "Ringwood",
    "Rowville",
    "St Kilda",
    "Sunbury",
    "Tarneit",
    "Werribee",
];

static SUBURBS_LONGEST_FIRST: Lazy<Vec<(&'static str, String)>> = Lazy::new(|| {
    let mut suburbs = KNOWN_SUBURBS
        .iter()
        .map(|suburb| (*suburb, normalize_text(suburb)))
        .collect::<Vec<_>>();
    suburbs.sort_by(|left, right| right.1.len().cmp(&left.1.len()));
    suburbs
});

/// Words that end a name captured after "my name is" / "I'm".
const NAME_STOPWORDS: &[&str] = &[
    "a", "an", "and", "at", "available", "calling", "from", "getting", "going", "having", "here",
    "in", "interested", "just", "keen", "located", "looking", "my", "near", "needing", "not",
    "on", "phone", "ready", "so", "the", "to", "trying", "wanting", "with", "wondering",
    "about", "after", "of", "sick", "tired", "worried", "hoping",
];

/// Words that may follow an unprompted "I'm Sam" and still close the name.
const NAME_CLAUSE_BREAKS: &[&str] = &["from", "in", "at", "and", "here"];

/// Words that never appear in a name or a suburb.
const NOT_A_NAME: &[&str] = &[
    "quote", "help", "emergency", "urgent", "please", "thanks", "thank", "need", "want", "fix",
    "install", "installation", "book", "booking", "continue", "cancel", "other", "yes", "no",
    "hi", "hello", "hey", "ok", "okay", "sure", "nah", "nope",
];

/// Keywords that mark free text as a description of electrical work.
pub(crate) const SERVICE_KEYWORDS: &[&str] = &[
    "powerpoint", "powerpoints", "power point", "outlet", "socket", "gpo", "switchboard",
    "fuse", "safety switch", "rcd", "circuit", "light", "lights", "lighting", "downlight",
    "downlights", "led", "fan", "fans", "smoke alarm", "smoke alarms", "ev", "charger",
    "wiring", "rewire", "rewiring", "tv", "antenna", "data", "hot water", "oven", "cooktop",
    "install", "installation", "replace", "repair", "fix", "upgrade", "broken", "tripping",
    "fault", "electrical", "power",
];

/// Leading words dropped before assigning free text to a slot.
const FILLER_PREFIXES: &[&str] = &[
    "i live in", "i'm in", "im in", "i am in", "we're in", "located in", "based in", "it's",
    "its", "it is", "in", "at", "from", "and", "also", "um", "uh", "just", "so",
];

/// Trailing connectors left behind once a suburb is cut out ("Sam from").
const FILLER_SUFFIXES: &[&str] = &["from", "in", "at", "and", "near", "of"];

/// Pulls lead slots out of one message.
#[derive(Clone, Debug, Default)]
pub struct SlotExtractor;

impl SlotExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns `draft` with any newly recognised slots filled. Filled slots are
    /// never overwritten; a message with a phone number fills only the phone.
    pub fn extract(&self, text: &str, draft: &LeadDraft, solicited: Option<LeadSlot>) -> LeadDraft {
        let mut updated = draft.clone();
        let text = text.trim();
        if text.is_empty() {
            return updated;
        }

        if let Some(phone) = find_phone(text) {
            updated.fill(LeadSlot::Phone, phone);
            return updated;
        }

        let mut remainder = text.to_string();

        if let Some((name, span)) = find_explicit_name(text, solicited) {
            updated.fill(LeadSlot::Name, name);
            remainder.replace_range(span, " ");
        }

        // Questions only contribute explicit details; free text is never
        // assigned from them.
        if is_question(text) {
            return updated;
        }

        let suburb = find_known_suburb(&remainder);
        if let Some((suburb, span)) = &suburb {
            updated.fill(LeadSlot::Suburb, *suburb);
            remainder.replace_range(span.clone(), " ");
        }

        let remainder = clean_remainder(&remainder);
        if remainder.is_empty() {
            return updated;
        }

        match solicited {
            Some(LeadSlot::Name) => {
                if looks_like_name(&remainder) {
                    updated.fill(LeadSlot::Name, title_case(&remainder));
                }
            }
            Some(LeadSlot::Suburb) => {
                if suburb.is_some() || mentions_service(&remainder) {
                    if is_meaningful_description(&remainder) {
                        updated.fill(LeadSlot::JobDescription, remainder);
                    }
                } else if looks_like_place(&remainder) {
                    updated.fill(LeadSlot::Suburb, title_case(&remainder));
                }
            }
            Some(LeadSlot::JobDescription) => {
                if is_meaningful_description(&remainder) {
                    updated.fill(LeadSlot::JobDescription, remainder);
                }
            }
            Some(LeadSlot::Phone) | None => {}
        }

        updated
    }
}

/// First valid Australian phone number in `text`, normalised to 10 digits.
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_PATTERN.find_iter(text).find_map(|candidate| {
        let before = text[..candidate.start()].chars().next_back();
        let after = text[candidate.end()..].chars().next();
        let bounded = !before.is_some_and(|c| c.is_ascii_digit())
            && !after.is_some_and(|c| c.is_ascii_digit());
        if bounded {
            normalize_phone(candidate.as_str())
        } else {
            None
        }
    })
}

fn find_explicit_name(
    text: &str,
    solicited: Option<LeadSlot>,
) -> Option<(String, std::ops::Range<usize>)> {
    if let Some(found) = name_after(&STRONG_NAME_PATTERN, text) {
        return Some(found);
    }

    let (name, span) = name_after(&WEAK_NAME_PATTERN, text)?;
    if solicited == Some(LeadSlot::Name) || closes_capitalised_name(text, span.clone()) {
        Some((name, span))
    } else {
        None
    }
}

fn name_after(pattern: &Regex, text: &str) -> Option<(String, std::ops::Range<usize>)> {
    let captures = pattern.captures(text)?;
    let whole = captures.get(0)?;
    let group = captures.get(1)?;

    let name_words = group
        .as_str()
        .split_whitespace()
        .take_while(|word| {
            let lowered = word.to_ascii_lowercase();
            !NAME_STOPWORDS.contains(&lowered.as_str()) && !NOT_A_NAME.contains(&lowered.as_str())
        })
        .collect::<Vec<_>>();
    if name_words.is_empty() {
        return None;
    }

    // Only the phrase and the name itself leave the remainder.
    let mut cursor = 0;
    for word in &name_words {
        if let Some(index) = group.as_str()[cursor..].find(word) {
            cursor += index + word.len();
        }
    }

    Some((title_case(&name_words.join(" ")), whole.start()..group.start() + cursor))
}

/// An unprompted "I'm Sam" counts only when the name is written capitalised and
/// ends its clause ("I'm Sam.", "I'm Sam from Berwick").
fn closes_capitalised_name(text: &str, span: std::ops::Range<usize>) -> bool {
    let phrase = &text[span.clone()];
    let name = phrase
        .split_whitespace()
        .skip_while(|word| {
            let lowered = word.to_ascii_lowercase();
            matches!(lowered.as_str(), "this" | "is" | "i" | "am" | "i'm" | "im")
        })
        .collect::<Vec<_>>();
    if name.is_empty() || !name.iter().all(|word| word.chars().next().is_some_and(char::is_uppercase)) {
        return false;
    }

    let rest = text[span.end..].trim_start();
    match rest.chars().next() {
        None => true,
        Some(c) if matches!(c, ',' | '.' | '!' | '?' | ';' | ':') => true,
        Some(_) => rest
            .split_whitespace()
            .next()
            .is_some_and(|word| NAME_CLAUSE_BREAKS.contains(&word.to_ascii_lowercase().as_str())),
    }
}

fn find_known_suburb(text: &str) -> Option<(&'static str, std::ops::Range<usize>)> {
    let lowered = text.to_ascii_lowercase();
    SUBURBS_LONGEST_FIRST.iter().find_map(|(suburb, needle)| {
        let mut search_from = 0;
        while let Some(offset) = lowered[search_from..].find(needle.as_str()) {
            let start = search_from + offset;
            let end = start + needle.len();
            let before_ok = lowered[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
            let after_ok = lowered[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
            if before_ok && after_ok {
                return Some((*suburb, start..end));
            }
            search_from = end;
        }
        None
    })
}

fn clean_remainder(text: &str) -> String {
    let trim_chars: &[char] = &[',', '.', '!', '-', ':', ';', ' ', '\t', '\n'];
    let mut cleaned = tokenize(text).join(" ").trim_matches(trim_chars).to_string();

    loop {
        let lowered = cleaned.to_ascii_lowercase();
        let prefix = FILLER_PREFIXES.iter().find(|prefix| {
            lowered == **prefix || lowered.starts_with(&format!("{prefix} "))
        });
        match prefix {
            Some(prefix) => {
                cleaned = cleaned[prefix.len()..].trim_matches(trim_chars).to_string();
            }
            None => break,
        }
    }

    loop {
        let lowered = cleaned.to_ascii_lowercase();
        let suffix = FILLER_SUFFIXES.iter().find(|suffix| {
            lowered == **suffix || lowered.ends_with(&format!(" {suffix}"))
        });
        match suffix {
            Some(suffix) => {
                let keep = cleaned.len() - suffix.len();
                cleaned = cleaned[..keep].trim_matches(trim_chars).to_string();
            }
            None => break,
        }
    }

    cleaned
}

fn letter_ratio_ok(text: &str) -> bool {
    let total = text.chars().count();
    let letters = text
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '\'' | '-'))
        .count();
    total > 0 && letters * 10 >= total * 7
}

fn looks_like_name(text: &str) -> bool {
    let length = text.chars().count();
    if !(2..=50).contains(&length) || is_question(text) || !letter_ratio_ok(text) {
        return false;
    }
    let normalized = normalize_text(text);
    let words = tokenize(&normalized);
    words.len() <= 4
        && !words.iter().any(|word| NOT_A_NAME.contains(word))
        && !mentions_service(text)
}

fn looks_like_place(text: &str) -> bool {
    let length = text.chars().count();
    if !(3..=40).contains(&length) || is_question(text) || !letter_ratio_ok(text) {
        return false;
    }
    let normalized = normalize_text(text);
    let words = tokenize(&normalized);
    words.len() <= 4 && !words.iter().any(|word| NOT_A_NAME.contains(word))
}

fn mentions_service(text: &str) -> bool {
    contains_any(&normalize_text(text), SERVICE_KEYWORDS)
}

fn is_meaningful_description(text: &str) -> bool {
    let normalized = normalize_text(text);
    let words = tokenize(&normalized);
    if words.is_empty() || normalized.chars().count() < 3 || is_question(text) {
        return false;
    }
    let all_filler = words.iter().all(|word| NOT_A_NAME.contains(word));
    !all_filler && normalized.chars().any(char::is_alphabetic)
}
