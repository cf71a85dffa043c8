/// Lowercases and strips punctuation (apostrophes kept), collapsing runs of whitespace.
pub(crate) fn normalize_text(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '\'' | '\u{2019}' => sanitized.push('\''),
            c if c.is_alphanumeric() => sanitized.extend(c.to_lowercase()),
            _ => sanitized.push(' '),
        }
    }
    tokenize(&sanitized).join(" ")
}

pub(crate) fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Word-bounded phrase match against text already passed through [`normalize_text`].
pub(crate) fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let haystack = format!(" {normalized} ");
    haystack.contains(&format!(" {phrase} "))
}

pub(crate) fn contains_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(normalized, phrase))
}

/// Capitalises the first letter of every word ("clyde north" -> "Clyde North").
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
