//! Text sanitizing and content screening for the strict profile.

use std::sync::LazyLock;

use regex::Regex;

static SPAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(whatsapp|telegram|call me|text me|dm me)\b",
        r"\b\d{10,}\b",
        r"(?i)(\bwww\.|\bhttps?\b|\.com\b|\.ng\b)",
        r"(?i)\b(wire transfer|western union|moneygram|bitcoin|crypto)\b",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

static INAPPROPRIATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fuck|shit|damn|bastard|idiot)\b").expect("valid regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Trims, collapses whitespace runs to one space and removes `<` / `>`.
pub(crate) fn sanitize_text(raw: &str) -> String {
    WHITESPACE_RUN
        .replace_all(raw.trim(), " ")
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect()
}

/// Contact details, links or payment instructions.
pub(crate) fn looks_like_spam(text: &str) -> bool {
    SPAM_PATTERNS.iter().any(|re| re.is_match(text))
}

pub(crate) fn has_inappropriate_language(text: &str) -> bool {
    INAPPROPRIATE_PATTERN.is_match(text)
}
