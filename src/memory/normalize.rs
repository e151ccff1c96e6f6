//! Whitespace/length normalization, Unicode word tokenization, stopwording,
//! and the token shape shared by keys and tags.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// RU/EN interrogatives, pronouns, and prepositions dropped from query tokens.
pub const STOPWORDS: &[&str] = &[
    "какой", "какая", "какое", "какие", "кто", "что", "где", "когда", "почему", "зачем", "как",
    "мне", "меня", "мой", "моя", "мое", "моё", "мои", "у", "про", "обо", "об", "about", "what",
    "which", "who", "where", "when", "why", "how", "my", "me", "i", "you",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w.\-]+").unwrap());
static WORD_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\W_]{2,}").unwrap());

/// Collapse whitespace runs to a single space, trim, and cap length
/// (right-trimming so we never split mid multi-byte character at the
/// truncation boundary awkwardly).
pub fn normalize_text(value: &str, max_len: usize) -> String {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    let collapsed = collapsed.trim();
    if max_len == 0 || char_len(collapsed) <= max_len {
        return collapsed.to_string();
    }
    truncate_chars(collapsed, max_len).trim_end().to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Lowercase, collapse whitespace to `-`, strip characters outside
/// Unicode `\w`, `.`, `-`, and trim leading/trailing `._-`.
pub fn normalize_token(value: &str, max_len: usize) -> String {
    let text = normalize_text(value, (max_len * 3).max(24)).to_lowercase();
    if text.is_empty() {
        return String::new();
    }
    let hyphenated = WHITESPACE_RE.replace_all(&text, "-");
    let stripped = NON_TOKEN_RE.replace_all(&hyphenated, "");
    let trimmed = stripped.trim_matches(|c| c == '.' || c == '_' || c == '-');
    if char_len(trimmed) > max_len {
        truncate_chars(trimmed, max_len)
            .trim_end_matches(|c| c == '.' || c == '_' || c == '-')
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// `normalize_token` capped at 48, falling back to lowercased free text
/// when tokenization strips everything (e.g. a purely symbolic term).
pub fn normalize_term(value: &str) -> String {
    let token = normalize_token(value, 48);
    if !token.is_empty() {
        return token;
    }
    normalize_text(value, 48).to_lowercase()
}

/// Lowercase, extract Unicode word runs of length >= 2, drop stopwords,
/// dedupe preserving order, cap at 16 tokens.
pub fn tokenize_query(value: &str) -> Vec<String> {
    let safe = normalize_text(value, 220).to_lowercase();
    if safe.is_empty() {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for m in WORD_RUN_RE.find_iter(&safe) {
        let token = m.as_str();
        if STOPWORD_SET.contains(token) {
            continue;
        }
        if seen.insert(token.to_string()) {
            tokens.push(token.to_string());
            if tokens.len() >= 16 {
                break;
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_and_trims() {
        assert_eq!(normalize_text("  a   b\n\tc  ", 0), "a b c");
    }

    #[test]
    fn normalize_text_caps_length() {
        assert_eq!(normalize_text("abcdef ", 3), "abc");
    }

    #[test]
    fn normalize_token_lowercases_and_hyphenates() {
        assert_eq!(normalize_token("My Phone!!", 32), "my-phone");
    }

    #[test]
    fn normalize_token_strips_stray_punctuation() {
        assert_eq!(normalize_token("  ..weird__key--  ", 32), "weird__key");
    }

    #[test]
    fn tokenize_query_drops_stopwords_and_dedupes() {
        let tokens = tokenize_query("что ты помнишь про мой телефон телефон");
        assert_eq!(tokens, vec!["ты", "помнишь", "телефон"]);
    }

    #[test]
    fn tokenize_query_caps_at_sixteen() {
        let long: String = (0..20).map(|i| format!("word{i} ")).collect();
        assert_eq!(tokenize_query(&long).len(), 16);
    }
}
