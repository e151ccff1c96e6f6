//! Cross-lingual (RU/EN) synonym groups, key aliases, default tags by key,
//! and slot-hint regexes — all compiled/normalized once at first use.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::normalize::normalize_term;

pub struct SynonymGroup {
    pub canonical: &'static str,
    pub terms: &'static [&'static str],
}

/// Seven fixed cross-lingual synonym groups. Each group's own canonical name
/// is always a member of its own `terms`, which is what makes
/// `canonicalize_key` idempotent.
pub static SYNONYM_GROUPS: &[SynonymGroup] = &[
    SynonymGroup {
        canonical: "phone",
        terms: &[
            "phone", "smartphone", "mobile", "cellphone", "iphone", "android", "телефон",
            "смартфон", "мобильник", "сотовый", "айфон", "андроид",
        ],
    },
    SynonymGroup {
        canonical: "device",
        terms: &["device", "gadget", "hardware", "устройство", "девайс", "гаджет"],
    },
    SynonymGroup {
        canonical: "name",
        terms: &["name", "username", "nickname", "имя", "фио", "ник", "никнейм"],
    },
    SynonymGroup {
        canonical: "city",
        terms: &["city", "town", "location", "город", "локация"],
    },
    SynonymGroup {
        canonical: "profession",
        terms: &["profession", "job", "occupation", "профессия", "работа", "должность"],
    },
    SynonymGroup {
        canonical: "email",
        terms: &["email", "mail", "почта", "имейл"],
    },
    SynonymGroup {
        canonical: "timezone",
        terms: &["timezone", "tz", "таймзона", "часовой"],
    },
];

/// `term -> {all group members}`, built once from normalized terms.
static SYNONYM_ALIASES: LazyLock<HashMap<String, HashSet<String>>> = LazyLock::new(|| {
    let mut aliases: HashMap<String, HashSet<String>> = HashMap::new();
    for group in SYNONYM_GROUPS {
        let normalized: HashSet<String> = group
            .terms
            .iter()
            .map(|t| normalize_term(t))
            .filter(|t| !t.is_empty())
            .collect();
        for item in &normalized {
            aliases.insert(item.clone(), normalized.clone());
        }
    }
    aliases
});

/// `normalized term -> canonical slot key` (e.g. "iphone" -> "phone").
static KEY_ALIASES: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for group in SYNONYM_GROUPS {
        for term in group.terms {
            let normalized = normalize_term(term);
            if !normalized.is_empty() {
                map.insert(normalized, group.canonical);
            }
        }
    }
    map
});

static DEFAULT_TAGS_BY_KEY: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        HashMap::from([
            ("phone", &["device", "phone"][..]),
            ("device", &["device"][..]),
            ("name", &["identity"][..]),
            ("city", &["location"][..]),
            ("profession", &["identity"][..]),
            ("email", &["contact"][..]),
            ("timezone", &["preference"][..]),
        ])
    });

/// Look up the canonical slot for an already-`normalize_token`-ed key.
/// Keys with no known alias pass through unchanged.
pub fn canonicalize_key(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    KEY_ALIASES
        .get(token)
        .map(|c| c.to_string())
        .unwrap_or_else(|| token.to_string())
}

pub fn default_tags_for_key(key: &str) -> &'static [&'static str] {
    DEFAULT_TAGS_BY_KEY.get(key).copied().unwrap_or(&[])
}

/// `terms ∪ ⋃ synonyms(t)`, deduped preserving order.
pub fn expand_query_terms(terms: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    for raw in terms {
        let term = normalize_term(raw);
        if term.is_empty() {
            continue;
        }
        if seen.insert(term.clone()) {
            expanded.push(term.clone());
        }
        if let Some(group) = SYNONYM_ALIASES.get(&term) {
            let mut synonyms: Vec<&String> = group.iter().collect();
            synonyms.sort();
            for synonym in synonyms {
                if seen.insert(synonym.clone()) {
                    expanded.push(synonym.clone());
                }
            }
        }
    }
    expanded
}

/// The canonical slot a query term hints at, if any — used to infer a `key`
/// filter from the first recognizable term in a free-text query.
pub fn slot_for_term(term: &str) -> Option<&'static str> {
    KEY_ALIASES.get(&normalize_term(term)).copied()
}

struct SlotHint {
    key: &'static str,
    patterns: &'static [&'static str],
    tags: &'static [&'static str],
}

static SLOT_HINTS: &[SlotHint] = &[
    SlotHint {
        key: "email",
        patterns: &[r"(?i)[\w.+-]+@[\w-]+\.[\w.-]+"],
        tags: &["contact"],
    },
    SlotHint {
        key: "phone",
        patterns: &[
            r"(?i)\b(iphone|android|смартфон|телефон|мобильник|айфон|андроид)\b",
            r"\+?\d[\d\s\-()]{7,}\d",
        ],
        tags: &["device", "phone"],
    },
    SlotHint {
        key: "name",
        patterns: &[r"(?i)меня зовут|my name is|i am called|i'm called"],
        tags: &["identity"],
    },
    SlotHint {
        key: "city",
        patterns: &[r"(?i)я живу в|i live in|родился в|i was born in"],
        tags: &["location"],
    },
    SlotHint {
        key: "profession",
        patterns: &[r"(?i)я работаю|i work as|my job is|my profession is"],
        tags: &["identity"],
    },
    SlotHint {
        key: "timezone",
        patterns: &[r"(?i)часовой пояс|my timezone|utc[+\-]\d"],
        tags: &["preference"],
    },
];

static COMPILED_SLOT_HINTS: LazyLock<Vec<(&'static str, Vec<Regex>, &'static [&'static str])>> =
    LazyLock::new(|| {
        SLOT_HINTS
            .iter()
            .map(|hint| {
                let compiled = hint
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("static slot-hint pattern must compile"))
                    .collect();
                (hint.key, compiled, hint.tags)
            })
            .collect()
    });

/// Run the ordered slot-hint rules against a fact, returning the first
/// matching slot key and its default tags.
pub fn infer_slot(fact: &str) -> Option<(&'static str, &'static [&'static str])> {
    for (key, patterns, tags) in COMPILED_SLOT_HINTS.iter() {
        if patterns.iter().any(|re| re.is_match(fact)) {
            return Some((key, tags));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_key_is_idempotent() {
        for raw in ["iphone", "телефон", "unknown-key", "device"] {
            let once = canonicalize_key(raw);
            let twice = canonicalize_key(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn expand_query_terms_is_idempotent_on_its_output() {
        let terms = vec!["phone".to_string(), "laptop".to_string()];
        let once = expand_query_terms(&terms);
        let twice = expand_query_terms(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn infer_slot_detects_phone_fact() {
        let (key, tags) = infer_slot("мой iPhone 15").unwrap();
        assert_eq!(key, "phone");
        assert!(tags.contains(&"device"));
    }

    #[test]
    fn infer_slot_detects_email_fact() {
        let (key, tags) = infer_slot("email me at a@b.co").unwrap();
        assert_eq!(key, "email");
        assert!(tags.contains(&"contact"));
    }
}
