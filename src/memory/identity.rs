//! Transliteration-tolerant identity matching. Treats `Andrey` ~ `Andrei` ~
//! `Андрей` as the same user. This is a recall heuristic only — never use it
//! for access control; `scope=all` bypasses it entirely.

use std::collections::HashMap;
use std::sync::LazyLock;

static TRANSLIT_TABLE: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('д', "d"), ('е', "e"), ('ё', "e"),
        ('ж', "zh"), ('з', "z"), ('и', "i"), ('й', "y"), ('к', "k"), ('л', "l"), ('м', "m"),
        ('н', "n"), ('о', "o"), ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
        ('ф', "f"), ('х', "kh"), ('ц', "ts"), ('ч', "ch"), ('ш', "sh"), ('щ', "shch"),
        ('ъ', ""), ('ы', "y"), ('ь', ""), ('э', "e"), ('ю', "yu"), ('я', "ya"),
    ])
});

/// Lowercase, transliterate Cyrillic to Latin, replace non-alphanumerics
/// with spaces, collapse spaces.
pub fn normalize_identity(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for ch in lower.chars() {
        if let Some(latin) = TRANSLIT_TABLE.get(&ch) {
            out.push_str(latin);
        } else if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    let mut collapsed = String::with_capacity(out.len());
    let mut last_was_space = false;
    for ch in out.trim().chars() {
        if ch == ' ' {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }
    collapsed
}

/// Longest-common-subsequence ratio: matching characters * 2 / total length.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = longest_common_subsequence(&a, &b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn first_unique_tokens(value: &str, limit: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tokens = Vec::new();
    for word in value.split_whitespace() {
        if word.chars().count() < 2 {
            continue;
        }
        if seen.insert(word.to_string()) {
            tokens.push(word.to_string());
            if tokens.len() >= limit {
                break;
            }
        }
    }
    tokens
}

/// Heuristic equivalence of two user-name strings. Symmetric by
/// construction (every rule is itself symmetric in its two arguments).
pub fn identity_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let norm_a = normalize_identity(a);
    let norm_b = normalize_identity(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return false;
    }
    if norm_a == norm_b {
        return true;
    }
    if norm_a.len() >= 4 && norm_b.contains(&norm_a) {
        return true;
    }
    if norm_b.len() >= 4 && norm_a.contains(&norm_b) {
        return true;
    }

    let tokens_a = first_unique_tokens(&norm_a, 6);
    let tokens_b = first_unique_tokens(&norm_b, 6);
    if !tokens_a.is_empty() && !tokens_b.is_empty() {
        let set_a: std::collections::HashSet<&String> = tokens_a.iter().collect();
        let set_b: std::collections::HashSet<&String> = tokens_b.iter().collect();
        let overlap = set_a.intersection(&set_b).count();
        let smaller = set_a.len().min(set_b.len());
        if smaller > 0 && overlap as f64 / smaller as f64 >= 0.5 {
            return true;
        }
        for ta in &tokens_a {
            for tb in &tokens_b {
                if fuzzy_ratio(ta, tb) >= 0.78 {
                    return true;
                }
            }
        }
    }

    fuzzy_ratio(&norm_a, &norm_b) >= 0.72
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_match_is_symmetric() {
        let pairs = [
            ("Andrey", "Андрей"),
            ("Andrei", "Andrey"),
            ("Max", "Maxim"),
            ("John Smith", "Smith John"),
            ("totally different", "another name"),
        ];
        for (a, b) in pairs {
            assert_eq!(identity_match(a, b), identity_match(b, a), "{a} vs {b}");
        }
    }

    #[test]
    fn identity_match_handles_transliteration() {
        assert!(identity_match("Andrey", "Андрей"));
        assert!(identity_match("Andrei", "Андрей"));
    }

    #[test]
    fn identity_match_rejects_unrelated_names() {
        assert!(!identity_match("Andrey", "Svetlana"));
    }

    #[test]
    fn fuzzy_ratio_identical_strings_is_one() {
        assert_eq!(fuzzy_ratio("hello", "hello"), 1.0);
    }
}
