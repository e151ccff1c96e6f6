//! The `MemoryEntry` record: normalization, validation, derived lexical
//! blob and sparse vector, and the read-only public projection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identity::fuzzy_ratio;
use super::normalize::{normalize_term, normalize_text, normalize_token, tokenize_query};
use super::synonyms::{canonicalize_key, expand_query_terms};

pub const MAX_ENTRIES: usize = 2000;
pub const JSON_MIRROR_MAX: usize = 600;
pub const MAX_FACT_LEN: usize = 1200;
pub const MAX_KEY_LEN: usize = 72;
pub const MAX_TAGS: usize = 12;
pub const MAX_TAG_LEN: usize = 32;
pub const MAX_VECTOR_TERMS: usize = 220;
pub const MAX_LEXICAL_BLOB: usize = 4000;

/// The single persisted entity. `lexical_blob`/`semantic_vector` are
/// derived from the other fields and never (de)serialized directly — they
/// are recomputed by [`MemoryEntry::derive`] on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub key: String,
    pub fact: String,
    pub tags: Vec<String>,
    pub importance: i32,
    pub created_at: String,
    pub updated_at: String,
    pub user_name: String,
    pub chat_id: String,
    #[serde(skip, default)]
    pub lexical_blob: String,
    #[serde(skip, default)]
    pub semantic_vector: HashMap<String, f64>,
}

/// A read-only, derived-field-free projection returned to callers. The
/// `user_name` field is present only for `scope=all` recalls.
#[derive(Debug, Clone, Serialize)]
pub struct PublicMemory {
    pub id: String,
    pub key: String,
    pub fact: String,
    pub tags: Vec<String>,
    pub importance: i32,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

pub fn new_id() -> String {
    format!("mem-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

pub fn parse_iso(value: &str) -> chrono::DateTime<chrono::Utc> {
    if value.is_empty() {
        return chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap();
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap())
}

/// Dedupe + validate + cap tags, canonicalizing each like a key.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for item in raw.iter().take(MAX_TAGS * 4) {
        let tag = normalize_token(item, MAX_TAG_LEN);
        if tag.is_empty() || seen.contains(&tag) {
            continue;
        }
        seen.insert(tag.clone());
        tags.push(tag);
        if tags.len() >= MAX_TAGS {
            break;
        }
    }
    tags
}

/// Merge two tag lists, deduping and capping at `MAX_TAGS`.
pub fn merge_tags(left: &[String], right: &[String]) -> Vec<String> {
    let mut merged = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for source in [left, right] {
        for raw in source {
            let tag = normalize_token(raw, MAX_TAG_LEN);
            if tag.is_empty() || seen.contains(&tag) {
                continue;
            }
            seen.insert(tag.clone());
            merged.push(tag);
            if merged.len() >= MAX_TAGS {
                return merged;
            }
        }
    }
    merged
}

pub fn clamp_importance(value: i32) -> i32 {
    value.clamp(1, 5)
}

impl MemoryEntry {
    /// Build a fresh entry from already-validated fields (used by
    /// `remember`). `created_at`/`updated_at` are both set to now.
    pub fn fresh(
        key: String,
        fact: String,
        tags: Vec<String>,
        importance: i32,
        user_name: String,
        chat_id: String,
    ) -> Self {
        let now = now_iso();
        let mut entry = Self {
            id: new_id(),
            key,
            fact,
            tags,
            importance: clamp_importance(importance),
            created_at: now.clone(),
            updated_at: now,
            user_name,
            chat_id,
            lexical_blob: String::new(),
            semantic_vector: HashMap::new(),
        };
        entry.derive();
        entry
    }

    /// Re-derive `lexical_blob` and `semantic_vector` from the other
    /// fields. Must be called after any mutation and before persisting.
    pub fn derive(&mut self) {
        self.lexical_blob = build_lexical_blob(&self.fact, &self.key, &self.tags);
        self.semantic_vector = build_sparse_vector(&self.lexical_blob);
    }

    /// Loosely-typed normalization used when loading rows from the JSON
    /// mirror or SQLite — tolerant of missing/malformed fields the way the
    /// storage layer's "never raise" policy requires. Returns `None` only
    /// when there is no usable fact.
    pub fn normalize_loose(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let fact = normalize_text(str_field(obj, "fact").as_str(), MAX_FACT_LEN);
        if fact.is_empty() {
            return None;
        }
        let id = {
            let candidate = normalize_text(str_field(obj, "id").as_str(), 120);
            if candidate.is_empty() { new_id() } else { candidate }
        };
        let key = canonicalize_key(&normalize_token(str_field(obj, "key").as_str(), MAX_KEY_LEN));
        let tags = normalize_tags(&tags_field(obj));
        let importance = clamp_importance(int_field(obj, "importance", 3));
        let created_at = {
            let candidate = normalize_text(str_field(obj, "created_at").as_str(), 64);
            if candidate.is_empty() { now_iso() } else { candidate }
        };
        let updated_at = {
            let candidate = normalize_text(str_field(obj, "updated_at").as_str(), 64);
            if candidate.is_empty() { created_at.clone() } else { candidate }
        };
        let user_name = normalize_text(str_field(obj, "user_name").as_str(), 96);
        let chat_id = normalize_text(str_field(obj, "chat_id").as_str(), 96);

        let mut entry = Self {
            id,
            key,
            fact,
            tags,
            importance,
            created_at,
            updated_at,
            user_name,
            chat_id,
            lexical_blob: String::new(),
            semantic_vector: HashMap::new(),
        };
        if parse_iso(&entry.updated_at) < parse_iso(&entry.created_at) {
            entry.updated_at = entry.created_at.clone();
        }
        entry.derive();
        Some(entry)
    }

    pub fn to_public(&self, include_user: bool) -> PublicMemory {
        PublicMemory {
            id: self.id.clone(),
            key: self.key.clone(),
            fact: self.fact.clone(),
            tags: self.tags.clone(),
            importance: self.importance,
            updated_at: self.updated_at.clone(),
            user_name: include_user.then(|| self.user_name.clone()),
        }
    }

    /// Searchable blob used by `forget`'s substring matching: fact + key +
    /// tags, lowercased (not the synonym-expanded lexical blob).
    pub fn search_blob(&self) -> String {
        format!("{} {} {}", self.fact, self.key, self.tags.join(" ")).to_lowercase()
    }

    pub fn fuzzy_target(&self) -> String {
        format!("{} {} {}", self.fact, self.key, self.tags.join(" ")).to_lowercase()
    }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str().map(|s| s.to_string()).or_else(|| Some(v.to_string())))
        .unwrap_or_default()
}

fn int_field(obj: &serde_json::Map<String, Value>, key: &str, fallback: i32) -> i32 {
    obj.get(key)
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .unwrap_or(fallback)
}

fn tags_field(obj: &serde_json::Map<String, Value>) -> Vec<String> {
    obj.get("tags")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Concatenate normalized fact, canonical key, tags, and their
/// synonym-expanded tokens; collapse whitespace; cap at 4000 chars.
pub fn build_lexical_blob(fact: &str, key: &str, tags: &[String]) -> String {
    let tags_joined = tags.join(" ");
    let base = format!("{fact} {key} {tags_joined}");
    let base_terms = tokenize_query(&base);
    let expanded = expand_query_terms(&base_terms);
    let blob = format!("{base} {}", expanded.join(" "));
    normalize_text(&blob, MAX_LEXICAL_BLOB)
}

/// `t:<term>` (weight 1.0) + `g:<trigram>` (weight 0.2, terms >= 4 chars),
/// capped at 220 entries by weight (stable tie-break by insertion order).
pub fn build_sparse_vector(text: &str) -> HashMap<String, f64> {
    let terms = expand_query_terms(&tokenize_query(text));
    let mut order = Vec::new();
    let mut weights: HashMap<String, f64> = HashMap::new();

    let mut bump = |k: String, w: f64, order: &mut Vec<String>, weights: &mut HashMap<String, f64>| {
        if !weights.contains_key(&k) {
            order.push(k.clone());
        }
        *weights.entry(k).or_insert(0.0) += w;
    };

    for term in &terms {
        let normalized = normalize_term(term);
        if normalized.is_empty() {
            continue;
        }
        bump(format!("t:{normalized}"), 1.0, &mut order, &mut weights);
        let chars: Vec<char> = normalized.chars().collect();
        if chars.len() >= 4 {
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                bump(format!("g:{trigram}"), 0.2, &mut order, &mut weights);
            }
        }
    }

    if weights.len() <= MAX_VECTOR_TERMS {
        return weights;
    }
    let mut ranked: Vec<(usize, String, f64)> = order
        .into_iter()
        .enumerate()
        .map(|(i, k)| {
            let w = weights[&k];
            (i, k, w)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap().then(a.0.cmp(&b.0)));
    ranked.truncate(MAX_VECTOR_TERMS);
    ranked.into_iter().map(|(_, k, w)| (k, w)).collect()
}

pub fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    for (k, va) in a {
        if let Some(vb) = b.get(k) {
            dot += va * vb;
        }
    }
    let norm_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn text_fuzzy_ratio(query_lower: &str, entry: &MemoryEntry) -> f64 {
    fuzzy_ratio(query_lower, &entry.fuzzy_target())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_updated_at_equals_created_at() {
        let entry = MemoryEntry::fresh(
            "phone".into(),
            "my iphone".into(),
            vec!["device".into()],
            3,
            "andrey".into(),
            "chat-1".into(),
        );
        assert_eq!(entry.updated_at, entry.created_at);
    }

    #[test]
    fn sparse_vector_caps_at_220_entries() {
        let long_text: String = (0..400).map(|i| format!("uniqueterm{i} ")).collect();
        let vector = build_sparse_vector(&long_text);
        assert!(vector.len() <= MAX_VECTOR_TERMS);
    }

    #[test]
    fn cosine_similarity_is_one_for_identical_vectors() {
        let v = build_sparse_vector("мой iphone телефон");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_loose_rejects_empty_fact() {
        let raw = serde_json::json!({"fact": "   "});
        assert!(MemoryEntry::normalize_loose(&raw).is_none());
    }

    #[test]
    fn normalize_loose_fixes_updated_before_created() {
        let raw = serde_json::json!({
            "fact": "test fact",
            "created_at": "2024-01-02T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00",
        });
        let entry = MemoryEntry::normalize_loose(&raw).unwrap();
        assert_eq!(entry.updated_at, entry.created_at);
    }
}
