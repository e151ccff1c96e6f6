//! The `remember`/`recall`/`forget` pipeline: scoping, filtering, hybrid
//! ranking, and generic-recall detection.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::host::{Host, Runtime};

use super::entry::{
    build_sparse_vector, clamp_importance, cosine_similarity, merge_tags, normalize_tags, parse_iso,
    text_fuzzy_ratio, MemoryEntry, PublicMemory, MAX_FACT_LEN, MAX_KEY_LEN,
};
use super::identity::identity_match;
use super::normalize::{normalize_text, normalize_token, tokenize_query};
use super::storage;
use super::synonyms::{canonicalize_key, default_tags_for_key, expand_query_terms, infer_slot, slot_for_term};

fn resolve_scope(value: Option<&str>) -> String {
    let scope = normalize_text(value.unwrap_or(""), 24).to_lowercase();
    if scope == "all" {
        "all".to_string()
    } else {
        "current_user".to_string()
    }
}

/// `scope=all` bypasses identity matching entirely. An unknown runtime user
/// (empty `user_name`) is not an error — it matches any non-scoped entry.
/// Global entries (empty `entry.user_name`) match any runtime user.
fn matches_scope(entry: &MemoryEntry, scope: &str, runtime_user_name: &str) -> bool {
    if scope == "all" {
        return true;
    }
    if runtime_user_name.is_empty() || entry.user_name.is_empty() {
        return true;
    }
    identity_match(&entry.user_name, runtime_user_name)
}

static GENERIC_RECALL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)что\s+(ты\s+)?(обо\s+мне|про\s+меня|о\s+мне)\s+(помнишь|знаешь)",
        r"(?i)(расскажи|напомни)\S*\s+(мне\s+)?(обо\s+мне|про\s+меня)",
        r"(?i)what\s+do\s+you\s+(remember|know)\s+about\s+me",
        r"(?i)tell\s+me\s+(everything\s+)?about\s+(myself|me)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static generic-recall pattern must compile"))
    .collect()
});

const MEMORY_INTENT_WORDS: &[&str] = &[
    "remember", "recall", "memory", "memories", "помнишь", "знаешь", "вспомни", "вспомнить",
    "память",
];

/// A generic-recall query ("what do you remember about me?") is cleared to
/// empty so the fallback is "most recently updated in scope" rather than a
/// keyword search that would otherwise find nothing.
fn is_generic_recall(query_lower: &str, tokens: &[String]) -> bool {
    if query_lower.is_empty() {
        return false;
    }
    if GENERIC_RECALL_PATTERNS.iter().any(|re| re.is_match(query_lower)) {
        return true;
    }
    !tokens.is_empty() && tokens.iter().all(|t| MEMORY_INTENT_WORDS.contains(&t.as_str()))
}

#[derive(Debug, Default, Deserialize)]
pub struct RememberArgs {
    pub fact: Option<String>,
    pub key: Option<String>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<i32>,
    pub overwrite_key: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RememberResult {
    pub status: &'static str,
    pub memory: PublicMemory,
    pub total_memories: usize,
    pub request_id: String,
}

pub fn remember(args: RememberArgs, runtime: &dyn Runtime, host: &dyn Host) -> Result<RememberResult> {
    let fact = normalize_text(args.fact.as_deref().unwrap_or(""), MAX_FACT_LEN);
    if fact.is_empty() {
        return Err(MemoryError::InvalidArgument("fact is required".into()));
    }

    let mut key = canonicalize_key(&normalize_token(args.key.as_deref().unwrap_or(""), MAX_KEY_LEN));
    let mut tags = normalize_tags(&args.tags.unwrap_or_default());
    let importance = clamp_importance(args.importance.unwrap_or(3));
    let overwrite_key = args.overwrite_key.unwrap_or(true);

    if key.is_empty() {
        if let Some((slot, slot_tags)) = infer_slot(&fact) {
            key = slot.to_string();
            let slot_tags: Vec<String> = slot_tags.iter().map(|s| s.to_string()).collect();
            tags = merge_tags(&tags, &slot_tags);
        }
    }
    if !key.is_empty() {
        let default_tags: Vec<String> = default_tags_for_key(&key).iter().map(|s| s.to_string()).collect();
        tags = merge_tags(&tags, &default_tags);
    }

    let runtime_user_name = normalize_text(runtime.user_name(), 96);
    let runtime_chat_id = normalize_text(runtime.chat_id(), 96);

    let mut entries = storage::load(host);
    let fact_lc = fact.to_lowercase();

    let mut target_index = None;
    for (i, entry) in entries.iter().enumerate() {
        if !matches_scope(entry, "current_user", &runtime_user_name) {
            continue;
        }
        if entry.fact.trim().to_lowercase() == fact_lc {
            target_index = Some(i);
            break;
        }
    }
    if target_index.is_none() && !key.is_empty() && overwrite_key {
        for (i, entry) in entries.iter().enumerate() {
            if !matches_scope(entry, "current_user", &runtime_user_name) {
                continue;
            }
            if entry.key == key {
                target_index = Some(i);
                break;
            }
        }
    }

    let status;
    let saved_entry;
    if let Some(i) = target_index {
        let existing = &mut entries[i];
        existing.tags = merge_tags(&existing.tags, &tags);
        existing.fact = fact.clone();
        if !key.is_empty() {
            existing.key = key.clone();
        }
        existing.importance = importance;
        existing.updated_at = super::entry::now_iso();
        if existing.chat_id.is_empty() {
            existing.chat_id = runtime_chat_id.clone();
        }
        if existing.user_name.is_empty() {
            existing.user_name = runtime_user_name.clone();
        }
        if existing.created_at.is_empty() {
            existing.created_at = existing.updated_at.clone();
        }
        status = "updated";
        saved_entry = existing.clone();
    } else {
        let fresh = MemoryEntry::fresh(key, fact, tags, importance, runtime_user_name, runtime_chat_id);
        saved_entry = fresh.clone();
        entries.push(fresh);
        status = "saved";
    }

    let saved = storage::save(host, entries);
    Ok(RememberResult {
        status,
        memory: saved_entry.to_public(false),
        total_memories: saved.len(),
        request_id: host.create_request_id(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RecallArgs {
    pub query: Option<String>,
    pub key: Option<String>,
    pub tags: Option<Vec<String>>,
    pub scope: Option<String>,
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RecallResultItem {
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub struct RecallResult {
    pub query: String,
    pub key: String,
    pub tags: Vec<String>,
    pub scope: String,
    pub count: usize,
    pub memories: Vec<PublicMemory>,
    pub results: Vec<RecallResultItem>,
    pub request_id: String,
}

fn fts_rank_positions(host: &dyn Host, terms: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    if storage::is_sqlite_unavailable() || !storage::fts_enabled() {
        return map;
    }
    let Some(mutex) = host.storage().sqlite() else {
        return map;
    };
    let Ok(conn) = mutex.lock() else {
        return map;
    };
    if terms.is_empty() {
        return map;
    }
    let match_query = terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT id FROM {table} WHERE {table} MATCH ?1 ORDER BY bm25({table}) LIMIT 120",
        table = storage::FTS_TABLE
    );
    if let Ok(mut stmt) = conn.prepare(&sql) {
        if let Ok(rows) = stmt.query_map([&match_query], |row| row.get::<_, String>(0)) {
            for (i, id) in rows.flatten().enumerate() {
                map.entry(id).or_insert(i);
            }
        }
    }
    map
}

pub fn recall(args: RecallArgs, runtime: &dyn Runtime, host: &dyn Host) -> RecallResult {
    let query_raw = normalize_text(args.query.as_deref().unwrap_or(""), 200);
    let key = canonicalize_key(&normalize_token(args.key.as_deref().unwrap_or(""), MAX_KEY_LEN));
    let tags = normalize_tags(&args.tags.unwrap_or_default());
    let scope = resolve_scope(args.scope.as_deref());
    let limit = args.limit.unwrap_or(5).clamp(1, 20) as usize;

    let base_tokens = tokenize_query(&query_raw);
    let query_lower = query_raw.to_lowercase();
    let generic = is_generic_recall(&query_lower, &base_tokens);
    let effective_query = if generic { String::new() } else { query_raw.clone() };
    let query_terms: Vec<String> = if generic {
        Vec::new()
    } else {
        expand_query_terms(&base_tokens)
    };

    let mut inferred_key = key.clone();
    if inferred_key.is_empty() && !generic {
        for term in &base_tokens {
            if let Some(slot) = slot_for_term(term) {
                inferred_key = slot.to_string();
                break;
            }
        }
    }

    let runtime_user_name = normalize_text(runtime.user_name(), 96);
    let include_user = scope == "all";
    let entries = storage::load(host);
    let has_criteria = !query_terms.is_empty() || !key.is_empty() || !tags.is_empty();

    let fts_ranks = fts_rank_positions(host, &query_terms);
    let query_vector = build_sparse_vector(&effective_query);
    let effective_query_lower = effective_query.to_lowercase();
    let now = chrono::Utc::now();

    let mut ranked: Vec<(f64, i64, MemoryEntry)> = Vec::new();
    for entry in entries {
        if !matches_scope(&entry, &scope, &runtime_user_name) {
            continue;
        }
        if !key.is_empty() && entry.key != key {
            continue;
        }
        if !tags.is_empty() && !tags.iter().all(|t| entry.tags.contains(t)) {
            continue;
        }

        let mut score = entry.importance as f64 * 2.2;
        if !inferred_key.is_empty() && entry.key == inferred_key {
            score += 85.0;
        }
        if !tags.is_empty() {
            score += 12.0;
        }

        let fts_bonus = fts_ranks
            .get(&entry.id)
            .map(|&rank_index| (24.0 - 0.45 * rank_index as f64).max(0.0))
            .unwrap_or(0.0);
        score += fts_bonus;

        let age_days = (now - parse_iso(&entry.updated_at)).num_seconds() as f64 / 86_400.0;
        let recency = (8.0 - (age_days * 0.08).min(8.0)).max(0.0);
        score += recency;

        let mut hits = 0u32;
        if !query_terms.is_empty() {
            let key_lower = entry.key.to_lowercase();
            let fact_lower = entry.fact.to_lowercase();
            let tags_lower: Vec<String> = entry.tags.iter().map(|t| t.to_lowercase()).collect();
            let blob_lower = entry.lexical_blob.to_lowercase();
            for term in &query_terms {
                if key_lower.contains(term.as_str()) {
                    score += 18.0;
                    hits += 1;
                }
                if fact_lower.contains(term.as_str()) {
                    score += 12.0;
                    hits += 1;
                }
                if tags_lower.iter().any(|t| t.contains(term.as_str())) {
                    score += 10.0;
                    hits += 1;
                }
                if blob_lower.contains(term.as_str()) {
                    score += 6.0;
                    hits += 1;
                }
            }
        }

        let cosine = cosine_similarity(&query_vector, &entry.semantic_vector);
        score += cosine * 28.0;

        let fuzzy = if effective_query_lower.is_empty() {
            0.0
        } else {
            text_fuzzy_ratio(&effective_query_lower, &entry)
        };
        score += fuzzy * 12.0;

        if !query_terms.is_empty() && hits == 0 && cosine < 0.08 && fuzzy < 0.26 && fts_bonus <= 0.0 {
            continue;
        }

        let updated_ts = parse_iso(&entry.updated_at).timestamp();
        ranked.push((score, updated_ts, entry));
    }

    if has_criteria {
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then(b.1.cmp(&a.1)));
    } else {
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.partial_cmp(&a.0).unwrap()));
    }

    let selected: Vec<MemoryEntry> = ranked.into_iter().take(limit).map(|(_, _, e)| e).collect();
    let memories: Vec<PublicMemory> = selected.iter().map(|e| e.to_public(include_user)).collect();
    let results = memories
        .iter()
        .map(|m| RecallResultItem {
            title: m.fact.clone(),
            snippet: snippet_for(m, include_user),
        })
        .collect();

    RecallResult {
        query: query_raw,
        key,
        tags,
        scope,
        count: memories.len(),
        memories,
        results,
        request_id: host.create_request_id(),
    }
}

fn snippet_for(memory: &PublicMemory, include_user: bool) -> String {
    let mut parts = Vec::new();
    if !memory.key.is_empty() {
        parts.push(format!("key={}", memory.key));
    }
    if !memory.tags.is_empty() {
        parts.push(format!("tags={}", memory.tags.join(",")));
    }
    parts.push(format!("importance={}", memory.importance));
    if include_user {
        if let Some(user) = &memory.user_name {
            if !user.is_empty() {
                parts.push(format!("user={user}"));
            }
        }
    }
    if !memory.updated_at.is_empty() {
        parts.push(format!("updated_at={}", memory.updated_at));
    }
    parts.join(", ")
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgetArgs {
    pub id: Option<String>,
    pub key: Option<String>,
    pub query: Option<String>,
    pub scope: Option<String>,
    pub all_matching: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ForgetResult {
    pub removed_count: usize,
    pub removed: Vec<PublicMemory>,
    pub remaining_count: usize,
    pub scope: String,
    pub request_id: String,
}

pub fn forget(args: ForgetArgs, runtime: &dyn Runtime, host: &dyn Host) -> Result<ForgetResult> {
    let target_id = normalize_text(args.id.as_deref().unwrap_or(""), 120);
    let key = canonicalize_key(&normalize_token(args.key.as_deref().unwrap_or(""), MAX_KEY_LEN));
    let query = normalize_text(args.query.as_deref().unwrap_or(""), 200);
    let scope = resolve_scope(args.scope.as_deref());
    let all_matching = args.all_matching.unwrap_or(false);

    let query_terms = tokenize_query(&query);
    if target_id.is_empty() && key.is_empty() && query_terms.is_empty() {
        return Err(MemoryError::InvalidArgument(
            "at least one of id, key, or query is required".into(),
        ));
    }
    let expanded_terms = expand_query_terms(&query_terms);

    let runtime_user_name = normalize_text(runtime.user_name(), 96);
    let include_user = scope == "all";
    let entries = storage::load(host);

    let mut kept = Vec::new();
    let mut removed = Vec::new();

    for entry in entries {
        if !matches_scope(&entry, &scope, &runtime_user_name) {
            kept.push(entry);
            continue;
        }

        let plain_blob = entry.search_blob();
        let expanded_blob = entry.lexical_blob.to_lowercase();
        let mut matches = false;
        if !target_id.is_empty() && entry.id == target_id {
            matches = true;
        }
        if !key.is_empty() && entry.key == key {
            matches = true;
        }
        if !query_terms.is_empty() && query_terms.iter().all(|t| plain_blob.contains(t.as_str())) {
            matches = true;
        }
        if !matches
            && !expanded_terms.is_empty()
            && expanded_terms.iter().all(|t| expanded_blob.contains(t.as_str()))
        {
            matches = true;
        }

        if matches && (all_matching || removed.is_empty()) {
            removed.push(entry);
        } else {
            kept.push(entry);
        }
    }

    let remaining_count = if removed.is_empty() {
        kept.len()
    } else {
        storage::save(host, kept).len()
    };

    Ok(ForgetResult {
        removed_count: removed.len(),
        removed: removed.iter().take(20).map(|e| e.to_public(include_user)).collect(),
        remaining_count,
        scope,
        request_id: host.create_request_id(),
    })
}
