//! SQLite primary store with an optional FTS5 index, backed by a bounded
//! JSON mirror for portability. Prefers SQLite when available, falling back
//! to the JSON mirror whenever SQLite is absent, fails, or has been latched
//! unavailable for this process.

use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::{params, Connection};
use serde_json::Value;

use crate::host::Host;

use super::entry::{MemoryEntry, JSON_MIRROR_MAX, MAX_ENTRIES};

pub const JSON_MIRROR_KEY: &str = "plugin.user-memory.entries.v1";
pub const MIGRATION_FLAG_KEY: &str = "plugin.user-memory.sqlite_migrated.v2";

const TABLE: &str = "plugin_user_memory_entries";
pub(crate) const FTS_TABLE: &str = "plugin_user_memory_entries_fts";

/// `SQLITE_UNAVAILABLE` is the one latch that's sound as a single
/// process-global flag: a real driver/IO failure means this process's
/// SQLite is broken for every connection, not just the one that failed.
///
/// `FTS_ENABLED` is also global, but recomputed on every [`ensure_schema`]
/// call rather than cached behind a "ready" flag — a process can legitimately
/// hold more than one [`crate::host::FileHost`] (different data dirs,
/// different `fts5_allowed` config), and caching schema-readiness behind a
/// single flag would silently skip `CREATE TABLE` for every database after
/// the first one ensured.
static FTS_ENABLED: AtomicBool = AtomicBool::new(false);
static SQLITE_UNAVAILABLE: AtomicBool = AtomicBool::new(false);

/// Reset process-global latches. Test-only: production code never needs to
/// un-latch `SQLITE_UNAVAILABLE` mid-process.
#[cfg(test)]
pub fn reset_process_state() {
    FTS_ENABLED.store(false, Ordering::SeqCst);
    SQLITE_UNAVAILABLE.store(false, Ordering::SeqCst);
}

pub fn fts_enabled() -> bool {
    FTS_ENABLED.load(Ordering::SeqCst)
}

pub fn is_sqlite_unavailable() -> bool {
    SQLITE_UNAVAILABLE.load(Ordering::SeqCst)
}

/// Idempotent: safe, and expected, to call on every `load`/`save`.
fn ensure_schema(conn: &Connection, fts5_allowed: bool) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            id          TEXT PRIMARY KEY,
            key         TEXT NOT NULL DEFAULT '',
            fact        TEXT NOT NULL,
            tags_json   TEXT NOT NULL DEFAULT '[]',
            importance  INTEGER NOT NULL DEFAULT 3,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            user_name   TEXT NOT NULL DEFAULT '',
            chat_id     TEXT NOT NULL DEFAULT '',
            lexical_blob TEXT NOT NULL DEFAULT '',
            semantic_json TEXT NOT NULL DEFAULT '{{}}'
        );
        CREATE INDEX IF NOT EXISTS idx_{TABLE}_user_updated ON {TABLE}(user_name, updated_at);
        CREATE INDEX IF NOT EXISTS idx_{TABLE}_key ON {TABLE}(key);
        CREATE INDEX IF NOT EXISTS idx_{TABLE}_chat ON {TABLE}(chat_id);
        "
    ))?;

    if fts5_allowed {
        match conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {FTS_TABLE} USING fts5(
                id UNINDEXED, fact, key, tags, lexical_blob
            );"
        )) {
            Ok(()) => FTS_ENABLED.store(true, Ordering::SeqCst),
            Err(err) => {
                tracing::debug!(error = %err, "fts5 unavailable, ranking falls back to substring/cosine/fuzzy only");
                FTS_ENABLED.store(false, Ordering::SeqCst);
            }
        }
    } else {
        tracing::debug!("fts5 disabled by config, ranking falls back to substring/cosine/fuzzy only");
        FTS_ENABLED.store(false, Ordering::SeqCst);
    }

    Ok(())
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Value> {
    let tags_json: String = row.get("tags_json")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    Ok(serde_json::json!({
        "id": row.get::<_, String>("id")?,
        "key": row.get::<_, String>("key")?,
        "fact": row.get::<_, String>("fact")?,
        "tags": tags,
        "importance": row.get::<_, i64>("importance")?,
        "created_at": row.get::<_, String>("created_at")?,
        "updated_at": row.get::<_, String>("updated_at")?,
        "user_name": row.get::<_, String>("user_name")?,
        "chat_id": row.get::<_, String>("chat_id")?,
    }))
}

fn migrate_from_mirror_if_needed(host: &dyn Host, conn: &Connection) -> rusqlite::Result<()> {
    if host.storage().get_setting_flag(MIGRATION_FLAG_KEY, false) {
        return Ok(());
    }
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |r| r.get(0))?;
    if count == 0 {
        let mirrored = load_json_mirror(host);
        if !mirrored.is_empty() {
            write_rows(conn, &mirrored)?;
        }
    }
    host.storage().set_setting_flag(MIGRATION_FLAG_KEY, true);
    Ok(())
}

fn write_rows(conn: &Connection, entries: &[MemoryEntry]) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(&format!("DELETE FROM {TABLE}"), [])?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {TABLE}
             (id, key, fact, tags_json, importance, created_at, updated_at, user_name, chat_id, lexical_blob, semantic_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ))?;
        for entry in entries {
            stmt.execute(params![
                entry.id,
                entry.key,
                entry.fact,
                serde_json::to_string(&entry.tags).unwrap_or_else(|_| "[]".into()),
                entry.importance,
                entry.created_at,
                entry.updated_at,
                entry.user_name,
                entry.chat_id,
                entry.lexical_blob,
                serde_json::to_string(&entry.semantic_vector).unwrap_or_else(|_| "{}".into()),
            ])?;
        }
    }

    if fts_enabled() {
        tx.execute(&format!("DELETE FROM {FTS_TABLE}"), [])?;
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {FTS_TABLE} (id, fact, key, tags, lexical_blob) VALUES (?1, ?2, ?3, ?4, ?5)"
        ))?;
        for entry in entries {
            stmt.execute(params![
                entry.id,
                entry.fact,
                entry.key,
                entry.tags.join(" "),
                entry.lexical_blob,
            ])?;
        }
    }

    tx.commit()
}

fn load_json_mirror(host: &dyn Host) -> Vec<MemoryEntry> {
    let raw = host
        .storage()
        .get_setting_json(JSON_MIRROR_KEY, Value::Array(Vec::new()));
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    normalize_and_dedupe(items.iter())
}

fn normalize_and_dedupe<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<MemoryEntry> {
    let mut seen_ids = std::collections::HashSet::new();
    let mut entries = Vec::new();
    for item in items {
        if let Some(mut entry) = MemoryEntry::normalize_loose(item) {
            if !seen_ids.insert(entry.id.clone()) {
                entry.id = super::entry::new_id();
                seen_ids.insert(entry.id.clone());
            }
            entries.push(entry);
        }
    }
    entries
}

fn sort_key(entry: &MemoryEntry) -> (i64, i32) {
    (super::entry::parse_iso(&entry.updated_at).timestamp(), entry.importance)
}

fn write_json_mirror(host: &dyn Host, entries: &[MemoryEntry]) {
    let mut ordered: Vec<&MemoryEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| std::cmp::Reverse(sort_key(e)));
    let mirrored: Vec<Value> = ordered
        .into_iter()
        .take(JSON_MIRROR_MAX)
        .map(|e| {
            serde_json::json!({
                "id": e.id, "key": e.key, "fact": e.fact, "tags": e.tags,
                "importance": e.importance, "created_at": e.created_at,
                "updated_at": e.updated_at, "user_name": e.user_name, "chat_id": e.chat_id,
            })
        })
        .collect();
    host.storage()
        .set_setting_json(JSON_MIRROR_KEY, Value::Array(mirrored));
}

/// Load all entries, preferring SQLite and falling back to the JSON mirror
/// whenever SQLite is absent, fails, or has previously been latched
/// unavailable.
pub fn load(host: &dyn Host) -> Vec<MemoryEntry> {
    if SQLITE_UNAVAILABLE.load(Ordering::SeqCst) {
        return load_json_mirror(host);
    }
    let Some(mutex) = host.storage().sqlite() else {
        return load_json_mirror(host);
    };
    let conn = match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => return load_json_mirror(host),
    };

    let result = (|| -> rusqlite::Result<Vec<Value>> {
        ensure_schema(&conn, host.storage().fts5_allowed())?;
        migrate_from_mirror_if_needed(host, &conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {TABLE} ORDER BY updated_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![MAX_ENTRIES as i64], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })();

    match result {
        Ok(rows) => normalize_and_dedupe(rows.iter()),
        Err(err) => {
            tracing::warn!(error = %err, "sqlite read failed, latching to json-mirror-only for this process");
            SQLITE_UNAVAILABLE.store(true, Ordering::SeqCst);
            load_json_mirror(host)
        }
    }
}

/// Persist `entries`: normalize, sort (updated_at desc, importance desc),
/// cap at `MAX_ENTRIES` (oldest-updated trimmed first), write to SQLite in
/// one transaction (falling back to JSON-only on failure), then mirror the
/// first `JSON_MIRROR_MAX` to the JSON settings key.
pub fn save(host: &dyn Host, entries: Vec<MemoryEntry>) -> Vec<MemoryEntry> {
    let mut cleaned: Vec<MemoryEntry> = entries;
    for entry in &mut cleaned {
        entry.derive();
    }
    cleaned.sort_by_key(|e| std::cmp::Reverse(sort_key(e)));
    cleaned.truncate(MAX_ENTRIES);

    let mut seen_ids = std::collections::HashSet::new();
    for entry in &mut cleaned {
        if !seen_ids.insert(entry.id.clone()) {
            entry.id = super::entry::new_id();
            seen_ids.insert(entry.id.clone());
        }
    }

    if !SQLITE_UNAVAILABLE.load(Ordering::SeqCst) {
        if let Some(mutex) = host.storage().sqlite() {
            if let Ok(conn) = mutex.lock() {
                let wrote = (|| -> rusqlite::Result<()> {
                    ensure_schema(&conn, host.storage().fts5_allowed())?;
                    write_rows(&conn, &cleaned)
                })();
                match wrote {
                    Ok(()) => {
                        write_json_mirror(host, &cleaned);
                        return cleaned;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "sqlite write failed, latching to json-mirror-only for this process");
                        SQLITE_UNAVAILABLE.store(true, Ordering::SeqCst);
                    }
                }
            }
        }
    }

    write_json_mirror(host, &cleaned);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FileHost, Host};

    fn temp_host() -> (tempfile::TempDir, FileHost) {
        reset_process_state();
        let dir = tempfile::tempdir().unwrap();
        let host = FileHost::open(dir.path()).unwrap();
        (dir, host)
    }

    #[test]
    fn save_then_load_round_trips_public_fields() {
        let (_dir, host) = temp_host();
        let entry = MemoryEntry::fresh(
            "phone".into(),
            "my iphone 15".into(),
            vec!["device".into(), "phone".into()],
            4,
            "andrey".into(),
            "chat-1".into(),
        );
        let saved = save(&host, vec![entry.clone()]);
        assert_eq!(saved.len(), 1);

        let loaded = load(&host);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].fact, entry.fact);
        assert_eq!(loaded[0].key, entry.key);
        assert_eq!(loaded[0].tags, entry.tags);
    }

    #[test]
    fn json_mirror_is_capped() {
        let (_dir, host) = temp_host();
        let entries: Vec<MemoryEntry> = (0..(JSON_MIRROR_MAX + 50))
            .map(|i| {
                MemoryEntry::fresh(
                    String::new(),
                    format!("fact number {i}"),
                    vec![],
                    3,
                    "andrey".into(),
                    "chat-1".into(),
                )
            })
            .collect();
        save(&host, entries);
        let mirror = host
            .storage()
            .get_setting_json(JSON_MIRROR_KEY, Value::Array(Vec::new()));
        assert_eq!(mirror.as_array().unwrap().len(), JSON_MIRROR_MAX);
    }

    #[test]
    fn entries_beyond_max_are_trimmed_oldest_first() {
        let (_dir, host) = temp_host();
        let entries: Vec<MemoryEntry> = (0..(MAX_ENTRIES + 10))
            .map(|i| {
                MemoryEntry::fresh(
                    String::new(),
                    format!("fact number {i}"),
                    vec![],
                    3,
                    "andrey".into(),
                    "chat-1".into(),
                )
            })
            .collect();
        let saved = save(&host, entries);
        assert_eq!(saved.len(), MAX_ENTRIES);
    }
}
