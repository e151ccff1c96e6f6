//! Narrow interface the memory store needs from its embedding chat runtime.
//!
//! The core (`crate::memory`) never touches a filesystem or a specific
//! SQLite connection directly — it only talks to whatever implements these
//! three traits. [`FileHost`] is the one reference implementation, backing
//! the bundled CLI harness; a real chat runtime would supply its own.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

/// Per-call identity the runtime hands the store.
pub trait Runtime {
    fn user_name(&self) -> &str;
    fn chat_id(&self) -> &str;
}

/// Key/value settings plus an optional SQLite handle.
///
/// `get_setting_json`/`set_setting_json` back the JSON mirror and the
/// migration flag; `get_setting_flag`/`set_setting_flag` let a host persist
/// its own flags (e.g. whether migration has run) across process restarts.
pub trait StorageHost {
    fn get_setting_json(&self, key: &str, default: Value) -> Value;
    fn set_setting_json(&self, key: &str, value: Value);
    fn get_setting_flag(&self, key: &str, default: bool) -> bool;
    fn set_setting_flag(&self, key: &str, value: bool);

    /// Absent when the host has no SQLite backing at all — the store then
    /// runs JSON-mirror-only.
    fn sqlite(&self) -> Option<&Mutex<rusqlite::Connection>>;

    /// Whether the host wants the FTS5 virtual table attempted at all. A
    /// host can say no (matching `Config::fts5_enabled = false`) even when
    /// the linked SQLite build actually supports FTS5.
    fn fts5_allowed(&self) -> bool {
        true
    }
}

/// Host-wide capabilities unrelated to storage.
pub trait Host {
    fn storage(&self) -> &dyn StorageHost;
    fn create_request_id(&self) -> String;
}

/// A simple runtime carrying the two fields the store actually reads.
#[derive(Debug, Clone, Default)]
pub struct SimpleRuntime {
    pub user_name: String,
    pub chat_id: String,
}

impl Runtime for SimpleRuntime {
    fn user_name(&self) -> &str {
        &self.user_name
    }
    fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

/// Reference [`Host`] implementation used by the CLI harness: settings are a
/// JSON file on disk, storage is a SQLite database in the same directory.
pub struct FileHost {
    settings_path: PathBuf,
    conn: Option<Mutex<rusqlite::Connection>>,
    fts5_allowed: bool,
}

impl FileHost {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        Self::open_with_fts5(data_dir, true)
    }

    pub fn open_with_fts5(data_dir: &Path, fts5_allowed: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let settings_path = data_dir.join("settings.json");
        let db_path = data_dir.join("memory.sqlite3");

        let conn = match rusqlite::Connection::open(&db_path) {
            Ok(conn) => {
                let _ = conn.execute_batch(
                    "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
                );
                Some(Mutex::new(conn))
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to open sqlite database, falling back to json mirror");
                None
            }
        };

        Ok(Self { settings_path, conn, fts5_allowed })
    }

    fn read_settings(&self) -> Value {
        std::fs::read_to_string(&self.settings_path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    fn write_settings(&self, settings: &Value) {
        if let Ok(raw) = serde_json::to_string_pretty(settings) {
            if let Err(err) = std::fs::write(&self.settings_path, raw) {
                tracing::warn!(error = %err, "failed to persist settings file");
            }
        }
    }
}

impl StorageHost for FileHost {
    fn get_setting_json(&self, key: &str, default: Value) -> Value {
        let settings = self.read_settings();
        settings.get(key).cloned().unwrap_or(default)
    }

    fn set_setting_json(&self, key: &str, value: Value) {
        let mut settings = self.read_settings();
        if let Value::Object(map) = &mut settings {
            map.insert(key.to_string(), value);
        }
        self.write_settings(&settings);
    }

    fn get_setting_flag(&self, key: &str, default: bool) -> bool {
        self.get_setting_json(key, Value::Bool(default))
            .as_bool()
            .unwrap_or(default)
    }

    fn set_setting_flag(&self, key: &str, value: bool) {
        self.set_setting_json(key, Value::Bool(value));
    }

    fn sqlite(&self) -> Option<&Mutex<rusqlite::Connection>> {
        self.conn.as_ref()
    }

    fn fts5_allowed(&self) -> bool {
        self.fts5_allowed
    }
}

impl Host for FileHost {
    fn storage(&self) -> &dyn StorageHost {
        self
    }

    fn create_request_id(&self) -> String {
        format!("req-{}", uuid::Uuid::new_v4().simple())
    }
}
