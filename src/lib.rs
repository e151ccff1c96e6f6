//! A per-user persistent fact store with hybrid lexical/semantic/fuzzy
//! recall, plus a handful of out-of-scope adjacent plugin stubs kept for
//! the bundled CLI harness.

pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod plugins;

pub use error::{MemoryError, Result};
pub use memory::{
    forget, recall, remember, ForgetArgs, ForgetResult, MemoryEntry, PublicMemory, RecallArgs,
    RecallResult, RememberArgs, RememberResult,
};
