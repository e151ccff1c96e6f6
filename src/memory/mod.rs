//! The user-memory store: normalization, identity matching, synonyms,
//! storage, and the `remember`/`recall`/`forget` pipeline built on top.

mod entry;
mod identity;
mod normalize;
mod query;
mod storage;
mod synonyms;

pub use entry::{MemoryEntry, PublicMemory};
pub use query::{
    forget, recall, remember, ForgetArgs, ForgetResult, RecallArgs, RecallResult, RecallResultItem,
    RememberArgs, RememberResult,
};
