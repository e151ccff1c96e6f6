use thiserror::Error;

/// Errors that can escape the public `remember`/`recall`/`forget` surface.
///
/// Only [`MemoryError::InvalidArgument`] is ever returned to a caller; the
/// storage-layer variants are logged and handled internally (see
/// `memory::storage`), never propagated.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("sqlite storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("malformed stored row: {0}")]
    StorageParse(String),

    /// Returned by the out-of-scope plugin stubs (`crate::plugins`) when the
    /// host declines a capability (e.g. network access) or a fetch fails.
    #[error("{0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
