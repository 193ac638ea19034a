//! Error types for the name index.

/// Errors that can occur during name index operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// RocksDB error.
    #[error("RocksDB error: {0}")]
    Rocksdb(#[from] rocksdb::Error),

    /// Bincode serialization/deserialization error.
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Name has no confirmed history.
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// Block missing from the best chain during reconstruction.
    #[error("Block #{0} not found")]
    MissingBlock(u32),

    /// Storage not initialized.
    #[error("Storage not initialized")]
    NotInitialized,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
