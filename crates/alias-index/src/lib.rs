//! Durable per-name history index.
//!
//! ## Layout
//!
//! - **Names**: name bytes -> [`NameHistory`](alias_primitives::NameHistory), the
//!   confirmation-ordered records of every `FirstUpdate`/`Update` of the name.
//! - **Meta**: the registration fee sample window.
//!
//! Every write is synced to disk before returning. The whole index can be rebuilt
//! from the best chain with [`NameIndex::reconstruct`].

mod error;
mod reconstruct;
mod storage;

pub use error::Error;
pub use reconstruct::ReconstructStats;
pub use storage::{NameIndex, NameIterator};

/// Result type for name index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Column family names for RocksDB.
mod cf {
    /// Column family for name histories.
    /// Key: name bytes
    /// Value: NameHistory (bincode)
    pub const NAMES: &str = "names";

    /// Column family for metadata.
    /// Keys: "fee_window"
    pub const META: &str = "meta";
}

/// Metadata keys.
mod meta_keys {
    pub const FEE_WINDOW: &[u8] = b"fee_window";
}
