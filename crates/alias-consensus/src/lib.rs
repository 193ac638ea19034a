//! Consensus rules of the alias name registry.
//!
//! [`AliasState`] owns the name index, the fee sample window and the pending
//! claims, and is the only way to mutate them. The ledger engine calls
//! [`AliasState::check_inputs`] for mempool admission and block assembly, and
//! [`AliasState::connect_block`] when a block joins the best chain. Callers hold
//! the chain state lock for the duration of every call.

mod error;
mod options;
mod pending;
mod state;
mod validation;

pub use error::{Error, ErrorKind};
pub use options::{AliasStateOptions, AliasStateOptionsBuilder};
pub use pending::PendingClaims;
pub use state::{AliasState, ConnectedBlock, NameInfo};
pub use validation::{AcceptedOperation, PriorOutput, ValidationContext, ValidationFlags};

/// Result type for alias validation.
pub type Result<T> = std::result::Result<T, Error>;
