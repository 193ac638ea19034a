use bitcoin::{Amount, Txid};

/// Broad classes of alias validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transaction does not carry a well-formed alias operation.
    Malformed,
    /// The operation breaks a protocol rule. Permanent.
    Consensus,
    /// The referenced `New` is not buried deep enough yet. Retry later.
    NotYetDeep,
    /// The name index failed.
    Storage,
}

/// Errors that can occur when validating alias transactions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Non-alias transaction spends an alias output")]
    AliasInputWithoutAliasVersion,

    #[error("Alias transaction carries no alias operation")]
    NotAliasOperation,

    #[error("Name of {0} bytes too long")]
    NameTooLong(usize),

    #[error("Value of {0} bytes too long")]
    ValueTooLong(usize),

    #[error("Reveal random of {0} bytes too long")]
    RandTooLong(usize),

    #[error("Commitment must be 20 bytes, got {0}")]
    InvalidCommitmentLength(usize),

    #[error("aliasnew spends a previous alias output")]
    NewSpendsAlias,

    #[error("Network fee {paid} too low (min: {required})")]
    FeeTooLow { paid: Amount, required: Amount },

    #[error("aliasfirstupdate without previous aliasnew")]
    MissingNewInput,

    #[error("aliasfirstupdate does not match the committed hash")]
    CommitmentMismatch,

    /// Soft failure, the same transaction may be accepted later.
    #[error("aliasnew at depth {depth} is not buried {required} blocks yet")]
    NotYetDeep { depth: u32, required: u32 },

    #[error("aliasnew expired before its aliasfirstupdate")]
    CommitmentExpired,

    #[error("aliasfirstupdate on the unexpired name {0}")]
    NameAlreadyRegistered(String),

    #[error("aliasupdate without previous aliasfirstupdate or aliasupdate")]
    MissingNameInput,

    #[error("aliasupdate name {actual} does not match previous name {expected}")]
    NameMismatch { expected: String, actual: String },

    #[error("aliasupdate on an expired name")]
    NameExpired,

    #[error("Spent alias output at height {spent} is not the latest confirmation ({indexed:?})")]
    StaleNameInput { indexed: Option<u32>, spent: u32 },

    #[error("Transaction #{index} ({txid}) rejected: {source}")]
    BlockTransaction {
        index: usize,
        txid: Txid,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Storage(#[from] alias_index::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAliasOperation => ErrorKind::Malformed,
            Self::NotYetDeep { .. } => ErrorKind::NotYetDeep,
            Self::Storage(_) => ErrorKind::Storage,
            Self::BlockTransaction { source, .. } => source.kind(),
            _ => ErrorKind::Consensus,
        }
    }

    /// Whether the rejection is temporary.
    pub fn is_soft(&self) -> bool {
        self.kind() == ErrorKind::NotYetDeep
    }
}

pub(crate) fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
