/// Errors of the `alias` command line tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Name {0} not found")]
    NameNotFound(String),

    #[error(transparent)]
    Alias(#[from] alias_consensus::Error),

    #[error(transparent)]
    Index(#[from] alias_index::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
