/// Alias script error type.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The script does not start with a well-formed alias operation prefix.
    #[error("script does not carry an alias operation")]
    NotAliasScript,
    /// An operation argument does not fit in a single data push.
    #[error("argument of {0} bytes exceeds the maximum push size")]
    PushTooLarge(usize),
}
