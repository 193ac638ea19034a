//! Alias registry command line tools.
//!
//! Read-only inspection of the protocol economics, alias scripts and an
//! on-disk name index.

mod cli;
mod commands;
mod error;

pub use self::cli::run;
pub use self::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
