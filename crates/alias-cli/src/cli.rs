pub mod params;

use crate::commands::fee::Fee;
use crate::commands::name::NameCmd;
use crate::commands::tools::Tools;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Show the registration fee and expiration depths at a height.
    Fee(Fee),

    /// Inspect names in an on-disk name index.
    #[command(subcommand)]
    Name(NameCmd),

    /// Utility tools.
    #[command(subcommand)]
    Tools(Tools),
}

#[derive(Debug, Parser)]
#[command(name = "alias", version, about = "Alias name registry tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter directives, `RUST_LOG` takes precedence when set.
    #[arg(long, short = 'l', global = true, default_value = "info")]
    pub log: String,
}

fn init_logger(directives: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    // Logs go to stderr to keep stdout parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse and run command line arguments
pub fn run() -> crate::Result<()> {
    let Cli { command, log } = Cli::parse();

    init_logger(&log);

    match command {
        Command::Fee(fee) => fee.run(),
        Command::Name(cmd) => cmd.run(),
        Command::Tools(tools) => tools.run(),
    }
}
