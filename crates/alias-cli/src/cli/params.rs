use alias_primitives::AliasParams;
use clap::Parser;
use std::path::PathBuf;

/// Bitcoin network type.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Network {
    /// Mainnet.
    #[default]
    Mainnet,
    /// Testnet.
    Testnet,
    /// Signet.
    Signet,
    /// Regtest.
    Regtest,
}

impl From<Network> for bitcoin::Network {
    fn from(network: Network) -> Self {
        match network {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct NetworkParams {
    /// Network whose alias parameters apply.
    #[clap(long, value_enum, default_value_t = Network::Mainnet)]
    pub network: Network,
}

impl NetworkParams {
    pub fn alias_params(&self) -> AliasParams {
        AliasParams::new(self.network.into())
    }
}

#[derive(Debug, Clone, Parser)]
pub struct IndexParams {
    /// Directory of the name index database.
    #[clap(long, short = 'd', value_name = "PATH")]
    pub base_path: PathBuf,

    #[allow(missing_docs)]
    #[clap(flatten)]
    pub network_params: NetworkParams,
}
