use crate::cli::params::NetworkParams;
use crate::commands::print_json;
use alias_index::NameIndex;
use alias_primitives::AliasParams;
use alias_primitives::economics::{display_expiration_depth, expiration_depth, network_fee};
use serde::Serialize;
use std::path::PathBuf;

/// Show the protocol economics at a height.
#[derive(Debug, clap::Parser)]
pub struct Fee {
    /// Block height.
    #[clap(long)]
    height: u32,

    /// Name index to estimate the registration subsidy from.
    #[clap(long, value_name = "PATH")]
    base_path: Option<PathBuf>,

    #[allow(missing_docs)]
    #[clap(flatten)]
    network_params: NetworkParams,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct FeeReport {
    height: u32,
    /// Minimum burn of an `aliasfirstupdate`, in satoshis.
    network_fee: u64,
    expiration_depth: u32,
    display_expiration_depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_subsidy: Option<u64>,
}

fn fee_report(params: &AliasParams, height: u32) -> FeeReport {
    FeeReport {
        height,
        network_fee: network_fee(params, height).to_sat(),
        expiration_depth: expiration_depth(height),
        display_expiration_depth: display_expiration_depth(height),
        estimated_subsidy: None,
    }
}

impl Fee {
    pub fn run(self) -> crate::Result<()> {
        let params = self.network_params.alias_params();
        let mut report = fee_report(&params, self.height);

        if let Some(base_path) = &self.base_path {
            let index = NameIndex::open(base_path)?;
            let window = index.read_fee_window()?;
            tracing::debug!("Loaded {} fee samples", window.len());
            report.estimated_subsidy = Some(window.estimated_subsidy(self.height).to_sat());
        }

        print_json(&report)
    }
}
