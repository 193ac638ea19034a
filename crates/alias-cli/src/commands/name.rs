use crate::cli::params::IndexParams;
use crate::commands::print_json;
use crate::Error;
use alias_consensus::{AliasState, AliasStateOptions, NameInfo};
use alias_primitives::NameIndexRecord;
use serde::Serialize;

/// Name index inspection.
#[derive(Debug, clap::Subcommand)]
pub enum NameCmd {
    /// Show the current registration of a name.
    Show {
        #[arg(index = 1)]
        name: String,

        /// Height of the best block, expiry is evaluated against it.
        #[arg(long)]
        best_height: u32,

        #[allow(missing_docs)]
        #[clap(flatten)]
        index_params: IndexParams,
    },

    /// Print every confirmed state of a name, oldest first.
    History {
        #[arg(index = 1)]
        name: String,

        #[allow(missing_docs)]
        #[clap(flatten)]
        index_params: IndexParams,
    },

    /// List all indexed names with the height of their latest confirmation.
    List {
        #[allow(missing_docs)]
        #[clap(flatten)]
        index_params: IndexParams,
    },
}

#[derive(Debug, Serialize)]
struct NameView {
    name: String,
    value: String,
    value_hex: String,
    outpoint: String,
    height: u32,
    expires_at: u32,
    expires_in: i64,
    expired: bool,
}

impl From<NameInfo> for NameView {
    fn from(info: NameInfo) -> Self {
        Self {
            name: String::from_utf8_lossy(&info.name).into_owned(),
            value: String::from_utf8_lossy(&info.value).into_owned(),
            value_hex: hex::encode(&info.value),
            outpoint: info.outpoint.to_string(),
            height: info.height,
            expires_at: info.expires_at,
            expires_in: info.expires_in,
            expired: info.expired,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecordView {
    height: u32,
    value: String,
    txid: String,
    output_index: u32,
    prev_out: String,
}

impl From<&NameIndexRecord> for RecordView {
    fn from(record: &NameIndexRecord) -> Self {
        Self {
            height: record.height,
            value: String::from_utf8_lossy(&record.value).into_owned(),
            txid: record.txid.to_string(),
            output_index: record.output_index,
            prev_out: record.prev_out.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    height: Option<u32>,
    records: usize,
}

fn open_state(index_params: &IndexParams) -> crate::Result<AliasState> {
    // Inspection never writes the fee window back.
    let options = AliasStateOptions::builder()
        .persist_fee_window(false)
        .track_pending(false)
        .build();

    Ok(AliasState::open(
        &index_params.base_path,
        index_params.network_params.alias_params(),
        options,
    )?)
}

impl NameCmd {
    pub fn run(self) -> crate::Result<()> {
        match self {
            Self::Show {
                name,
                best_height,
                index_params,
            } => {
                let state = open_state(&index_params)?;
                let info = state
                    .name_info(name.as_bytes(), best_height)?
                    .ok_or(Error::NameNotFound(name))?;
                print_json(&NameView::from(info))
            }
            Self::History { name, index_params } => {
                let state = open_state(&index_params)?;
                let history = state
                    .name_history(name.as_bytes())?
                    .ok_or(Error::NameNotFound(name))?;
                let records = history
                    .records()
                    .iter()
                    .map(RecordView::from)
                    .collect::<Vec<_>>();
                print_json(&records)
            }
            Self::List { index_params } => {
                let state = open_state(&index_params)?;
                let mut entries = Vec::new();
                for entry in state.index().iter_names()? {
                    let (name, history) = entry?;
                    entries.push(ListEntry {
                        name: String::from_utf8_lossy(&name).into_owned(),
                        height: history.latest().map(|record| record.height),
                        records: history.len(),
                    });
                }
                tracing::debug!("Listed {} names", entries.len());
                print_json(&entries)
            }
        }
    }
}
