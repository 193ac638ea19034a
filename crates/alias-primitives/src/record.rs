use bitcoin::{Amount, OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// Confirmed state of a name at one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIndexRecord {
    /// Height of the block confirming the operation.
    pub height: u32,
    pub value: Vec<u8>,
    /// Transaction carrying the operation.
    pub txid: Txid,
    /// Index of the alias output within the confirming transaction.
    pub output_index: u32,
    /// Previous alias output spent by the operation.
    pub prev_out: OutPoint,
}

impl NameIndexRecord {
    /// Outpoint of the alias output currently owning the name.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.output_index,
        }
    }
}

/// Confirmation-ordered history of a name.
///
/// Heights are non-decreasing and there is at most one record per height. The
/// last record is the current state of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameHistory(Vec<NameIndexRecord>);

impl NameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record`, replacing the latest record if it was confirmed at the same height.
    pub fn insert(&mut self, record: NameIndexRecord) {
        if self
            .0
            .last()
            .is_some_and(|latest| latest.height == record.height)
        {
            self.0.pop();
        }
        self.0.push(record);
    }

    pub fn latest(&self) -> Option<&NameIndexRecord> {
        self.0.last()
    }

    pub fn records(&self) -> &[NameIndexRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Registration fee observed in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSample {
    pub txid: Txid,
    pub block_time: u32,
    pub height: u32,
    /// Fee in satoshis.
    pub value: u64,
}

impl FeeSample {
    pub fn amount(&self) -> Amount {
        Amount::from_sat(self.value)
    }
}
