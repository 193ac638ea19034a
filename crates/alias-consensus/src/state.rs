use crate::error::display_name;
use crate::pending::PendingClaims;
use crate::validation::{check_transaction, is_unexpired, NameLookup};
use crate::{AcceptedOperation, AliasStateOptions, Error, Result, ValidationContext};
use alias_index::{NameIndex, ReconstructStats};
use alias_primitives::economics::{display_expiration_depth, expiration_depth, network_fee};
use alias_primitives::{
    is_alias_tx, AliasParams, BlockSource, Coin, CoinView, FeeWindow, NameHistory,
    NameIndexRecord,
};
use alias_script::{decode_transaction, AliasOperation};
use bitcoin::{Amount, Block, OutPoint, Transaction, Txid};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Current registration of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    /// Alias output currently owning the name.
    pub outpoint: OutPoint,
    /// Height of the latest confirmation.
    pub height: u32,
    /// Height from which validation treats the name as free for a new reveal.
    ///
    /// `expired` only turns true past this height, so at exactly `expires_at`
    /// the name is shown as alive while a competing reveal is already allowed.
    pub expires_at: u32,
    /// Blocks left before expiry, as shown to users.
    pub expires_in: i64,
    pub expired: bool,
}

/// Alias operations applied by a connected block.
#[derive(Debug, Clone, Default)]
pub struct ConnectedBlock {
    pub height: u32,
    pub operations: Vec<AcceptedOperation>,
}

/// Coins of the parent view plus the outputs created earlier in the block.
struct BlockCoins<'a, C: ?Sized> {
    base: &'a C,
    created: HashMap<OutPoint, Coin>,
}

impl<C: CoinView + ?Sized> BlockCoins<'_, C> {
    fn add_outputs(&mut self, tx: &Transaction, height: u32) {
        let txid = tx.compute_txid();
        let is_coinbase = tx.is_coinbase();

        for (vout, output) in tx.output.iter().enumerate() {
            if output.script_pubkey.is_op_return() {
                continue;
            }

            self.created.insert(
                OutPoint {
                    txid,
                    vout: vout as u32,
                },
                Coin {
                    is_coinbase,
                    amount: output.value.to_sat(),
                    height,
                    script_pubkey: output.script_pubkey.clone(),
                },
            );
        }
    }
}

impl<C: CoinView + ?Sized> CoinView for BlockCoins<'_, C> {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.created
            .get(outpoint)
            .cloned()
            .or_else(|| self.base.coin(outpoint))
    }
}

/// Name histories modified by a block, not written yet.
struct StagedNames<'a> {
    index: &'a NameIndex,
    histories: BTreeMap<Vec<u8>, NameHistory>,
}

impl StagedNames<'_> {
    fn insert(&mut self, name: &[u8], record: NameIndexRecord) -> Result<()> {
        if !self.histories.contains_key(name) {
            let history = self.index.try_read(name)?.unwrap_or_default();
            self.histories.insert(name.to_vec(), history);
        }

        if let Some(history) = self.histories.get_mut(name) {
            history.insert(record);
        }

        Ok(())
    }
}

impl NameLookup for StagedNames<'_> {
    fn latest_height(&self, name: &[u8]) -> Result<Option<u32>> {
        match self.histories.get(name) {
            Some(history) => Ok(history.latest().map(|record| record.height)),
            None => self.index.latest_height(name),
        }
    }
}

/// Alias registry state: name index, fee sample window and pending claims.
pub struct AliasState {
    index: NameIndex,
    fee_window: FeeWindow,
    pending: PendingClaims,
    params: AliasParams,
    options: AliasStateOptions,
}

impl AliasState {
    /// Open the alias state backed by the name index at `path`.
    pub fn open(path: &Path, params: AliasParams, options: AliasStateOptions) -> Result<Self> {
        let index = NameIndex::open(path)?;

        let fee_window = if options.persist_fee_window {
            index.read_fee_window()?
        } else {
            FeeWindow::new()
        };

        tracing::info!(
            "Opened alias state for {}, {} fee samples",
            params.network,
            fee_window.len()
        );

        Ok(Self {
            index,
            fee_window,
            pending: PendingClaims::new(),
            params,
            options,
        })
    }

    /// Flush everything to disk and release the index.
    pub fn close(self) -> Result<()> {
        if self.options.persist_fee_window {
            self.index.write_fee_window(&self.fee_window)?;
        }
        self.index.flush()?;

        tracing::info!("Closed alias state");

        Ok(())
    }

    pub fn params(&self) -> &AliasParams {
        &self.params
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    pub fn fee_window(&self) -> &FeeWindow {
        &self.fee_window
    }

    /// Validate a single transaction and apply its effects as `ctx` allows.
    ///
    /// Index writes are synced before returning.
    pub fn check_inputs<C: CoinView + ?Sized>(
        &mut self,
        tx: &Transaction,
        ctx: &ValidationContext,
        coins: &C,
    ) -> Result<Option<AcceptedOperation>> {
        let accepted = match check_transaction(tx, ctx, coins, &self.index, &self.params) {
            Ok(Some(accepted)) => accepted,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::debug!(
                    "Rejected alias transaction {} at height {}: {err}",
                    tx.compute_txid(),
                    ctx.height
                );
                return Err(err);
            }
        };

        if ctx.is_mempool_admission() && self.options.track_pending {
            if let Some(name) = accepted.operation.name() {
                self.pending.observe(name, accepted.txid);
            }
        }

        if ctx.applies_effects() {
            let mut fee_window = self.fee_window.clone();
            fee_window.insert(
                accepted.txid,
                ctx.block_time,
                ctx.height,
                accepted.sampled_fee(&self.params, ctx.height),
            );

            let history = match accepted.index_record(ctx.height) {
                Some((name, record)) => {
                    let mut history = self.index.try_read(name)?.unwrap_or_default();
                    history.insert(record);
                    Some((name, history))
                }
                None => None,
            };

            // The record and the fee sample land in one synced batch.
            self.index.commit_batch(
                history.iter().map(|(name, history)| (*name, history)),
                self.options.persist_fee_window.then_some(&fee_window),
            )?;
            self.fee_window = fee_window;

            if let Some((name, _)) = &history {
                tracing::info!(
                    "Wrote {} for name {} at height {}",
                    accepted.operation.op(),
                    display_name(name),
                    ctx.height
                );
                self.pending.settle(name, &accepted.txid);
            }
        }

        Ok(Some(accepted))
    }

    /// Validate every transaction of `block` and record their effects atomically.
    ///
    /// Outputs created by earlier transactions of the block are visible to later
    /// ones. Nothing is written if any transaction is rejected.
    pub fn connect_block<C: CoinView + ?Sized>(
        &mut self,
        block: &Block,
        height: u32,
        best_height: u32,
        coins: &C,
    ) -> Result<ConnectedBlock> {
        let ctx = ValidationContext::connect_block(height, block.header.time, best_height);

        let mut block_coins = BlockCoins {
            base: coins,
            created: HashMap::new(),
        };
        let mut staged = StagedNames {
            index: &self.index,
            histories: BTreeMap::new(),
        };
        let mut fee_window = self.fee_window.clone();
        let mut settled = Vec::new();
        let mut operations = Vec::new();

        for (index, tx) in block.txdata.iter().enumerate() {
            let accepted = check_transaction(tx, &ctx, &block_coins, &staged, &self.params)
                .map_err(|err| {
                    let txid = tx.compute_txid();
                    tracing::debug!("Rejected block #{height} at transaction {txid}: {err}");
                    Error::BlockTransaction {
                        index,
                        txid,
                        source: Box::new(err),
                    }
                })?;

            block_coins.add_outputs(tx, height);

            let Some(accepted) = accepted else {
                continue;
            };

            if ctx.applies_effects() {
                if let Some((name, record)) = accepted.index_record(height) {
                    staged.insert(name, record)?;
                }
                fee_window.insert(
                    accepted.txid,
                    ctx.block_time,
                    height,
                    accepted.sampled_fee(&self.params, height),
                );
                if let Some(name) = accepted.operation.name() {
                    settled.push((name.to_vec(), accepted.txid));
                }
            }

            operations.push(accepted);
        }

        let StagedNames { histories, .. } = staged;

        if !histories.is_empty() || fee_window != self.fee_window {
            self.index.commit_batch(
                histories
                    .iter()
                    .map(|(name, history)| (name.as_slice(), history)),
                self.options.persist_fee_window.then_some(&fee_window),
            )?;
        }

        self.fee_window = fee_window;

        for (name, txid) in settled {
            self.pending.settle(&name, &txid);
        }

        if !operations.is_empty() {
            tracing::debug!(
                "Connected block #{height}: {} alias operations, {} names updated",
                operations.len(),
                histories.len()
            );
        }

        Ok(ConnectedBlock { height, operations })
    }

    /// Rebuild the index from the best chain of `source` and reset in-memory state.
    pub fn reconstruct<S: BlockSource + ?Sized>(&mut self, source: &S) -> Result<ReconstructStats> {
        let stats = self.index.reconstruct(source, &self.params)?;
        self.fee_window = self.index.read_fee_window()?;
        self.pending.clear();
        Ok(stats)
    }

    pub fn name_exists(&self, name: &[u8]) -> Result<bool> {
        Ok(self.index.exists(name)?)
    }

    pub fn name_history(&self, name: &[u8]) -> Result<Option<NameHistory>> {
        Ok(self.index.try_read(name)?)
    }

    /// Current registration of `name` as seen from `best_height`.
    pub fn name_info(&self, name: &[u8], best_height: u32) -> Result<Option<NameInfo>> {
        let Some(latest) = self.index.latest(name)? else {
            return Ok(None);
        };

        let expires_at = latest.height.saturating_add(expiration_depth(best_height));
        let expires_in = i64::from(latest.height) + i64::from(display_expiration_depth(latest.height))
            - i64::from(best_height);

        Ok(Some(NameInfo {
            name: name.to_vec(),
            value: latest.value.clone(),
            outpoint: latest.outpoint(),
            height: latest.height,
            expires_at,
            expires_in,
            expired: expires_at < best_height,
        }))
    }

    pub fn is_expired(&self, name: &[u8], best_height: u32) -> Result<bool> {
        Ok(self
            .name_info(name, best_height)?
            .is_none_or(|info| info.expired))
    }

    /// Whether `tx` is a `FirstUpdate` for a name that is registered and unexpired at `best_height`.
    pub fn is_conflicted(&self, tx: &Transaction, best_height: u32) -> Result<bool> {
        if !is_alias_tx(tx) {
            return Ok(false);
        }

        let Some((_, decoded)) = decode_transaction(tx) else {
            return Ok(false);
        };

        let AliasOperation::FirstUpdate { name, .. } = &decoded.operation else {
            return Ok(false);
        };

        Ok(self
            .index
            .name_height(name)?
            .is_some_and(|registered| is_unexpired(registered, best_height)))
    }

    /// Unconfirmed transactions contending for `name`.
    pub fn pending_claims(&self, name: &[u8]) -> Vec<Txid> {
        self.pending.contenders(name).copied().collect()
    }

    pub fn pending(&self) -> &PendingClaims {
        &self.pending
    }

    /// Minimum fee a `FirstUpdate` must burn at `height`.
    pub fn minimum_fee(&self, height: u32) -> Amount {
        network_fee(&self.params, height)
    }

    pub fn expiration_depth(&self, height: u32) -> u32 {
        expiration_depth(height)
    }

    /// Registration fee estimate at `height` from the recent fee samples.
    pub fn estimated_subsidy(&self, height: u32) -> Amount {
        self.fee_window.estimated_subsidy(height)
    }
}
