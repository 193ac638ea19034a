//! Alias transaction validation.
//!
//! Every transaction is checked against the alias outputs it spends:
//!
//! 1. Locate the first input spending an alias output (the prior operation).
//! 2. A non-alias transaction must not spend an alias output.
//! 3. An alias transaction must carry a decodable operation.
//! 4. Per-operation rules:
//!    - `New` must not spend an alias output and commits to a 20 byte hash.
//!    - `FirstUpdate` burns at least the network fee and reveals the commitment of
//!      the `New` it spends, which must be buried [`MIN_FIRST_UPDATE_DEPTH`] blocks
//!      but not expired.
//!    - `Update` spends the latest unexpired operation on the same name.
//!
//! Which checks run depends on the [`ValidationFlags`] of the context.
//!
//! [`MIN_FIRST_UPDATE_DEPTH`]: alias_primitives::MIN_FIRST_UPDATE_DEPTH

use crate::error::display_name;
use crate::{Error, Result};
use alias_index::NameIndex;
use alias_primitives::economics::{expiration_depth, network_fee, relative_depth};
use alias_primitives::{
    commitment, is_alias_tx, AliasParams, CoinView, NameIndexRecord, COMMITMENT_LENGTH,
};
use alias_script::{burn_fee, decode_script, decode_transaction, AliasOp, AliasOperation};
use bitcoin::{Amount, OutPoint, Transaction, Txid};
use bitflags::bitflags;

bitflags! {
    /// Context in which an alias transaction is validated.
    ///
    /// No flag set means mempool admission.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidationFlags: u8 {
        /// The transaction is part of a block being connected to the best chain.
        const CONNECT_BLOCK = 1 << 0;
        /// The transaction is selected for a block template.
        const ASSEMBLE_BLOCK = 1 << 1;
        /// Validate without recording any effect.
        const CHECK_ONLY = 1 << 2;
    }
}

/// Chain position a transaction is validated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    /// Height of the block the transaction is evaluated in.
    pub height: u32,
    /// Time of that block.
    pub block_time: u32,
    /// Height of the current best block.
    pub best_height: u32,
    pub flags: ValidationFlags,
}

impl ValidationContext {
    /// Mempool admission, evaluated at the current tip.
    pub fn mempool(best_height: u32, best_time: u32) -> Self {
        Self {
            height: best_height,
            block_time: best_time,
            best_height,
            flags: ValidationFlags::empty(),
        }
    }

    pub fn connect_block(height: u32, block_time: u32, best_height: u32) -> Self {
        Self {
            height,
            block_time,
            best_height,
            flags: ValidationFlags::CONNECT_BLOCK,
        }
    }

    pub fn assemble_block(height: u32, block_time: u32, best_height: u32) -> Self {
        Self {
            height,
            block_time,
            best_height,
            flags: ValidationFlags::ASSEMBLE_BLOCK,
        }
    }

    /// Turns the context into a check-only pass.
    pub fn check_only(mut self) -> Self {
        self.flags |= ValidationFlags::CHECK_ONLY;
        self
    }

    pub fn is_connecting(&self) -> bool {
        self.flags.contains(ValidationFlags::CONNECT_BLOCK)
    }

    pub fn is_assembling(&self) -> bool {
        self.flags.contains(ValidationFlags::ASSEMBLE_BLOCK)
    }

    pub fn is_check_only(&self) -> bool {
        self.flags.contains(ValidationFlags::CHECK_ONLY)
    }

    /// Whether this is a plain mempool admission.
    pub fn is_mempool_admission(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether accepted operations are recorded in the index.
    pub fn applies_effects(&self) -> bool {
        !self
            .flags
            .intersects(ValidationFlags::CHECK_ONLY | ValidationFlags::ASSEMBLE_BLOCK)
            && self.height != self.best_height
    }

    // The reveal is checked against the commitment when a block includes it.
    fn checks_reveal(&self) -> bool {
        (self.is_connecting() && !self.is_check_only()) || self.is_assembling()
    }
}

/// Alias output spent by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorOutput {
    pub outpoint: OutPoint,
    /// Height of the spent coin.
    pub height: u32,
    pub operation: AliasOperation,
}

/// Alias operation accepted by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedOperation {
    pub txid: Txid,
    /// Index of the alias output in the transaction.
    pub output_index: u32,
    pub operation: AliasOperation,
    pub prior: Option<PriorOutput>,
    /// Value burnt in bare `OP_RETURN` outputs.
    pub burn_fee: Amount,
}

impl AcceptedOperation {
    /// Index record confirming the operation at `height`, `None` for `New`.
    pub fn index_record(&self, height: u32) -> Option<(&[u8], NameIndexRecord)> {
        let name = self.operation.name()?;
        let value = self.operation.value()?;

        Some((
            name,
            NameIndexRecord {
                height,
                value: value.to_vec(),
                txid: self.txid,
                output_index: self.output_index,
                prev_out: self
                    .prior
                    .as_ref()
                    .map(|prior| prior.outpoint)
                    .unwrap_or_else(OutPoint::null),
            },
        ))
    }

    /// Fee sampled for the estimator: the network fee for `New`, the burnt fee otherwise.
    pub fn sampled_fee(&self, params: &AliasParams, height: u32) -> Amount {
        match self.operation.op() {
            AliasOp::New => network_fee(params, height),
            AliasOp::FirstUpdate | AliasOp::Update => self.burn_fee,
        }
    }
}

/// Read access to the confirmation heights of names.
pub(crate) trait NameLookup {
    fn latest_height(&self, name: &[u8]) -> Result<Option<u32>>;
}

impl NameLookup for NameIndex {
    fn latest_height(&self, name: &[u8]) -> Result<Option<u32>> {
        Ok(self.name_height(name)?)
    }
}

/// Whether a name confirmed at `registered` is still alive at `height`.
pub(crate) fn is_unexpired(registered: u32, height: u32) -> bool {
    height.saturating_sub(registered) < expiration_depth(height)
}

fn find_prior<C: CoinView + ?Sized>(tx: &Transaction, coins: &C) -> Option<PriorOutput> {
    tx.input.iter().find_map(|input| {
        let coin = coins.coin(&input.previous_output)?;
        let decoded = decode_script(&coin.script_pubkey)?;
        Some(PriorOutput {
            outpoint: input.previous_output,
            height: coin.height,
            operation: decoded.operation,
        })
    })
}

/// Validates `tx` in `ctx`.
///
/// Returns `None` for transactions outside the alias protocol, and for a
/// check-only `Update` without alias input while connecting a block.
pub(crate) fn check_transaction<C, N>(
    tx: &Transaction,
    ctx: &ValidationContext,
    coins: &C,
    names: &N,
    params: &AliasParams,
) -> Result<Option<AcceptedOperation>>
where
    C: CoinView + ?Sized,
    N: NameLookup + ?Sized,
{
    if tx.is_coinbase() {
        return Ok(None);
    }

    let prior = find_prior(tx, coins);

    // An alias output spent by a regular transaction would lose its name.
    if !is_alias_tx(tx) {
        return match prior {
            Some(_) => Err(Error::AliasInputWithoutAliasVersion),
            None => Ok(None),
        };
    }

    let (output_index, decoded) = decode_transaction(tx).ok_or(Error::NotAliasOperation)?;
    let operation = decoded.operation;

    if operation.first_arg().len() > params.max_name_length {
        return Err(Error::NameTooLong(operation.first_arg().len()));
    }

    let burnt = burn_fee(tx);

    match &operation {
        AliasOperation::New { commitment } => {
            if prior.is_some() {
                return Err(Error::NewSpendsAlias);
            }

            if commitment.len() != COMMITMENT_LENGTH {
                return Err(Error::InvalidCommitmentLength(commitment.len()));
            }
        }
        AliasOperation::FirstUpdate { name, rand, value } => {
            let required = network_fee(params, ctx.height);
            if burnt < required {
                return Err(Error::FeeTooLow {
                    paid: burnt,
                    required,
                });
            }

            let new = prior.as_ref().and_then(|prior| match &prior.operation {
                AliasOperation::New { commitment } => Some((prior, commitment)),
                _ => None,
            });

            if new.is_none() && !ctx.is_check_only() {
                return Err(Error::MissingNewInput);
            }

            if rand.len() > params.max_rand_length {
                return Err(Error::RandTooLong(rand.len()));
            }

            if value.len() > params.max_value_length {
                return Err(Error::ValueTooLong(value.len()));
            }

            if ctx.checks_reveal() {
                let (new, committed) = new.ok_or(Error::MissingNewInput)?;

                if commitment(rand, name).as_slice() != committed.as_slice() {
                    return Err(Error::CommitmentMismatch);
                }

                if let Some(depth) =
                    relative_depth(new.height, ctx.height, params.min_first_update_depth)
                {
                    return Err(Error::NotYetDeep {
                        depth,
                        required: params.min_first_update_depth,
                    });
                }

                if relative_depth(new.height, ctx.height, expiration_depth(ctx.height)).is_none() {
                    return Err(Error::CommitmentExpired);
                }
            }

            // Block connection relies on the depth checks above instead.
            if !ctx.is_connecting() {
                if let Some(registered) = names.latest_height(name)? {
                    if is_unexpired(registered, ctx.height) {
                        return Err(Error::NameAlreadyRegistered(display_name(name)));
                    }
                }
            }
        }
        AliasOperation::Update { name, value } => {
            if prior.is_none() && ctx.is_connecting() && ctx.is_check_only() {
                return Ok(None);
            }

            let prior = prior
                .as_ref()
                .filter(|prior| {
                    matches!(prior.operation.op(), AliasOp::FirstUpdate | AliasOp::Update)
                })
                .ok_or(Error::MissingNameInput)?;

            if value.len() > params.max_value_length {
                return Err(Error::ValueTooLong(value.len()));
            }

            if prior.operation.name() != Some(name.as_slice()) {
                return Err(Error::NameMismatch {
                    expected: display_name(prior.operation.name().unwrap_or_default()),
                    actual: display_name(name),
                });
            }

            if (ctx.is_connecting() || ctx.is_assembling())
                && relative_depth(prior.height, ctx.height, expiration_depth(ctx.height)).is_none()
            {
                return Err(Error::NameExpired);
            }

            if !ctx.is_connecting() && !ctx.is_assembling() {
                let indexed = names.latest_height(name)?;
                if indexed != Some(prior.height) {
                    return Err(Error::StaleNameInput {
                        indexed,
                        spent: prior.height,
                    });
                }
            }
        }
    }

    Ok(Some(AcceptedOperation {
        txid: tx.compute_txid(),
        output_index: output_index as u32,
        operation,
        prior,
        burn_fee: burnt,
    }))
}
