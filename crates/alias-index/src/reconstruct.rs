//! Rebuild of the name index by replaying the best chain.

use crate::{Error, NameIndex, Result};
use alias_primitives::economics::network_fee;
use alias_primitives::{
    is_alias_tx, AliasParams, BlockSource, FeeWindow, NameHistory, NameIndexRecord,
};
use alias_script::{burn_fee, decode_script, decode_transaction, AliasOperation};
use bitcoin::OutPoint;
use std::collections::{BTreeMap, HashSet};

/// Summary of a reconstruction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// Number of blocks replayed.
    pub blocks: u32,
    /// Number of alias transactions applied.
    pub alias_txs: usize,
    /// Number of distinct names written.
    pub names: usize,
}

impl NameIndex {
    /// Rebuild every name history and the fee window from genesis to the tip of `source`.
    ///
    /// The rebuilt index replaces the previous content in a single batch, so a
    /// failed replay leaves the index as it was. Replaying the same chain always
    /// yields the same stored bytes as maintaining the index block by block.
    pub fn reconstruct<S: BlockSource + ?Sized>(
        &self,
        source: &S,
        params: &AliasParams,
    ) -> Result<ReconstructStats> {
        let tip = source.tip_height();

        tracing::info!("Reconstructing name index up to block #{tip}");

        let mut histories = BTreeMap::<Vec<u8>, NameHistory>::new();
        let mut window = FeeWindow::new();
        let mut alias_outputs = HashSet::<OutPoint>::new();
        let mut stats = ReconstructStats::default();

        for height in 0..=tip {
            let block = source.block_at(height).ok_or(Error::MissingBlock(height))?;
            let block_time = block.header.time;

            for tx in &block.txdata {
                let txid = tx.compute_txid();
                let is_coinbase = tx.is_coinbase();

                // The first spent alias output, in input order.
                let prev_out = if is_coinbase {
                    None
                } else {
                    tx.input
                        .iter()
                        .map(|input| input.previous_output)
                        .find(|outpoint| alias_outputs.contains(outpoint))
                };

                if !is_coinbase {
                    for input in &tx.input {
                        alias_outputs.remove(&input.previous_output);
                    }
                }

                for (vout, output) in tx.output.iter().enumerate() {
                    if decode_script(&output.script_pubkey).is_some() {
                        alias_outputs.insert(OutPoint {
                            txid,
                            vout: vout as u32,
                        });
                    }
                }

                if is_coinbase || !is_alias_tx(tx) {
                    continue;
                }

                let Some((output_index, decoded)) = decode_transaction(tx) else {
                    continue;
                };

                stats.alias_txs += 1;

                match decoded.operation {
                    AliasOperation::New { .. } => {
                        window.insert(txid, block_time, height, network_fee(params, height));
                    }
                    AliasOperation::FirstUpdate { name, value, .. }
                    | AliasOperation::Update { name, value } => {
                        histories.entry(name).or_default().insert(NameIndexRecord {
                            height,
                            value,
                            txid,
                            output_index: output_index as u32,
                            prev_out: prev_out.unwrap_or_else(OutPoint::null),
                        });
                        window.insert(txid, block_time, height, burn_fee(tx));
                    }
                }
            }

            stats.blocks += 1;

            if height % 10_000 == 0 && height > 0 {
                tracing::debug!("Replayed {height}/{tip} blocks, {} names", histories.len());
            }
        }

        stats.names = histories.len();

        self.replace_all(
            histories
                .iter()
                .map(|(name, history)| (name.as_slice(), history)),
            &window,
        )?;

        tracing::info!(
            "Reconstructed name index: {} blocks, {} alias transactions, {} names",
            stats.blocks,
            stats.alias_txs,
            stats.names
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alias_primitives::ALIAS_TX_VERSION;
    use alias_script::{burn_script, encode_script};
    use bitcoin::block::{Header, Version};
    use bitcoin::hashes::Hash;
    use bitcoin::{
        absolute, transaction, Amount, Block, BlockHash, CompactTarget, Network, PubkeyHash,
        ScriptBuf, Sequence, Transaction, TxIn, TxMerkleNode, TxOut, Txid, Witness,
    };

    struct Chain(Vec<Block>);

    impl BlockSource for Chain {
        fn tip_height(&self) -> u32 {
            self.0.len() as u32 - 1
        }

        fn block_at(&self, height: u32) -> Option<Block> {
            self.0.get(height as usize).cloned()
        }
    }

    fn owner() -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::all_zeros())
    }

    fn coinbase(height: u32) -> Transaction {
        Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(height.to_le_bytes().to_vec()),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(5_000_000_000),
                script_pubkey: owner(),
            }],
        }
    }

    fn alias_tx(spend: OutPoint, operation: &AliasOperation, fee: Amount) -> Transaction {
        Transaction {
            version: transaction::Version(ALIAS_TX_VERSION),
            lock_time: absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: spend,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![
                TxOut {
                    value: fee,
                    script_pubkey: burn_script(),
                },
                TxOut {
                    value: Amount::from_sat(1_000),
                    script_pubkey: encode_script(operation, &owner()).unwrap(),
                },
            ],
        }
    }

    fn block(height: u32, txs: Vec<Transaction>) -> Block {
        let mut txdata = vec![coinbase(height)];
        txdata.extend(txs);
        Block {
            header: Header {
                version: Version::TWO,
                prev_blockhash: BlockHash::all_zeros(),
                merkle_root: TxMerkleNode::all_zeros(),
                time: 1_000_000 + height * 600,
                bits: CompactTarget::from_consensus(0),
                nonce: height,
            },
            txdata,
        }
    }

    #[test]
    fn test_reconstruct_replays_alias_transactions() {
        let (_dir, index) = NameIndex::open_temp().unwrap();
        let params = AliasParams::new(Network::Regtest);

        let funding = OutPoint {
            txid: coinbase(0).compute_txid(),
            vout: 0,
        };
        let new = alias_tx(
            funding,
            &AliasOperation::New {
                commitment: vec![0; 20],
            },
            Amount::ZERO,
        );
        let new_out = OutPoint {
            txid: new.compute_txid(),
            vout: 1,
        };
        let first_update = alias_tx(
            new_out,
            &AliasOperation::FirstUpdate {
                name: b"alice".to_vec(),
                rand: vec![1; 20],
                value: b"hello".to_vec(),
            },
            Amount::from_sat(7_000),
        );
        let first_update_out = OutPoint {
            txid: first_update.compute_txid(),
            vout: 1,
        };
        let update = alias_tx(
            first_update_out,
            &AliasOperation::Update {
                name: b"alice".to_vec(),
                value: b"world".to_vec(),
            },
            Amount::ZERO,
        );

        let mut blocks = vec![block(0, vec![]), block(1, vec![new])];
        blocks.extend((2..13).map(|h| block(h, vec![])));
        blocks.push(block(13, vec![first_update.clone()]));
        blocks.push(block(14, vec![update.clone()]));
        let chain = Chain(blocks);

        let stats = index.reconstruct(&chain, &params).unwrap();
        assert_eq!(
            stats,
            ReconstructStats {
                blocks: 15,
                alias_txs: 3,
                names: 1,
            }
        );

        let history = index.read(b"alice").unwrap();
        let records = history.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].height, 13);
        assert_eq!(records[0].prev_out, new_out);
        assert_eq!(records[0].txid, first_update.compute_txid());
        assert_eq!(records[0].output_index, 1);
        assert_eq!(records[1].value, b"world");
        assert_eq!(records[1].prev_out, first_update_out);

        let window = index.read_fee_window().unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.samples().next().unwrap().height, 14);

        // Replaying again is idempotent.
        let before = index.raw_entries().unwrap();
        index.reconstruct(&chain, &params).unwrap();
        assert_eq!(index.raw_entries().unwrap(), before);
        assert_eq!(index.read_fee_window().unwrap(), window);
    }

    #[test]
    fn test_reconstruct_missing_block() {
        struct Gap;

        impl BlockSource for Gap {
            fn tip_height(&self) -> u32 {
                1
            }

            fn block_at(&self, height: u32) -> Option<Block> {
                (height == 0).then(|| block(0, vec![]))
            }
        }

        let (_dir, index) = NameIndex::open_temp().unwrap();
        let params = AliasParams::new(Network::Regtest);

        let mut history = NameHistory::new();
        history.insert(NameIndexRecord {
            height: 40,
            value: b"kept".to_vec(),
            txid: Txid::from_byte_array([4; 32]),
            output_index: 0,
            prev_out: OutPoint::null(),
        });
        index.write(b"alice", &history).unwrap();

        let mut window = FeeWindow::new();
        window.insert(Txid::from_byte_array([4; 32]), 1_000, 40, Amount::from_sat(9));
        index.write_fee_window(&window).unwrap();

        assert!(matches!(
            index.reconstruct(&Gap, &params),
            Err(Error::MissingBlock(1))
        ));

        // A failed replay keeps the previous index.
        assert_eq!(index.read(b"alice").unwrap(), history);
        assert_eq!(index.read_fee_window().unwrap(), window);
    }

    #[test]
    fn test_reconstruct_drops_names_absent_from_chain() {
        let (_dir, index) = NameIndex::open_temp().unwrap();
        let params = AliasParams::new(Network::Regtest);

        let mut history = NameHistory::new();
        history.insert(NameIndexRecord {
            height: 3,
            value: b"orphaned".to_vec(),
            txid: Txid::from_byte_array([3; 32]),
            output_index: 0,
            prev_out: OutPoint::null(),
        });
        index.write(b"stale", &history).unwrap();

        let chain = Chain(vec![block(0, vec![]), block(1, vec![])]);
        let stats = index.reconstruct(&chain, &params).unwrap();

        assert_eq!(stats.names, 0);
        assert!(!index.exists(b"stale").unwrap());
        assert!(index.raw_entries().unwrap().is_empty());
        assert!(index.read_fee_window().unwrap().is_empty());
    }
}
