//! Fee and expiration arithmetic of the alias protocol.
//!
//! Everything here is a pure function of block height, except [`FeeWindow`] which
//! keeps the bounded list of recently observed registration fees.

use crate::{AliasParams, FeeSample};
use bitcoin::{Amount, Txid};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of blocks kept in the fee sample window.
pub const FEE_WINDOW_BLOCKS: u32 = 2880;

/// Block time span kept in the fee sample window, in seconds.
pub const FEE_WINDOW_SECS: u32 = 12 * 60 * 60;

const HOUR_SECS: u32 = 60 * 60;

/// Height from which the fee schedule runs four times faster.
const FEE_ACCELERATION_HEIGHT: u64 = 24_000;

const HALVING_INTERVAL_BITS: u32 = 13;

const MAX_HALVINGS: u64 = 60;

/// Minimum registration fee a `FirstUpdate` must burn at `height`.
///
/// The fee halves every 8192 units of the adjusted height and decays linearly
/// within each halving period, reaching zero after 60 halvings.
pub fn network_fee(params: &AliasParams, height: u32) -> Amount {
    let mut adjusted = u64::from(height);
    if adjusted >= FEE_ACCELERATION_HEIGHT {
        adjusted += (adjusted - FEE_ACCELERATION_HEIGHT) * 3;
    }

    let halvings = adjusted >> HALVING_INTERVAL_BITS;
    if halvings >= MAX_HALVINGS {
        return Amount::ZERO;
    }

    let mut fee = params.base_network_fee.to_sat() >> halvings;
    fee -= (fee >> 14) * (adjusted % (1 << HALVING_INTERVAL_BITS));

    Amount::from_sat(fee)
}

/// Number of blocks a name stays registered without renewal, for an operation at `height`.
pub fn expiration_depth(height: u32) -> u32 {
    if height < 24_000 {
        12_000
    } else if height < 48_000 {
        height - 12_000
    } else {
        36_000
    }
}

/// Expiration depth shown to users. Never used for validation.
pub fn display_expiration_depth(height: u32) -> u32 {
    if height < 12_000 { 12_000 } else { 36_000 }
}

/// Depth of a coin created at `coin_height` relative to `height`.
///
/// Returns `None` if the coin is above `height` (including unconfirmed coins) or
/// buried `max_depth` blocks or deeper.
pub fn relative_depth(coin_height: u32, height: u32, max_depth: u32) -> Option<u32> {
    let depth = height.checked_sub(coin_height)?;
    (depth < max_depth).then_some(depth)
}

/// Newest-first sliding window of registration fees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeWindow {
    samples: VecDeque<FeeSample>,
}

impl FeeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fee observed in the block at `height` with `block_time`.
    ///
    /// Samples older than 12 hours relative to `block_time`, or more than 2880
    /// blocks below `height`, are dropped first. A sample already present for the
    /// same transaction and height is not duplicated.
    pub fn insert(&mut self, txid: Txid, block_time: u32, height: u32, value: Amount) {
        let min_height = height.saturating_sub(FEE_WINDOW_BLOCKS);
        let before = self.samples.len();

        while let Some(oldest) = self.samples.back() {
            let stale = u64::from(oldest.block_time) + u64::from(FEE_WINDOW_SECS)
                < u64::from(block_time)
                || oldest.height < min_height;
            if !stale {
                break;
            }
            self.samples.pop_back();
        }

        if self.samples.len() < before {
            tracing::trace!(
                "Pruned {} fee samples at height {height}",
                before - self.samples.len()
            );
        }

        if self
            .samples
            .iter()
            .any(|sample| sample.txid == txid && sample.height == height)
        {
            return;
        }

        self.samples.push_front(FeeSample {
            txid,
            block_time,
            height,
            value: value.to_sat(),
        });
    }

    /// Moving-average estimate of the registration fees collectable at `height`.
    ///
    /// Averages a 12 hour and a 1 hour sum of the samples, starting at the newest
    /// sample not above `height`, each divided by the number of blocks it spans.
    pub fn estimated_subsidy(&self, height: u32) -> Amount {
        let height = i64::from(height);
        let mut sum_12h: u64 = 1;
        let mut sum_1h: u64 = 1;
        let mut first_12h = height - 1;
        let mut first_1h = height - 1;
        let mut targets: Option<(u32, u32)> = None;

        for sample in &self.samples {
            let (target_12h, target_1h) = match targets {
                Some(targets) => targets,
                None if i64::from(sample.height) <= height => {
                    sum_12h = 0;
                    sum_1h = 0;
                    let found = (
                        sample.block_time.saturating_sub(FEE_WINDOW_SECS),
                        sample.block_time.saturating_sub(HOUR_SECS),
                    );
                    targets = Some(found);
                    found
                }
                None => continue,
            };

            if sample.block_time > target_12h {
                sum_12h = sum_12h.saturating_add(sample.value);
                first_12h = i64::from(sample.height);
                if sample.block_time > target_1h {
                    sum_1h = sum_1h.saturating_add(sample.value);
                    first_1h = i64::from(sample.height);
                }
            }
        }

        let span = |first: i64| (height - first + 1).max(1) as u64;
        let avg_12h = sum_12h / span(first_12h);
        let avg_1h = sum_1h / span(first_1h);

        Amount::from_sat((avg_12h + avg_1h) / 2)
    }

    /// Samples, newest first.
    pub fn samples(&self) -> impl Iterator<Item = &FeeSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::Network;

    fn txid(n: u8) -> Txid {
        Txid::from_byte_array([n; 32])
    }

    #[test]
    fn test_expiration_depth() {
        assert_eq!(expiration_depth(0), 12_000);
        assert_eq!(expiration_depth(23_999), 12_000);
        assert_eq!(expiration_depth(24_000), 12_000);
        assert_eq!(expiration_depth(30_000), 18_000);
        assert_eq!(expiration_depth(47_999), 35_999);
        assert_eq!(expiration_depth(48_000), 36_000);
        assert_eq!(expiration_depth(50_000), 36_000);

        let mut last = 0;
        for height in (0..100_000).step_by(97) {
            let depth = expiration_depth(height);
            assert!(depth >= last, "expiration depth decreased at {height}");
            last = depth;
        }
    }

    #[test]
    fn test_display_expiration_depth() {
        assert_eq!(display_expiration_depth(0), 12_000);
        assert_eq!(display_expiration_depth(11_999), 12_000);
        assert_eq!(display_expiration_depth(12_000), 36_000);
    }

    #[test]
    fn test_network_fee_schedule() {
        let params = AliasParams::new(Network::Bitcoin);

        assert_eq!(network_fee(&params, 0), Amount::from_sat(5_000_000_000));
        // Linear decay within the first halving period.
        assert_eq!(
            network_fee(&params, 1),
            Amount::from_sat(5_000_000_000 - (5_000_000_000 >> 14))
        );
        assert_eq!(network_fee(&params, 8_192), Amount::from_sat(2_500_000_000));

        let mut last = network_fee(&params, 0);
        for height in 1..150_000 {
            let fee = network_fee(&params, height);
            assert!(fee <= last, "fee increased at height {height}");
            last = fee;
        }

        assert_eq!(network_fee(&params, 500_000), Amount::ZERO);
        assert_eq!(network_fee(&params, u32::MAX), Amount::ZERO);
    }

    #[test]
    fn test_network_fee_is_zero_after_sixty_halvings() {
        let params = AliasParams {
            base_network_fee: Amount::from_sat(u64::MAX),
            ..AliasParams::new(Network::Regtest)
        };

        // 60 halvings of the accelerated height: h + 3 * (h - 24000) = 60 << 13.
        assert_ne!(network_fee(&params, 140_879), Amount::ZERO);
        assert_eq!(network_fee(&params, 140_880), Amount::ZERO);
    }

    #[test]
    fn test_network_fee_accelerates_after_24000() {
        let params = AliasParams::new(Network::Regtest);

        // Adjusted height 24001 + 3 = 24004.
        let adjusted = 24_004u64;
        let expected = (10_000_000u64 >> (adjusted >> 13))
            - ((10_000_000u64 >> (adjusted >> 13)) >> 14) * (adjusted % 8192);
        assert_eq!(network_fee(&params, 24_001), Amount::from_sat(expected));
    }

    #[test]
    fn test_relative_depth() {
        assert_eq!(relative_depth(100, 100, 12), Some(0));
        assert_eq!(relative_depth(100, 111, 12), Some(11));
        assert_eq!(relative_depth(100, 112, 12), None);
        assert_eq!(relative_depth(101, 100, 12), None);
        assert_eq!(relative_depth(crate::MEMPOOL_HEIGHT, 100, 12_000), None);
    }

    #[test]
    fn test_fee_window_prunes_by_height_and_time() {
        let mut window = FeeWindow::new();
        window.insert(txid(1), 1_000_000, 10, Amount::from_sat(100));
        window.insert(txid(2), 1_000_600, 11, Amount::from_sat(200));
        assert_eq!(window.len(), 2);

        // Same transaction at the same height is only sampled once.
        window.insert(txid(2), 1_000_600, 11, Amount::from_sat(200));
        assert_eq!(window.len(), 2);

        // More than 12 hours later, everything before is stale.
        window.insert(txid(3), 1_000_600 + FEE_WINDOW_SECS + 1, 12, Amount::from_sat(300));
        assert_eq!(window.len(), 1);

        // More than 2880 blocks later.
        window.insert(txid(4), 1_000_600 + FEE_WINDOW_SECS + 2, 12 + 2881, Amount::from_sat(400));
        let heights = window.samples().map(|s| s.height).collect::<Vec<_>>();
        assert_eq!(heights, vec![2893]);
    }

    #[test]
    fn test_estimated_subsidy() {
        let window = FeeWindow::new();
        assert_eq!(window.estimated_subsidy(100), Amount::ZERO);

        let mut window = FeeWindow::new();
        let t = 1_000_000;
        window.insert(txid(1), t, 100, Amount::from_sat(1_000));
        window.insert(txid(2), t + 600, 101, Amount::from_sat(2_000));
        window.insert(txid(3), t + 7_200, 102, Amount::from_sat(4_000));

        // Starting at height 102: the 12 hour sum covers all three samples over
        // 3 blocks, the 1 hour sum only the newest over 1 block.
        assert_eq!(
            window.estimated_subsidy(102),
            Amount::from_sat((7_000 / 3 + 4_000) / 2)
        );

        // Samples above the queried height are skipped until the first one below.
        assert_eq!(
            window.estimated_subsidy(101),
            Amount::from_sat((3_000 / 2 + 3_000 / 2) / 2)
        );

        // Querying above the newest sample spreads the sums over more blocks.
        assert_eq!(
            window.estimated_subsidy(104),
            Amount::from_sat((7_000 / 5 + 4_000 / 3) / 2)
        );
    }
}
