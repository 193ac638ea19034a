use crate::{CENT, COIN, COMMITMENT_LENGTH, MAX_NAME_LENGTH, MAX_VALUE_LENGTH, MIN_FIRST_UPDATE_DEPTH};
use bitcoin::{Amount, Network};

/// Network dependent alias protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasParams {
    pub network: Network,
    /// Registration fee at height 0, before any halving.
    pub base_network_fee: Amount,
    pub max_name_length: usize,
    pub max_value_length: usize,
    /// Maximum length of the random revealed by `FirstUpdate`.
    pub max_rand_length: usize,
    pub min_first_update_depth: u32,
}

impl AliasParams {
    /// Constructs a new instance of [`AliasParams`].
    pub fn new(network: Network) -> Self {
        let base_network_fee = match network {
            Network::Bitcoin => Amount::from_sat(50 * COIN),
            _ => Amount::from_sat(10 * CENT),
        };

        Self {
            network,
            base_network_fee,
            max_name_length: MAX_NAME_LENGTH,
            max_value_length: MAX_VALUE_LENGTH,
            max_rand_length: COMMITMENT_LENGTH,
            min_first_update_depth: MIN_FIRST_UPDATE_DEPTH,
        }
    }
}
