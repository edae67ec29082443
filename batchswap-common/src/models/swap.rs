use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::{error::SwapsError, AssetDeltas};
use crate::serde_primitives::{decimal, decimal_vec};

/// Which side of a swap is fixed by the caller.
///
/// With `GivenIn` the step amounts are exact input amounts and outputs are computed; with
/// `GivenOut` the step amounts are exact outputs and the inputs are computed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum SwapKind {
    #[default]
    #[serde(alias = "GIVEN_IN", alias = "givenIn")]
    #[strum(to_string = "given_in", serialize = "givenin", serialize = "exact_in", serialize = "0")]
    GivenIn,
    #[serde(alias = "GIVEN_OUT", alias = "givenOut")]
    #[strum(
        to_string = "given_out",
        serialize = "givenout",
        serialize = "exact_out",
        serialize = "1"
    )]
    GivenOut,
}

impl From<SwapKind> for u8 {
    fn from(value: SwapKind) -> Self {
        match value {
            SwapKind::GivenIn => 0,
            SwapKind::GivenOut => 1,
        }
    }
}

/// One hop of a batch swap. Asset indices point into the asset list of the enclosing
/// [`BatchSwap`].
///
/// An `amount` of zero on any step but the first chains the step to its predecessor: the Vault
/// then uses the amount computed by the previous step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapStep {
    pub pool_id: B256,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    #[serde(with = "decimal")]
    pub amount: U256,
    #[serde(default)]
    pub user_data: Bytes,
}

impl SwapStep {
    pub fn new(pool_id: B256, asset_in_index: usize, asset_out_index: usize, amount: U256) -> Self {
        Self { pool_id, asset_in_index, asset_out_index, amount, user_data: Bytes::new() }
    }
}

/// Checks that every step references assets within `asset_count` and never swaps an asset for
/// itself.
pub fn validate_swap_indices(swaps: &[SwapStep], asset_count: usize) -> Result<(), SwapsError> {
    for (i, step) in swaps.iter().enumerate() {
        if step.asset_in_index >= asset_count || step.asset_out_index >= asset_count {
            return Err(SwapsError::InvalidInput(format!(
                "swap {i} references asset index ({}, {}) but only {asset_count} assets are given",
                step.asset_in_index, step.asset_out_index
            )));
        }
        if step.asset_in_index == step.asset_out_index {
            return Err(SwapsError::InvalidInput(format!(
                "swap {i} uses asset index {} as both input and output",
                step.asset_in_index
            )));
        }
    }
    Ok(())
}

/// The unit of work submitted to the Vault for simulation or execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSwap {
    pub kind: SwapKind,
    pub swaps: Vec<SwapStep>,
    pub assets: Vec<Address>,
}

impl BatchSwap {
    pub fn new(kind: SwapKind, swaps: Vec<SwapStep>, assets: Vec<Address>) -> Self {
        Self { kind, swaps, assets }
    }

    pub fn validate(&self) -> Result<(), SwapsError> {
        validate_swap_indices(&self.swaps, self.assets.len())
    }
}

/// Controls the pool refresh performed before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPoolsOptions {
    /// Refresh the router's pools before routing.
    #[serde(default = "default_true")]
    pub fetch: bool,
    /// Require fresh data from the source. When `false` a warm cache may be used as is.
    #[serde(default = "default_true", alias = "isOnChain")]
    pub is_on_chain: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FetchPoolsOptions {
    fn default() -> Self {
        Self { fetch: true, is_on_chain: true }
    }
}

/// Swap intent handed to the routing planner. `tokens_in`, `tokens_out` and `amounts` are
/// parallel; the meaning of `amounts` depends on `swap_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWithSorInput {
    pub tokens_in: Vec<Address>,
    pub tokens_out: Vec<Address>,
    pub swap_type: SwapKind,
    #[serde(with = "decimal_vec")]
    pub amounts: Vec<U256>,
    #[serde(default, alias = "fetchPools")]
    pub fetch_pools: FetchPoolsOptions,
}

/// A routed batch swap together with its simulated deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWithSorOutput {
    pub swaps: Vec<SwapStep>,
    pub assets: Vec<Address>,
    #[serde(with = "decimal_vec")]
    pub deltas: AssetDeltas,
}

/// Route returned by a routing engine for a single token pair. Step indices point into
/// `token_addresses`, not into any merged asset list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SorRoute {
    pub swaps: Vec<SwapStep>,
    pub token_addresses: Vec<Address>,
}

impl SorRoute {
    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }
}
