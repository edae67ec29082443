pub mod error;
pub mod network;
pub mod pool;
pub mod swap;

use alloy_primitives::{Address, I256};

pub use self::{
    error::SwapsError,
    network::Network,
    pool::{Pool, PoolToken},
    swap::{
        BatchSwap, FetchPoolsOptions, QueryWithSorInput, QueryWithSorOutput, SorRoute, SwapKind,
        SwapStep, validate_swap_indices,
    },
};

/// Sentinel used in asset lists to denote the chain's native asset (e.g. ETH on mainnet).
///
/// The Vault wraps and unwraps it on the fly, so it may appear in an asset list next to the
/// wrapped token without aliasing it.
pub const NATIVE_ASSET: Address = Address::ZERO;

/// Net amounts per asset resulting from a simulated batch swap, parallel to the asset list.
///
/// Positive values are owed by the caller to the Vault, negative values are paid out by the Vault.
pub type AssetDeltas = Vec<I256>;

/// Slippage adjusted bound per asset, parallel to the asset list and in the Vault's sign
/// convention.
pub type Limits = Vec<I256>;
