use core::fmt::{Debug, Display};

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::models::{Pool, SorRoute, SwapKind};

/// Trait for smart order routing engines.
///
/// Implementations own their pool cache. They must allow concurrent `get_route` calls and
/// serialize concurrent `fetch_pools` calls themselves; callers add no locking.
#[cfg_attr(feature = "test-utils", mockall::automock(type Error = String;))]
#[async_trait]
pub trait SorRouter: Send + Sync {
    type Error: Display + Debug + Send + Sync;

    /// Refreshes the pool cache.
    ///
    /// # Arguments
    ///
    /// * `pools`: A pool snapshot to install. If empty, the router fetches pools from its own
    ///   data source.
    /// * `is_on_chain`: If `true` fresh data is required. If `false` the router may keep serving
    ///   its current cache.
    async fn fetch_pools(&self, pools: Vec<Pool>, is_on_chain: bool) -> Result<(), Self::Error>;

    /// Finds the best route for a single token pair.
    ///
    /// Returns `Ok(None)` if no pool path connects the tokens. Step indices of the returned route
    /// refer to `SorRoute::token_addresses`.
    async fn get_route(
        &self,
        token_in: Address,
        token_out: Address,
        kind: SwapKind,
        amount: U256,
    ) -> Result<Option<SorRoute>, Self::Error>;
}

/// Trait for executing read-only contract calls.
#[cfg_attr(feature = "test-utils", mockall::automock(type Error = String;))]
#[async_trait]
pub trait StaticCallExecutor: Send + Sync {
    type Error: Display + Debug + Send + Sync;

    /// Executes `calldata` against the contract at `to` on the latest block without persisting
    /// any state change, returning the raw return data.
    async fn static_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, Self::Error>;
}
