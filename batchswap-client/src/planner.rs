//! Turns swap intents into a single Vault batch swap by routing every token pair through a
//! [`SorRouter`] and merging the per pair routes.
use std::collections::HashMap;

use batchswap_common::{
    models::{
        BatchSwap, FetchPoolsOptions, Network, Pool, SwapKind, SwapStep, SwapsError, NATIVE_ASSET,
    },
    traits::SorRouter,
    Address, U256,
};
use futures03::future::try_join_all;
use tracing::{debug, info, instrument, warn};

/// Merged asset list with a first-seen index for every token.
#[derive(Debug, Default)]
struct AssetIndex {
    indices: HashMap<Address, usize>,
    assets: Vec<Address>,
}

impl AssetIndex {
    fn register(&mut self, token: Address) -> usize {
        *self
            .indices
            .entry(token)
            .or_insert_with(|| {
                self.assets.push(token);
                self.assets.len() - 1
            })
    }
}

pub struct SorRoutingPlanner<R> {
    router: R,
    network: Network,
}

impl<R: SorRouter> SorRoutingPlanner<R> {
    pub fn new(router: R, network: Network) -> Self {
        Self { router, network }
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Refreshes the router's pools. Failures are logged and reported as `false`.
    #[instrument(skip(self, pools), fields(n_pools = pools.len()))]
    pub async fn refresh_pools(&self, pools: Vec<Pool>, is_on_chain: bool) -> bool {
        match self
            .router
            .fetch_pools(pools, is_on_chain)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Failed to refresh pools");
                false
            }
        }
    }

    /// Routes every `(tokens_in[i], tokens_out[i], amounts[i])` pair and merges the routes into
    /// one batch swap.
    ///
    /// Steps keep the input order of their pairs. The asset list holds every path token once, in
    /// first seen order. A pair without a route contributes no steps but its tokens are still
    /// registered.
    #[instrument(skip_all, fields(n_pairs = tokens_in.len(), %swap_type))]
    pub async fn plan_route(
        &self,
        tokens_in: &[Address],
        tokens_out: &[Address],
        swap_type: SwapKind,
        amounts: &[U256],
        fetch_pools: FetchPoolsOptions,
    ) -> Result<BatchSwap, SwapsError> {
        let pairs = validate_pairs(self.network, tokens_in, tokens_out, amounts)?;

        if fetch_pools.fetch {
            let refreshed = self
                .refresh_pools(vec![], fetch_pools.is_on_chain)
                .await;
            if !refreshed {
                debug!("Routing on cached pools");
            }
        }

        let routes = try_join_all(pairs.iter().map(|&(token_in, token_out, amount)| async move {
            self.router
                .get_route(
                    routable(self.network, token_in),
                    routable(self.network, token_out),
                    swap_type,
                    amount,
                )
                .await
                .map_err(|e| SwapsError::Routing(format!("{token_in} -> {token_out}: {e}")))
        }))
        .await?;

        let mut index = AssetIndex::default();
        let mut swaps: Vec<SwapStep> = Vec::new();
        for ((token_in, token_out, _), route) in pairs.into_iter().zip(routes) {
            let route = match route {
                Some(route) if !route.is_empty() => route,
                _ => {
                    info!(%token_in, %token_out, "No route found, pair contributes no swaps");
                    index.register(token_in);
                    index.register(token_out);
                    continue;
                }
            };

            let uses_native = token_in == NATIVE_ASSET || token_out == NATIVE_ASSET;
            let local_to_merged: Vec<usize> = route
                .token_addresses
                .iter()
                .map(|&token| {
                    if uses_native && token == self.network.wrapped_native() {
                        index.register(NATIVE_ASSET)
                    } else {
                        index.register(token)
                    }
                })
                .collect();
            index.register(token_in);
            index.register(token_out);

            for step in route.swaps {
                let remap = |local: usize| {
                    local_to_merged
                        .get(local)
                        .copied()
                        .ok_or_else(|| {
                            SwapsError::Routing(format!(
                                "route for {token_in} -> {token_out} references token {local} \
                                 of {}",
                                local_to_merged.len()
                            ))
                        })
                };
                swaps.push(SwapStep {
                    asset_in_index: remap(step.asset_in_index)?,
                    asset_out_index: remap(step.asset_out_index)?,
                    ..step
                });
            }
        }

        let batch = BatchSwap::new(swap_type, swaps, index.assets);
        batch.validate()?;
        debug!(n_swaps = batch.swaps.len(), n_assets = batch.assets.len(), "Planned batch swap");
        Ok(batch)
    }
}

/// The router only knows ERC20 pools, so the native asset is routed as its wrapped token.
fn routable(network: Network, token: Address) -> Address {
    if token == NATIVE_ASSET {
        network.wrapped_native()
    } else {
        token
    }
}

/// Checks routing inputs without touching the network.
///
/// The three slices must be parallel and non-empty, no pair may swap a token for itself (the
/// native asset counts as its wrapped token) and no amount may be zero.
pub fn validate_pairs(
    network: Network,
    tokens_in: &[Address],
    tokens_out: &[Address],
    amounts: &[U256],
) -> Result<Vec<(Address, Address, U256)>, SwapsError> {
    if tokens_in.len() != tokens_out.len() || tokens_in.len() != amounts.len() {
        return Err(SwapsError::InvalidInput(format!(
            "tokens_in, tokens_out and amounts must have equal lengths, got {}, {} and {}",
            tokens_in.len(),
            tokens_out.len(),
            amounts.len()
        )));
    }
    if tokens_in.is_empty() {
        return Err(SwapsError::InvalidInput("no token pairs given".to_string()));
    }

    tokens_in
        .iter()
        .zip(tokens_out)
        .zip(amounts)
        .enumerate()
        .map(|(i, ((&token_in, &token_out), &amount))| {
            if routable(network, token_in) == routable(network, token_out) {
                return Err(SwapsError::InvalidInput(format!(
                    "pair {i} swaps {token_in} for {token_out}"
                )));
            }
            if amount.is_zero() {
                return Err(SwapsError::InvalidInput(format!("pair {i} has a zero amount")));
            }
            Ok((token_in, token_out, amount))
        })
        .collect()
}
