use batchswap_common::{
    models::{
        AssetDeltas, BatchSwap, Limits, Network, Pool, QueryWithSorInput, QueryWithSorOutput,
        SwapKind, SwapsError,
    },
    traits::{SorRouter, StaticCallExecutor},
    Address, I256,
};
use batchswap_ethereum::{errors::extract_error_chain, BatchSwapQuerySimulator, EthereumRpcClient};
use tracing::{debug, info, instrument};

use crate::{
    config::SwapsConfig,
    limits::{compute_limits, Slippage},
    planner::SorRoutingPlanner,
    sor::{HttpPoolSource, LiquidityRouter},
};

/// Service wired with the bundled router and an alloy RPC client.
pub type DefaultSwapsService = SwapsService<LiquidityRouter<HttpPoolSource>, EthereumRpcClient>;

/// Entry point for quoting batch swaps on one network.
///
/// Owns the routing planner and the Vault query simulator. All operations are read only; nothing
/// is signed or broadcast.
pub struct SwapsService<R, C> {
    planner: SorRoutingPlanner<R>,
    simulator: BatchSwapQuerySimulator<C>,
}

impl DefaultSwapsService {
    /// Builds the production collaborators for `config.network`.
    pub fn from_config(config: SwapsConfig) -> Result<Self, SwapsError> {
        config.validate()?;
        let rpc = EthereumRpcClient::new(&config.rpc_url)
            .map_err(|e| SwapsError::Config(extract_error_chain(&e)))?;
        let source = HttpPoolSource::new(&config.pools_url, &config.retry)
            .map_err(|e| SwapsError::Config(e.to_string()))?
            .with_min_liquidity(config.min_liquidity.clone());

        info!(
            network = %config.network,
            vault = %config.vault_address(),
            "Configured swaps service"
        );
        Ok(Self::new(
            SorRoutingPlanner::new(LiquidityRouter::new(source), config.network),
            BatchSwapQuerySimulator::new(rpc, config.vault_address()),
        ))
    }
}

impl<R: SorRouter> SwapsService<R, EthereumRpcClient> {
    /// Checks that the RPC endpoint serves the configured network.
    pub async fn verify_network(&self) -> Result<(), SwapsError> {
        let chain_id = self
            .simulator
            .executor()
            .get_chain_id()
            .await
            .map_err(|e| SwapsError::Config(extract_error_chain(&e)))?;
        let expected = self.network().chain_id();
        if chain_id != expected {
            return Err(SwapsError::Config(format!(
                "RPC endpoint serves chain {chain_id}, expected {expected} for {}",
                self.network()
            )));
        }
        debug!(chain_id, "Verified network");
        Ok(())
    }
}

impl<R: SorRouter, C: StaticCallExecutor> SwapsService<R, C> {
    pub fn new(planner: SorRoutingPlanner<R>, simulator: BatchSwapQuerySimulator<C>) -> Self {
        Self { planner, simulator }
    }

    pub fn network(&self) -> Network {
        self.planner.network()
    }

    pub fn planner(&self) -> &SorRoutingPlanner<R> {
        &self.planner
    }

    /// Refreshes the router's pools, from `pools` if given, else from its own source.
    ///
    /// Returns `false` if the refresh failed. The previous pools remain in use.
    pub async fn fetch_pools(&self, pools: Vec<Pool>, is_on_chain: bool) -> bool {
        self.planner
            .refresh_pools(pools, is_on_chain)
            .await
    }

    /// Simulates `batch` against the Vault and returns one delta per asset.
    pub async fn query_batch_swap(&self, batch: &BatchSwap) -> Result<AssetDeltas, SwapsError> {
        self.simulator
            .simulate(batch.kind, &batch.swaps, &batch.assets)
            .await
    }

    /// Routes the requested pairs and simulates the resulting batch.
    #[instrument(skip_all, fields(swap_type = %input.swap_type))]
    pub async fn query_batch_swap_with_sor(
        &self,
        input: &QueryWithSorInput,
    ) -> Result<QueryWithSorOutput, SwapsError> {
        let batch = self
            .planner
            .plan_route(
                &input.tokens_in,
                &input.tokens_out,
                input.swap_type,
                &input.amounts,
                input.fetch_pools,
            )
            .await?;
        let deltas = self.query_batch_swap(&batch).await?;

        Ok(QueryWithSorOutput { swaps: batch.swaps, assets: batch.assets, deltas })
    }
}

impl<R, C> SwapsService<R, C> {
    /// Converts simulated deltas into limits. See [`compute_limits`].
    ///
    /// Needs no service instance or collaborator bounds; call it through an alias such as
    /// [`DefaultSwapsService`].
    pub fn get_limits_for_slippage(
        tokens_in: &[Address],
        tokens_out: &[Address],
        swap_type: SwapKind,
        deltas: &[I256],
        assets: &[Address],
        slippage: Slippage,
    ) -> Result<Limits, SwapsError> {
        compute_limits(tokens_in, tokens_out, swap_type, deltas, assets, slippage)
    }
}
