use alloy::primitives::{Address, I256};
use batchswap_common::{
    models::{validate_swap_indices, AssetDeltas, SwapKind, SwapStep, SwapsError},
    traits::StaticCallExecutor,
};
use tracing::{debug, instrument, warn};

use super::{decode_asset_deltas, describe_vault_error, encode_query_batch_swap};

/// Dry-runs batch swaps through the Vault's `queryBatchSwap` using a static call.
///
/// Each simulation issues at most one call. Failures are reported as
/// [`SwapsError::Simulation`] and never retried.
#[derive(Debug, Clone)]
pub struct BatchSwapQuerySimulator<C> {
    executor: C,
    vault: Address,
}

impl<C: StaticCallExecutor> BatchSwapQuerySimulator<C> {
    pub fn new(executor: C, vault: Address) -> Self {
        Self { executor, vault }
    }

    pub fn executor(&self) -> &C {
        &self.executor
    }

    /// Returns the net asset deltas of executing `swaps`, one entry per asset in `assets`.
    ///
    /// Positive deltas are paid to the Vault, negative deltas are paid out by it.
    #[instrument(
        level = "debug",
        skip_all,
        fields(%kind, n_swaps = swaps.len(), n_assets = assets.len())
    )]
    pub async fn simulate(
        &self,
        kind: SwapKind,
        swaps: &[SwapStep],
        assets: &[Address],
    ) -> Result<AssetDeltas, SwapsError> {
        validate_swap_indices(swaps, assets.len())?;

        if swaps.is_empty() {
            debug!("No swaps to simulate");
            return Ok(vec![I256::ZERO; assets.len()]);
        }

        let calldata = encode_query_batch_swap(kind, swaps, assets);
        let output = self
            .executor
            .static_call(self.vault, calldata)
            .await
            .map_err(|e| {
                let reason = e.to_string();
                warn!(%reason, "queryBatchSwap failed");
                match describe_vault_error(&reason) {
                    Some(name) => SwapsError::Simulation(format!("{reason} ({name})")),
                    None => SwapsError::Simulation(reason),
                }
            })?;

        let deltas = decode_asset_deltas(&output).map_err(|e| {
            SwapsError::Simulation(format!("Failed to decode queryBatchSwap output: {e}"))
        })?;

        if deltas.len() != assets.len() {
            return Err(SwapsError::Simulation(format!(
                "Vault returned {} deltas for {} assets",
                deltas.len(),
                assets.len()
            )));
        }

        debug!(?deltas, "Simulated batch swap");
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{address, Bytes, B256, U256},
        sol_types::{SolCall, SolValue},
    };
    use batchswap_common::traits::MockStaticCallExecutor;
    use mockall::predicate::eq;
    use rstest::rstest;
    use tracing_test::traced_test;

    use super::*;
    use crate::vault::queryBatchSwapCall;

    const VAULT: Address = address!("ba12222222228d8ba445958a75a0704d566bf2c8");
    const BAL: Address = address!("ba100000625a3754423978a60c9317c58a424e3d");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

    fn i256(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    fn single_hop() -> Vec<SwapStep> {
        vec![SwapStep::new(B256::repeat_byte(7), 0, 1, U256::from(100))]
    }

    #[tokio::test]
    async fn test_simulate_returns_decoded_deltas() {
        let mut executor = MockStaticCallExecutor::new();
        executor
            .expect_static_call()
            .withf(|to, calldata| {
                let call = queryBatchSwapCall::abi_decode(calldata).unwrap();
                *to == VAULT && call.kind == 0 && call.assets == vec![BAL, WETH]
            })
            .times(1)
            .returning(|_, _| Ok(Bytes::from(vec![i256(100), i256(-97)].abi_encode())));
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);

        let deltas = simulator
            .simulate(SwapKind::GivenIn, &single_hop(), &[BAL, WETH])
            .await
            .unwrap();

        assert_eq!(deltas, vec![i256(100), i256(-97)]);
    }

    #[rstest]
    #[case::no_assets(vec![])]
    #[case::two_assets(vec![BAL, WETH])]
    #[tokio::test]
    async fn test_simulate_empty_swaps_skips_call(#[case] assets: Vec<Address>) {
        let mut executor = MockStaticCallExecutor::new();
        executor.expect_static_call().times(0);
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);

        let deltas = simulator
            .simulate(SwapKind::GivenOut, &[], &assets)
            .await
            .unwrap();

        assert_eq!(deltas, vec![I256::ZERO; assets.len()]);
    }

    #[tokio::test]
    async fn test_simulate_rejects_out_of_bounds_index() {
        let mut executor = MockStaticCallExecutor::new();
        executor.expect_static_call().times(0);
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);
        let swaps = vec![SwapStep::new(B256::ZERO, 0, 2, U256::from(1))];

        let res = simulator
            .simulate(SwapKind::GivenIn, &swaps, &[BAL, WETH])
            .await;

        assert!(matches!(res, Err(SwapsError::InvalidInput(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_simulate_names_vault_error_on_revert() {
        let mut executor = MockStaticCallExecutor::new();
        executor
            .expect_static_call()
            .with(eq(VAULT), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Err("Execution reverted: BAL#507".to_string()));
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);

        let res = simulator
            .simulate(SwapKind::GivenIn, &single_hop(), &[BAL, WETH])
            .await;

        assert_eq!(
            res,
            Err(SwapsError::Simulation("Execution reverted: BAL#507 (swap limit)".to_string()))
        );
        assert!(logs_contain("queryBatchSwap failed"));
    }

    #[rstest]
    #[case::short(vec![i256(100)])]
    #[case::long(vec![i256(100), i256(-97), i256(0)])]
    #[tokio::test]
    async fn test_simulate_rejects_length_mismatch(#[case] returned: Vec<I256>) {
        let mut executor = MockStaticCallExecutor::new();
        let encoded = Bytes::from(returned.abi_encode());
        executor
            .expect_static_call()
            .times(1)
            .returning(move |_, _| Ok(encoded.clone()));
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);

        let res = simulator
            .simulate(SwapKind::GivenIn, &single_hop(), &[BAL, WETH])
            .await;

        assert!(matches!(res, Err(SwapsError::Simulation(_))));
    }

    #[tokio::test]
    async fn test_simulate_rejects_malformed_output() {
        let mut executor = MockStaticCallExecutor::new();
        executor
            .expect_static_call()
            .times(1)
            .returning(|_, _| Ok(Bytes::from(vec![0x00, 0x01])));
        let simulator = BatchSwapQuerySimulator::new(executor, VAULT);

        let res = simulator
            .simulate(SwapKind::GivenIn, &single_hop(), &[BAL, WETH])
            .await;

        assert!(matches!(res, Err(SwapsError::Simulation(msg)) if msg.contains("decode")));
    }
}
