use std::sync::Arc;

use async_trait::async_trait;
use batchswap_common::{
    models::{Pool, SorRoute, SwapKind, SwapStep},
    traits::SorRouter,
    Address, U256,
};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace};

use super::source::{PoolDataSource, PoolSourceError};

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Failed to load pools: {0}")]
    PoolSource(#[from] PoolSourceError),
    #[error("Pools were never loaded")]
    PoolsNotLoaded,
}

/// Router ranking candidate paths by pool liquidity.
///
/// A pair is routed through the deepest pool holding both tokens. Without such a pool the router
/// looks for a two hop path through any intermediate token and picks the one whose shallower pool
/// is deepest. The swap amount does not influence the choice.
///
/// The pool cache is shared between concurrent `get_route` calls; refreshes are serialized.
#[derive(Debug)]
pub struct LiquidityRouter<S> {
    source: S,
    pools: RwLock<Option<Arc<Vec<Pool>>>>,
    refresh: Mutex<()>,
}

impl<S: PoolDataSource> LiquidityRouter<S> {
    pub fn new(source: S) -> Self {
        Self { source, pools: RwLock::new(None), refresh: Mutex::new(()) }
    }

    /// Number of cached pools, `None` if pools were never loaded.
    pub async fn pool_count(&self) -> Option<usize> {
        self.pools
            .read()
            .await
            .as_ref()
            .map(|pools| pools.len())
    }

    async fn install(&self, pools: Vec<Pool>) {
        info!(n_pools = pools.len(), "Installing pool snapshot");
        *self.pools.write().await = Some(Arc::new(pools));
    }
}

fn deepest_pool<'a>(
    pools: &'a [Pool],
    token_a: &Address,
    token_b: &Address,
    exclude: Option<&Pool>,
) -> Option<&'a Pool> {
    pools
        .iter()
        .filter(|p| p.contains(token_a) && p.contains(token_b))
        .filter(|p| exclude.is_none_or(|e| e.id != p.id))
        .reduce(|best, pool| if pool.liquidity() > best.liquidity() { pool } else { best })
}

fn find_route(
    pools: &[Pool],
    token_in: Address,
    token_out: Address,
    kind: SwapKind,
    amount: U256,
) -> Option<SorRoute> {
    if let Some(pool) = deepest_pool(pools, &token_in, &token_out, None) {
        trace!(pool = %pool.id, "Direct route");
        return Some(SorRoute {
            swaps: vec![SwapStep::new(pool.id, 0, 1, amount)],
            token_addresses: vec![token_in, token_out],
        });
    }

    let mut best: Option<(f64, &Pool, Address, &Pool)> = None;
    for first in pools
        .iter()
        .filter(|p| p.contains(&token_in))
    {
        // a pool's own BPT is not a useful hop
        for hop in first
            .token_addresses()
            .filter(|t| **t != token_in && **t != token_out && **t != first.address)
        {
            let Some(second) = deepest_pool(pools, hop, &token_out, Some(first)) else {
                continue;
            };
            let depth = first
                .liquidity()
                .min(second.liquidity());
            if best
                .as_ref()
                .is_none_or(|(d, ..)| depth > *d)
            {
                best = Some((depth, first, *hop, second));
            }
        }
    }

    let (_, first, hop, second) = best?;
    trace!(first = %first.id, %hop, second = %second.id, "Two hop route");
    // GivenOut batches are built from the output backwards
    let swaps = match kind {
        SwapKind::GivenIn => vec![
            SwapStep::new(first.id, 0, 1, amount),
            SwapStep::new(second.id, 1, 2, U256::ZERO),
        ],
        SwapKind::GivenOut => vec![
            SwapStep::new(second.id, 1, 2, amount),
            SwapStep::new(first.id, 0, 1, U256::ZERO),
        ],
    };
    Some(SorRoute { swaps, token_addresses: vec![token_in, hop, token_out] })
}

#[async_trait]
impl<S: PoolDataSource> SorRouter for LiquidityRouter<S> {
    type Error = RouterError;

    #[instrument(skip(self, pools), fields(n_pools = pools.len()))]
    async fn fetch_pools(&self, pools: Vec<Pool>, is_on_chain: bool) -> Result<(), RouterError> {
        let _guard = self.refresh.lock().await;

        if !pools.is_empty() {
            self.install(pools).await;
            return Ok(());
        }
        if !is_on_chain && self.pools.read().await.is_some() {
            debug!("Serving cached pools");
            return Ok(());
        }

        let pools = self.source.fetch_pools().await?;
        self.install(pools).await;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_route(
        &self,
        token_in: Address,
        token_out: Address,
        kind: SwapKind,
        amount: U256,
    ) -> Result<Option<SorRoute>, RouterError> {
        let pools = self
            .pools
            .read()
            .await
            .clone()
            .ok_or(RouterError::PoolsNotLoaded)?;

        let route = find_route(&pools, token_in, token_out, kind, amount);
        if route.is_none() {
            debug!("No route found");
        }
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use batchswap_common::{models::PoolToken, B256};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::sor::source::MockPoolDataSource;

    const BAL: Address = Address::repeat_byte(0x01);
    const WETH: Address = Address::repeat_byte(0x02);
    const USDC: Address = Address::repeat_byte(0x03);
    const DAI: Address = Address::repeat_byte(0x04);

    fn pool(id: u8, liquidity: &str, tokens: &[Address]) -> Pool {
        Pool {
            id: B256::repeat_byte(id),
            address: Address::repeat_byte(0xf0 | id),
            pool_type: "Weighted".to_string(),
            total_liquidity: liquidity.to_string(),
            tokens: tokens
                .iter()
                .map(|t| PoolToken { address: *t, decimals: 18, balance: "1".to_string() })
                .collect(),
        }
    }

    async fn router_with(pools: Vec<Pool>) -> LiquidityRouter<MockPoolDataSource> {
        let mut source = MockPoolDataSource::new();
        source.expect_fetch_pools().times(0);
        let router = LiquidityRouter::new(source);
        router
            .fetch_pools(pools, true)
            .await
            .unwrap();
        router
    }

    #[tokio::test]
    async fn test_fetch_pools_from_source() {
        let mut source = MockPoolDataSource::new();
        source
            .expect_fetch_pools()
            .times(1)
            .returning(|| Ok(vec![pool(1, "10", &[BAL, WETH])]));
        let router = LiquidityRouter::new(source);

        router
            .fetch_pools(vec![], true)
            .await
            .unwrap();

        assert_eq!(router.pool_count().await, Some(1));
    }

    #[rstest]
    #[case::stale_allowed(false, 1)]
    #[case::fresh_required(true, 2)]
    #[tokio::test]
    async fn test_warm_cache_refresh(#[case] is_on_chain: bool, #[case] expected_fetches: usize) {
        let mut source = MockPoolDataSource::new();
        source
            .expect_fetch_pools()
            .times(expected_fetches)
            .returning(|| Ok(vec![pool(1, "10", &[BAL, WETH])]));
        let router = LiquidityRouter::new(source);

        router
            .fetch_pools(vec![], true)
            .await
            .unwrap();
        router
            .fetch_pools(vec![], is_on_chain)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cold_cache_always_fetches() {
        let mut source = MockPoolDataSource::new();
        source
            .expect_fetch_pools()
            .times(1)
            .returning(|| Ok(vec![]));
        let router = LiquidityRouter::new(source);

        router
            .fetch_pools(vec![], false)
            .await
            .unwrap();

        assert_eq!(router.pool_count().await, Some(0));
    }

    #[tokio::test]
    async fn test_fetch_pools_source_error() {
        let mut source = MockPoolDataSource::new();
        source
            .expect_fetch_pools()
            .times(1)
            .returning(|| Err(PoolSourceError::ServerUnreachable("down".to_string())));
        let router = LiquidityRouter::new(source);

        let res = router.fetch_pools(vec![], true).await;

        assert!(matches!(res, Err(RouterError::PoolSource(_))));
        assert_eq!(router.pool_count().await, None);
    }

    #[tokio::test]
    async fn test_get_route_before_loading_pools() {
        let router = LiquidityRouter::new(MockPoolDataSource::new());

        let res = router
            .get_route(BAL, WETH, SwapKind::GivenIn, U256::from(1))
            .await;

        assert!(matches!(res, Err(RouterError::PoolsNotLoaded)));
    }

    #[tokio::test]
    async fn test_direct_route_prefers_deepest_pool() {
        let router = router_with(vec![
            pool(1, "1000", &[BAL, WETH]),
            pool(2, "5000.5", &[BAL, WETH, USDC]),
            pool(3, "9999999", &[USDC, DAI]),
        ])
        .await;

        let route = router
            .get_route(BAL, WETH, SwapKind::GivenIn, U256::from(100))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            route,
            SorRoute {
                swaps: vec![SwapStep::new(B256::repeat_byte(2), 0, 1, U256::from(100))],
                token_addresses: vec![BAL, WETH],
            }
        );
    }

    #[tokio::test]
    async fn test_two_hop_route_given_in() {
        let router = router_with(vec![
            pool(1, "1000", &[BAL, WETH]),
            pool(2, "50", &[BAL, DAI]),
            pool(3, "2000", &[WETH, USDC]),
            pool(4, "2000", &[DAI, USDC]),
        ])
        .await;

        let route = router
            .get_route(BAL, USDC, SwapKind::GivenIn, U256::from(7))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(route.token_addresses, vec![BAL, WETH, USDC]);
        assert_eq!(
            route.swaps,
            vec![
                SwapStep::new(B256::repeat_byte(1), 0, 1, U256::from(7)),
                SwapStep::new(B256::repeat_byte(3), 1, 2, U256::ZERO),
            ]
        );
    }

    #[tokio::test]
    async fn test_two_hop_route_given_out_starts_from_output() {
        let router =
            router_with(vec![pool(1, "1000", &[BAL, WETH]), pool(3, "2000", &[WETH, USDC])]).await;

        let route = router
            .get_route(BAL, USDC, SwapKind::GivenOut, U256::from(7))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(route.token_addresses, vec![BAL, WETH, USDC]);
        assert_eq!(
            route.swaps,
            vec![
                SwapStep::new(B256::repeat_byte(3), 1, 2, U256::from(7)),
                SwapStep::new(B256::repeat_byte(1), 0, 1, U256::ZERO),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_route() {
        let router =
            router_with(vec![pool(1, "1000", &[BAL, WETH]), pool(2, "1000", &[USDC, DAI])]).await;

        let route = router
            .get_route(BAL, DAI, SwapKind::GivenIn, U256::from(1))
            .await
            .unwrap();

        assert_eq!(route, None);
    }

    #[tokio::test]
    async fn test_hop_skips_pool_token() {
        // pool 1 lists its own BPT, which is also held by pool 2
        let mut nested = pool(1, "1000", &[BAL, WETH]);
        nested.tokens.push(PoolToken {
            address: nested.address,
            decimals: 18,
            balance: "1".to_string(),
        });
        let bpt = nested.address;
        let router = router_with(vec![nested, pool(2, "1000", &[bpt, USDC])]).await;

        let route = router
            .get_route(BAL, USDC, SwapKind::GivenIn, U256::from(1))
            .await
            .unwrap();

        assert_eq!(route, None);
    }
}
