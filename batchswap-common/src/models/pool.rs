use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Snapshot of a liquidity pool as served by a pool data source (e.g. a subgraph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: B256,
    pub address: Address,
    #[serde(default)]
    pub pool_type: String,
    /// Liquidity in USD as a decimal string, used to rank candidate pools.
    #[serde(default)]
    pub total_liquidity: String,
    pub tokens: Vec<PoolToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub address: Address,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub balance: String,
}

impl Pool {
    pub fn contains(&self, token: &Address) -> bool {
        self.tokens
            .iter()
            .any(|t| &t.address == token)
    }

    pub fn token_addresses(&self) -> impl Iterator<Item = &Address> {
        self.tokens.iter().map(|t| &t.address)
    }

    /// Parsed `total_liquidity`. Missing or malformed values rank as zero.
    pub fn liquidity(&self) -> f64 {
        self.total_liquidity
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}
