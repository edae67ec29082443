//! ABI bindings and helpers for the Balancer V2 Vault.

pub mod query;

use alloy::{
    core::sol,
    primitives::{Address, Bytes, I256, U256},
    sol_types::SolCall,
};
use batchswap_common::models::{SwapKind, SwapStep};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct BatchSwapStep {
        bytes32 poolId;
        uint256 assetInIndex;
        uint256 assetOutIndex;
        uint256 amount;
        bytes userData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct FundManagement {
        address sender;
        bool fromInternalBalance;
        address payable recipient;
        bool toInternalBalance;
    }

    function queryBatchSwap(
        uint8 kind,
        BatchSwapStep[] swaps,
        address[] assets,
        FundManagement funds
    ) external returns (int256[] assetDeltas);
}

impl From<&SwapStep> for BatchSwapStep {
    fn from(step: &SwapStep) -> Self {
        Self {
            poolId: step.pool_id,
            assetInIndex: U256::from(step.asset_in_index),
            assetOutIndex: U256::from(step.asset_out_index),
            amount: step.amount,
            userData: step.user_data.clone(),
        }
    }
}

impl FundManagement {
    /// Funds argument for queries. The Vault ignores it when simulating, so every field is
    /// zeroed.
    pub fn query_placeholder() -> Self {
        Self {
            sender: Address::ZERO,
            fromInternalBalance: false,
            recipient: Address::ZERO,
            toInternalBalance: false,
        }
    }
}

/// Encode queryBatchSwap call with a zeroed funds argument.
pub fn encode_query_batch_swap(kind: SwapKind, swaps: &[SwapStep], assets: &[Address]) -> Bytes {
    queryBatchSwapCall {
        kind: kind.into(),
        swaps: swaps.iter().map(BatchSwapStep::from).collect(),
        assets: assets.to_vec(),
        funds: FundManagement::query_placeholder(),
    }
    .abi_encode()
    .into()
}

/// Decode queryBatchSwap return value
pub fn decode_asset_deltas(data: &[u8]) -> Result<Vec<I256>, alloy::sol_types::Error> {
    queryBatchSwapCall::abi_decode_returns(data)
}

/// Looks up a human readable description for a `BAL#xxx` code contained in a revert reason.
pub fn describe_vault_error(reason: &str) -> Option<&'static str> {
    let start = reason.find("BAL#")? + 4;
    let code = reason.get(start..start + 3)?;
    let description = match code {
        "000" => "addition overflow",
        "001" => "subtraction overflow",
        "002" => "subtraction underflow",
        "003" => "multiplication overflow",
        "004" => "zero division",
        "100" => "out of bounds",
        "101" => "unsorted array",
        "102" => "unsorted tokens",
        "103" => "input length mismatch",
        "104" => "zero token",
        "304" => "max in ratio",
        "305" => "max out ratio",
        "500" => "invalid pool id",
        "507" => "swap limit",
        "508" => "swap deadline",
        "509" => "cannot swap same token",
        "510" => "unknown amount in first swap",
        "511" => "malconstructed multihop swap",
        "513" => "insufficient ETH",
        "516" => "exit below min",
        "519" => "token not registered",
        "521" => "token already registered",
        "527" => "insufficient internal balance",
        _ => return None,
    };
    Some(description)
}
