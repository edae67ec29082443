use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// The Vault is deployed through a deterministic factory, so it shares one address on every
/// supported network.
pub const VAULT_ADDRESS: Address = address!("0xBA12222222228d8Ba445958a75a0704d566BF2C8");

/// Networks with a deployed Vault.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Network {
    #[default]
    #[strum(to_string = "ethereum", serialize = "mainnet")]
    Ethereum,
    Polygon,
    Arbitrum,
    Gnosis,
    Optimism,
    Base,
    Avalanche,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Polygon => 137,
            Network::Arbitrum => 42161,
            Network::Gnosis => 100,
            Network::Optimism => 10,
            Network::Base => 8453,
            Network::Avalanche => 43114,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Network::Ethereum),
            137 => Some(Network::Polygon),
            42161 => Some(Network::Arbitrum),
            100 => Some(Network::Gnosis),
            10 => Some(Network::Optimism),
            8453 => Some(Network::Base),
            43114 => Some(Network::Avalanche),
            _ => None,
        }
    }

    pub fn vault_address(&self) -> Address {
        VAULT_ADDRESS
    }

    /// ERC20 wrapper of the native asset. Routing engines only know pools of ERC20 tokens, so
    /// native asset swaps are routed through this token.
    pub fn wrapped_native(&self) -> Address {
        match self {
            Network::Ethereum => address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            Network::Polygon => address!("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
            Network::Arbitrum => address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
            Network::Gnosis => address!("0xe91D153E0b41518A2Ce8Dd3D7944Fa863463a97d"),
            Network::Optimism | Network::Base => {
                address!("0x4200000000000000000000000000000000000006")
            }
            Network::Avalanche => address!("0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case("ethereum", Network::Ethereum)]
    #[case("mainnet", Network::Ethereum)]
    #[case("Polygon", Network::Polygon)]
    #[case("ARBITRUM", Network::Arbitrum)]
    #[case("base", Network::Base)]
    fn test_parse_network(#[case] raw: &str, #[case] expected: Network) {
        assert_eq!(Network::from_str(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_network() {
        assert!(Network::from_str("solana").is_err());
    }

    #[test]
    fn test_display_is_canonical_name() {
        assert_eq!(Network::Ethereum.to_string(), "ethereum");
        assert_eq!(Network::Avalanche.to_string(), "avalanche");
    }

    #[test]
    fn test_chain_id_roundtrip() {
        for network in Network::iter() {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(Network::from_chain_id(5), None);
    }

    #[test]
    fn test_wrapped_native_is_never_the_sentinel() {
        for network in Network::iter() {
            assert_ne!(network.wrapped_native(), crate::models::NATIVE_ASSET);
        }
    }
}
