use std::time::Duration;

use backoff::{exponential::ExponentialBackoffBuilder, ExponentialBackoff};
use batchswap_common::{
    models::{Network, SwapsError},
    Address,
};
use reqwest::Url;

/// Backoff policy for requests to the pool data source.
///
/// Only the pool source is retried. Static calls against the Vault fail fast.
#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialRetryConfiguration {
    initial_interval: Duration,
    randomization_factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
}

impl ExponentialRetryConfiguration {
    pub fn new(
        initial_interval: Duration,
        randomization_factor: f64,
        multiplier: f64,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
    ) -> Self {
        Self { initial_interval, randomization_factor, multiplier, max_interval, max_elapsed_time }
    }

    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_randomization_factor(self.randomization_factor)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(self.max_elapsed_time)
            .build()
    }
}

impl Default for ExponentialRetryConfiguration {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(250),
            randomization_factor: 0.5,
            // increase backoff time by 75% each failure
            multiplier: 1.75,
            max_interval: Duration::from_secs(30),
            // if all retries take longer than 2m, give up
            max_elapsed_time: Some(Duration::from_secs(125)),
        }
    }
}

/// Settings needed to wire a [`crate::SwapsService`] for one network.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapsConfig {
    pub network: Network,
    /// JSON-RPC endpoint used for static calls.
    pub rpc_url: String,
    /// GraphQL endpoint serving the pool snapshot.
    pub pools_url: String,
    /// Overrides the network's canonical Vault deployment.
    pub vault: Option<Address>,
    /// Pools at or below this USD liquidity are not loaded. Decimal string.
    pub min_liquidity: String,
    pub retry: ExponentialRetryConfiguration,
}

impl SwapsConfig {
    pub fn new(network: Network, rpc_url: impl Into<String>, pools_url: impl Into<String>) -> Self {
        Self {
            network,
            rpc_url: rpc_url.into(),
            pools_url: pools_url.into(),
            vault: None,
            min_liquidity: "0".to_string(),
            retry: ExponentialRetryConfiguration::default(),
        }
    }

    pub fn with_vault(mut self, vault: Address) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn with_min_liquidity(mut self, min_liquidity: impl Into<String>) -> Self {
        self.min_liquidity = min_liquidity.into();
        self
    }

    pub fn with_retry(mut self, retry: ExponentialRetryConfiguration) -> Self {
        self.retry = retry;
        self
    }

    pub fn vault_address(&self) -> Address {
        self.vault
            .unwrap_or_else(|| self.network.vault_address())
    }

    /// Checks that both endpoints are absolute http(s) URLs.
    pub fn validate(&self) -> Result<(), SwapsError> {
        check_http_url("rpc_url", &self.rpc_url)?;
        check_http_url("pools_url", &self.pools_url)?;
        if self.vault == Some(Address::ZERO) {
            return Err(SwapsError::Config("vault address must not be zero".to_string()));
        }
        if !self
            .min_liquidity
            .parse::<f64>()
            .is_ok_and(|v| v.is_finite() && v >= 0.0)
        {
            return Err(SwapsError::Config(format!(
                "Invalid min_liquidity '{}': expected a non negative decimal",
                self.min_liquidity
            )));
        }
        Ok(())
    }
}

fn check_http_url(name: &str, raw: &str) -> Result<(), SwapsError> {
    let url = raw
        .parse::<Url>()
        .map_err(|e| SwapsError::Config(format!("Invalid {name} '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(SwapsError::Config(format!(
            "Invalid {name} '{raw}': unsupported scheme {scheme}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use batchswap_common::models::network::VAULT_ADDRESS;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_vault_is_network_deployment() {
        let config = SwapsConfig::new(Network::Polygon, "http://localhost:8545", "http://pools");

        assert_eq!(config.vault_address(), VAULT_ADDRESS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vault_override() {
        let vault = Address::repeat_byte(0x11);
        let config = SwapsConfig::new(Network::Ethereum, "http://localhost:8545", "http://pools")
            .with_vault(vault);

        assert_eq!(config.vault_address(), vault);
    }

    #[rstest]
    #[case::bad_rpc("localhost:8545", "https://pools.example.com")]
    #[case::ws_rpc("ws://localhost:8545", "https://pools.example.com")]
    #[case::bad_pools("http://localhost:8545", "not a url")]
    fn test_validate_rejects_urls(#[case] rpc_url: &str, #[case] pools_url: &str) {
        let config = SwapsConfig::new(Network::Ethereum, rpc_url, pools_url);

        assert!(matches!(config.validate(), Err(SwapsError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_vault() {
        let config = SwapsConfig::new(Network::Ethereum, "http://localhost:8545", "http://pools")
            .with_vault(Address::ZERO);

        assert!(matches!(config.validate(), Err(SwapsError::Config(_))));
    }

    #[test]
    fn test_retry_configuration_to_backoff() {
        let retry = ExponentialRetryConfiguration::new(
            Duration::from_millis(10),
            0.0,
            2.0,
            Duration::from_millis(40),
            Some(Duration::from_secs(1)),
        );

        let backoff = retry.to_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(10));
        assert_eq!(backoff.multiplier, 2.0);
        assert_eq!(backoff.max_interval, Duration::from_millis(40));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(1)));
    }

    #[rstest]
    #[case::negative("-1")]
    #[case::not_a_number("lots")]
    fn test_validate_rejects_min_liquidity(#[case] min_liquidity: &str) {
        let config = SwapsConfig::new(Network::Ethereum, "http://localhost:8545", "http://pools")
            .with_min_liquidity(min_liquidity);

        assert!(matches!(config.validate(), Err(SwapsError::Config(_))));
    }
}
