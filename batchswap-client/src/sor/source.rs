//! # Pool data sources
//!
//! Pools are loaded from a GraphQL endpoint exposing the Vault's pools (e.g. a subgraph), one
//! page at a time with an `id_gt` cursor.
//! Transient failures (rate limiting, unavailable gateways) are retried with exponential backoff;
//! anything else fails immediately.
use std::time::Duration;

use async_trait::async_trait;
use backoff::{exponential::ExponentialBackoffBuilder, ExponentialBackoff};
use batchswap_common::models::Pool;
#[cfg(test)]
use mockall::automock;
use reqwest::{header, Client, ClientBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::config::ExponentialRetryConfiguration;

const POOLS_QUERY: &str = r#"
query Pools($first: Int!, $lastId: ID!, $minLiquidity: BigDecimal!) {
  pools(
    first: $first
    orderBy: id
    orderDirection: asc
    where: { id_gt: $lastId, swapEnabled: true, totalLiquidity_gt: $minLiquidity }
  ) {
    id
    address
    poolType
    totalLiquidity
    tokens {
      address
      decimals
      balance
    }
  }
}
"#;

#[derive(Error, Debug)]
pub enum PoolSourceError {
    /// The pool source url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    UrlParsing(String, String),

    /// Errors forwarded from the HTTP protocol.
    #[error("Unexpected HTTP client error: {0}")]
    HttpClient(String, #[source] reqwest::Error),

    /// The endpoint answered with a non retryable status.
    #[error("Unexpected HTTP status {0}: {1}")]
    HttpStatus(u16, String),

    /// The response from the server could not be parsed correctly.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),

    /// The GraphQL endpoint rejected the query.
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Option<Duration>),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

/// Source of the pool snapshot used by a router.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PoolDataSource: Send + Sync {
    async fn fetch_pools(&self) -> Result<Vec<Pool>, PoolSourceError>;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<PoolsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct PoolsData {
    pools: Vec<Pool>,
}

#[derive(Debug, Clone)]
pub struct HttpPoolSource {
    http_client: Client,
    url: Url,
    page_size: u32,
    min_liquidity: String,
    backoff_policy: ExponentialBackoff,
}

impl HttpPoolSource {
    pub fn new(url: &str, retry: &ExponentialRetryConfiguration) -> Result<Self, PoolSourceError> {
        let uri = url
            .parse::<Url>()
            .map_err(|e| PoolSourceError::UrlParsing(url.to_string(), e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let user_agent = format!("batchswap-client-{version}", version = env!("CARGO_PKG_VERSION"));

        let client = ClientBuilder::new()
            .default_headers(headers)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PoolSourceError::HttpClient(e.to_string(), e))?;

        Ok(Self {
            http_client: client,
            url: uri,
            page_size: 1000,
            min_liquidity: "0".to_string(),
            backoff_policy: retry.to_backoff(),
        })
    }

    /// Number of pools requested per page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Pools at or below this USD liquidity are not requested.
    pub fn with_min_liquidity(mut self, min_liquidity: impl Into<String>) -> Self {
        self.min_liquidity = min_liquidity.into();
        self
    }

    #[cfg(test)]
    pub fn with_test_backoff_policy(mut self) -> Self {
        self.backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_multiplier(1.1)
            .with_max_interval(Duration::from_millis(5))
            .with_max_elapsed_time(Some(Duration::from_millis(50)))
            .build();
        self
    }

    /// Converts an error response to a Result.
    ///
    /// 429, 502, 503 and 504 are reported as transient errors, any other non success status as
    /// a permanent one.
    async fn error_for_response(&self, response: Response) -> Result<Response, PoolSourceError> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(PoolSourceError::RateLimited(retry_after))
            }
            StatusCode::BAD_GATEWAY |
            StatusCode::SERVICE_UNAVAILABLE |
            StatusCode::GATEWAY_TIMEOUT => Err(PoolSourceError::ServerUnreachable(
                response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Server Unreachable".to_string()),
            )),
            status if !status.is_success() => Err(PoolSourceError::HttpStatus(
                status.as_u16(),
                response
                    .text()
                    .await
                    .unwrap_or_default(),
            )),
            _ => Ok(response),
        }
    }

    fn handle_error_for_backoff(e: PoolSourceError) -> backoff::Error<PoolSourceError> {
        match e {
            PoolSourceError::RateLimited(Some(duration)) => {
                backoff::Error::retry_after(e, duration)
            }
            PoolSourceError::RateLimited(None) | PoolSourceError::ServerUnreachable(_) => {
                backoff::Error::transient(e)
            }
            _ => backoff::Error::permanent(e),
        }
    }

    async fn make_post_request(
        &self,
        body: &serde_json::Value,
    ) -> Result<Response, PoolSourceError> {
        backoff::future::retry_notify(
            self.backoff_policy.clone(),
            || async {
                let response = self
                    .http_client
                    .post(self.url.clone())
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| PoolSourceError::HttpClient(e.to_string(), e))?;
                self.error_for_response(response)
                    .await
                    .map_err(Self::handle_error_for_backoff)
            },
            |e: PoolSourceError, next: Duration| {
                warn!(error = %e, retry_in = ?next, "Pool source request failed, retrying")
            },
        )
        .await
    }

    async fn fetch_page(&self, last_id: &serde_json::Value) -> Result<Vec<Pool>, PoolSourceError> {
        let request = json!({
            "query": POOLS_QUERY,
            "variables": {
                "first": self.page_size,
                "lastId": last_id,
                "minLiquidity": self.min_liquidity,
            },
        });
        trace!(%last_id, "Requesting pool page");
        let response = self.make_post_request(&request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| PoolSourceError::ParseResponse(e.to_string()))?;
        let parsed = serde_json::from_str::<GraphQlResponse>(&body)
            .map_err(|err| PoolSourceError::ParseResponse(format!("Error: {err}, Body: {body}")))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect();
            return Err(PoolSourceError::Query(messages.join("; ")));
        }
        Ok(parsed
            .data
            .ok_or_else(|| PoolSourceError::ParseResponse("Response carries no data".to_string()))?
            .pools)
    }
}

#[async_trait]
impl PoolDataSource for HttpPoolSource {
    /// Requests pages ordered by id until a page comes back short.
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_pools(&self) -> Result<Vec<Pool>, PoolSourceError> {
        debug!("Requesting pools");
        let mut pools = Vec::new();
        let mut last_id = json!("");
        loop {
            let page = self.fetch_page(&last_id).await?;
            let n_page = page.len();
            if let Some(last) = page.last() {
                last_id = json!(last.id);
            }
            pools.extend(page);
            if n_page < self.page_size as usize {
                break;
            }
        }
        trace!(?pools, "Received pools");
        debug!(n_pools = pools.len(), "Fetched pools");
        Ok(pools)
    }
}
