use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, U64},
    rpc::{
        client::{ClientBuilder, ReqwestClient},
        types::{BlockNumberOrTag, TransactionInput, TransactionRequest},
    },
    transports::http::reqwest,
};
use async_trait::async_trait;
use batchswap_common::traits::StaticCallExecutor;
use tracing::{debug, instrument, trace};

use crate::errors::{RPCError, RpcResultExt};

/// This struct wraps the ReqwestClient and provides the Ethereum RPC methods needed to query the
/// Vault. It is cheap to clone, as the `inner` internally uses an Arc for the ReqwestClient.
///
/// Requests are never retried: a failed static call is reported to the caller immediately.
#[derive(Clone, Debug)]
pub struct EthereumRpcClient {
    inner: ReqwestClient,
    block: BlockNumberOrTag,
    url: String,
}

impl EthereumRpcClient {
    /// Creates a new EthereumRpcClient with the given RPC URL. Calls are executed against the
    /// latest block.
    pub fn new(rpc_url: &str) -> Result<Self, RPCError> {
        let url = rpc_url
            .parse()
            .map_err(|e| RPCError::SetupError(format!("Invalid RPC URL: {}", e)))?;

        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RPCError::SetupError(format!("Failed to create HTTP client: {e}")))?;

        let rpc = ClientBuilder::default().http_with_client(http_client, url);

        Ok(Self { inner: rpc, block: BlockNumberOrTag::Latest, url: rpc_url.to_string() })
    }

    /// Pins static calls to a specific block instead of the latest one.
    pub fn with_block(mut self, block: BlockNumberOrTag) -> Self {
        self.block = block;
        self
    }

    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    pub async fn get_chain_id(&self) -> Result<u64, RPCError> {
        let chain_id: U64 = self
            .inner
            .request_noparams("eth_chainId")
            .await
            .rpc_context("Failed to get chain id")?;

        Ok(chain_id.to::<u64>())
    }

    /// Executes a new message call immediately without creating a transaction on the blockchain.
    /// See https://ethereum.org/en/developers/docs/apis/json-rpc/#eth_call
    ///
    /// Returns the output data from the call or an error if the call failed. Reverts are
    /// reported as [`RPCError::Reverted`].
    #[instrument(level = "debug", skip(self, request), fields(url = %self.url))]
    pub async fn eth_call(
        &self,
        request: TransactionRequest,
        block: BlockNumberOrTag,
    ) -> Result<Bytes, RPCError> {
        trace!(?request, "Sending eth_call");
        self.inner
            .request("eth_call", (&request, block))
            .await
            .with_rpc_context(|| format!("Failed to send an eth_call request for block {block}"))
    }
}

#[async_trait]
impl StaticCallExecutor for EthereumRpcClient {
    type Error = RPCError;

    async fn static_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, RPCError> {
        debug!(%to, calldata_len = calldata.len(), block = %self.block, "Static call");
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::both(calldata));
        self.eth_call(request, self.block)
            .await
    }
}
