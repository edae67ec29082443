use std::{error::Error, fmt::Display};

use alloy::{
    primitives::Bytes,
    sol_types::decode_revert_reason,
    transports::{RpcError as AlloyRpcError, TransportErrorKind},
};
use thiserror::Error;

/// Alloy RPC error type alias for convenience.
pub(crate) type AlloyError = AlloyRpcError<TransportErrorKind>;

#[derive(Error, Debug)]
pub struct TransportError {
    pub msg: String,
    #[source]
    pub source: AlloyError,
}

impl Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.msg, self.source)
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    Transport(TransportError),
}

impl Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Transport(e) => write!(f, "{}: {}", e.msg, e.source),
        }
    }
}

#[derive(Error, Debug)]
pub enum RPCError {
    #[error("RPC setup error: {0}")]
    SetupError(String),
    #[error("Request error: {0}")]
    RequestError(RequestError),
    #[error("Execution reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted { reason: Option<String>, data: Option<Bytes> },
}

impl RPCError {
    /// Converts an alloy error, recognising execution reverts reported by the node.
    pub(crate) fn from_alloy<S: ToString>(msg: S, error: AlloyError) -> Self {
        if let Some(reverted) = Self::revert_from_alloy(&error) {
            return reverted;
        }
        RPCError::RequestError(RequestError::Transport(TransportError {
            msg: msg.to_string(),
            source: error,
        }))
    }

    fn revert_from_alloy(error: &AlloyError) -> Option<Self> {
        let payload = error.as_error_resp()?;
        let data = payload.as_revert_data();
        if data.is_none() && !payload.message.contains("revert") {
            return None;
        }
        let reason = data
            .as_ref()
            .and_then(|d| decode_revert_reason(d))
            .or_else(|| Some(payload.message.to_string()));
        Some(RPCError::Reverted { reason, data })
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}

/// Extension trait for adding RPC context to Results containing Alloy errors.
///
/// Similar to `anyhow::Context`, this trait converts Alloy RPC errors into `RPCError` with a
/// contextual message.
pub(crate) trait RpcResultExt<T> {
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError>;

    /// Wraps the error with lazily-evaluated context.
    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError>;
}

impl<T> RpcResultExt<T> for Result<T, AlloyError> {
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(context.to_string(), e))
    }

    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(f().to_string(), e))
    }
}

/// Helper function to extract the full error chain including source errors
pub fn extract_error_chain(error: &dyn Error) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();

    while let Some(err) = source {
        chain.push(err.to_string());
        source = err.source();
    }

    if chain.len() == 1 {
        chain[0].clone()
    } else {
        format!("{} (caused by: {})", chain[0], chain[1..].join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        rpc::json_rpc::ErrorPayload,
        sol_types::{Revert, SolError},
    };

    use super::*;

    fn error_response(code: i64, message: &'static str, data: Option<&str>) -> AlloyError {
        let data = data.map(|d| serde_json::value::to_raw_value(d).unwrap());
        AlloyRpcError::ErrorResp(ErrorPayload { code, message: message.into(), data })
    }

    #[test]
    fn test_from_alloy_decodes_revert_reason() {
        let revert = Revert { reason: "BAL#507".to_string() }.abi_encode();
        let encoded = alloy::hex::encode_prefixed(&revert);

        let err = RPCError::from_alloy(
            "eth_call failed",
            error_response(3, "execution reverted: BAL#507", Some(&encoded)),
        );

        match err {
            RPCError::Reverted { reason, data } => {
                assert!(reason.unwrap().contains("BAL#507"));
                assert_eq!(data.unwrap().to_vec(), revert);
            }
            other => panic!("expected revert, got {other:?}"),
        }
    }

    #[test]
    fn test_from_alloy_revert_without_data_uses_message() {
        let err = RPCError::from_alloy(
            "eth_call failed",
            error_response(-32000, "execution reverted", None),
        );

        assert!(err.is_revert());
        assert_eq!(err.to_string(), "Execution reverted: execution reverted");
    }

    #[test]
    fn test_from_alloy_keeps_transport_errors() {
        let err = RPCError::from_alloy(
            "eth_call failed",
            AlloyRpcError::Transport(TransportErrorKind::BackendGone),
        );

        assert!(!err.is_revert());
        assert!(matches!(err, RPCError::RequestError(RequestError::Transport(_))));
        assert!(err.to_string().starts_with("Request error: eth_call failed"));
    }

    #[test]
    fn test_extract_error_chain() {
        let err = RPCError::from_alloy(
            "eth_chainId failed",
            AlloyRpcError::Transport(TransportErrorKind::BackendGone),
        );

        let chain = extract_error_chain(&err);

        assert!(chain.starts_with("Request error: eth_chainId failed"));
    }
}
