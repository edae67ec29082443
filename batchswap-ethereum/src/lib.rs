#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod errors;
pub mod rpc;
pub mod vault;

pub use errors::{RPCError, RequestError};
pub use rpc::EthereumRpcClient;
pub use vault::query::BatchSwapQuerySimulator;
