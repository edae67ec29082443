pub mod models;
pub mod serde_primitives;
pub mod traits;

pub use alloy_primitives::{Address, Bytes, B256, I256, U256};
