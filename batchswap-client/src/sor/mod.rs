//! Bundled smart order routing: a pool snapshot source and a liquidity based router.
pub mod router;
pub mod source;

pub use router::{LiquidityRouter, RouterError};
pub use source::{HttpPoolSource, PoolDataSource, PoolSourceError};
