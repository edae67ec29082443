pub mod cli;
pub mod config;
pub mod limits;
pub mod planner;
pub mod service;
pub mod sor;

pub use config::{ExponentialRetryConfiguration, SwapsConfig};
pub use limits::{compute_limits, Slippage, WAD};
pub use planner::{validate_pairs, SorRoutingPlanner};
pub use service::{DefaultSwapsService, SwapsService};
pub use sor::{HttpPoolSource, LiquidityRouter, PoolDataSource, PoolSourceError, RouterError};
