use thiserror::Error;

/// Errors surfaced by the public batch swap operations.
///
/// Input validation errors (`InvalidInput`, `InvalidSlippage`) are always raised before any
/// network I/O takes place. `Simulation` errors are never retried internally: a revert means the
/// requested swap is infeasible at the current chain state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid slippage: {0}")]
    InvalidSlippage(String),
    #[error("Simulation failed: {0}")]
    Simulation(String),
    #[error("Routing failed: {0}")]
    Routing(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
