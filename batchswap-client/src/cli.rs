use std::{str::FromStr, time::Duration};

use batchswap_common::{
    models::{
        BatchSwap, FetchPoolsOptions, Network, QueryWithSorInput, QueryWithSorOutput, SwapKind,
    },
    serde_primitives::decimal_vec,
    Address, I256, U256,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::rolling;

use crate::{
    config::SwapsConfig,
    limits::Slippage,
    planner::validate_pairs,
    service::{DefaultSwapsService, SwapsService},
};

/// Batchswap CLI - Route, simulate and bound Vault batch swaps
///
/// Quotes are obtained by simulating the batch against the Vault with a static call. Nothing is
/// signed or broadcast.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(name = "batchswap", version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// The network to quote on. Example: ethereum, polygon, arbitrum
    #[clap(short = 'n', long, default_value = "ethereum", env = "BATCHSWAP_NETWORK")]
    network: String,

    /// JSON-RPC endpoint used for static calls against the Vault.
    #[clap(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// GraphQL endpoint serving the Vault's pools.
    #[clap(long, env = "POOLS_URL")]
    pools_url: Option<String>,

    /// Overrides the network's Vault address.
    #[clap(long)]
    vault: Option<String>,

    /// Pools at or below this USD liquidity are not loaded for routing.
    #[clap(long, default_value = "0")]
    min_liquidity: String,

    /// Skip checking that the RPC endpoint serves the selected network.
    #[clap(long)]
    skip_network_check: bool,

    /// Maximum time in seconds a command may take.
    #[clap(long, default_value = "60")]
    timeout: u64,

    /// Logging folder path.
    #[clap(long, default_value = "logs")]
    log_folder: String,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Loads the pool snapshot and reports how many pools are available for routing.
    FetchPools,

    /// Simulates a batch swap and prints the asset deltas.
    QueryBatchSwap {
        /// Batch swap as JSON, or @<path> to read it from a file.
        #[clap(long)]
        batch: String,
    },

    /// Routes token pairs, simulates the resulting batch and optionally computes limits.
    Quote {
        /// Token sold by a pair. Repeat once per pair.
        #[clap(long = "token-in", required = true)]
        tokens_in: Vec<String>,

        /// Token bought by a pair. Repeat once per pair.
        #[clap(long = "token-out", required = true)]
        tokens_out: Vec<String>,

        /// Raw integer amount of a pair: the input amount for given_in, the output for given_out.
        #[clap(long = "amount", required = true)]
        amounts: Vec<String>,

        /// given_in or given_out.
        #[clap(short = 'k', long, default_value = "given_in")]
        kind: String,

        /// If set, limits are computed with this slippage tolerance (0.01 = 1%).
        #[clap(long)]
        slippage: Option<String>,
    },

    /// Computes limits for already simulated deltas. Needs no network access.
    Limits {
        #[clap(long = "token-in")]
        tokens_in: Vec<String>,

        #[clap(long = "token-out")]
        tokens_out: Vec<String>,

        /// Asset of the batch, in batch order.
        #[clap(long = "asset", required = true)]
        assets: Vec<String>,

        /// Delta of the asset at the same position.
        #[clap(long = "delta", required = true, allow_hyphen_values = true)]
        deltas: Vec<String>,

        #[clap(short = 'k', long, default_value = "given_in")]
        kind: String,

        /// Slippage tolerance (0.01 = 1%).
        #[clap(long)]
        slippage: String,
    },
}

#[derive(Serialize)]
struct DeltasReport {
    #[serde(with = "decimal_vec")]
    deltas: Vec<I256>,
}

#[derive(Serialize)]
struct LimitsReport {
    #[serde(with = "decimal_vec")]
    limits: Vec<I256>,
}

#[derive(Serialize)]
struct QuoteReport {
    #[serde(flatten)]
    output: QueryWithSorOutput,
    #[serde(with = "decimal_vec", skip_serializing_if = "Vec::is_empty")]
    limits: Vec<I256>,
}

#[derive(Serialize)]
struct PoolsReport {
    success: bool,
    pools: usize,
}

impl CliArgs {
    fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("timeout must be at least one second".to_string());
        }
        self.network()?;
        Ok(())
    }

    fn network(&self) -> Result<Network, String> {
        Network::from_str(&self.network).map_err(|_| format!("Unknown network: {}", self.network))
    }

    fn config(&self) -> Result<SwapsConfig, String> {
        let network = self.network()?;
        let rpc_url = self
            .rpc_url
            .clone()
            .ok_or("--rpc-url (or RPC_URL) is required for this command")?;
        let pools_url = self
            .pools_url
            .clone()
            .ok_or("--pools-url (or POOLS_URL) is required for this command")?;
        let mut config = SwapsConfig::new(network, rpc_url, pools_url)
            .with_min_liquidity(self.min_liquidity.clone());
        if let Some(vault) = &self.vault {
            config = config.with_vault(parse_address(vault)?);
        }
        Ok(config)
    }

    async fn service(&self) -> Result<DefaultSwapsService, String> {
        let service = SwapsService::from_config(self.config()?).map_err(|e| e.to_string())?;
        if !self.skip_network_check {
            service
                .verify_network()
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(service)
    }
}

fn parse_address(raw: &str) -> Result<Address, String> {
    Address::from_str(raw.trim()).map_err(|e| format!("Invalid address '{raw}': {e}"))
}

fn parse_addresses(raw: &[String]) -> Result<Vec<Address>, String> {
    raw.iter()
        .map(|a| parse_address(a))
        .collect()
}

fn parse_amounts(raw: &[String]) -> Result<Vec<U256>, String> {
    raw.iter()
        .map(|a| U256::from_str(a.trim()).map_err(|e| format!("Invalid amount '{a}': {e}")))
        .collect()
}

fn parse_deltas(raw: &[String]) -> Result<Vec<I256>, String> {
    raw.iter()
        .map(|d| I256::from_dec_str(d.trim()).map_err(|e| format!("Invalid delta '{d}': {e}")))
        .collect()
}

fn parse_kind(raw: &str) -> Result<SwapKind, String> {
    SwapKind::from_str(raw).map_err(|_| format!("Unknown swap kind: {raw}"))
}

fn read_batch(raw: &str) -> Result<BatchSwap, String> {
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read batch file {path}: {e}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&json).map_err(|e| format!("Invalid batch swap JSON: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize output: {e}"))
}

pub async fn run_cli() -> Result<(), String> {
    // Parse CLI Args
    let args: CliArgs = CliArgs::parse();
    args.validate()?;

    // Setup Logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(rolling::never(&args.log_folder, "batchswap.log"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set up logging subscriber: {e}"))?;

    info!("Running with version: {}", option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"));
    let output = tokio::time::timeout(Duration::from_secs(args.timeout), execute(&args))
        .await
        .map_err(|_| format!("Command timed out after {}s", args.timeout))??;

    println!("{output}");
    Ok(())
}

/// Runs the selected command and returns its JSON output.
async fn execute(args: &CliArgs) -> Result<String, String> {
    debug!(command = ?args.command, network = %args.network, "Executing command");
    match &args.command {
        Command::FetchPools => {
            let service = args.service().await?;
            let success = service.fetch_pools(vec![], true).await;
            let pools = service
                .planner()
                .router()
                .pool_count()
                .await
                .unwrap_or_default();
            to_json(&PoolsReport { success, pools })
        }
        Command::QueryBatchSwap { batch } => {
            let batch = read_batch(batch)?;
            batch
                .validate()
                .map_err(|e| e.to_string())?;
            let service = args.service().await?;
            let deltas = service
                .query_batch_swap(&batch)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&DeltasReport { deltas })
        }
        Command::Quote { tokens_in, tokens_out, amounts, kind, slippage } => {
            let input = QueryWithSorInput {
                tokens_in: parse_addresses(tokens_in)?,
                tokens_out: parse_addresses(tokens_out)?,
                swap_type: parse_kind(kind)?,
                amounts: parse_amounts(amounts)?,
                fetch_pools: FetchPoolsOptions::default(),
            };
            // no request may be sent for invalid input
            validate_pairs(args.network()?, &input.tokens_in, &input.tokens_out, &input.amounts)
                .map_err(|e| e.to_string())?;
            let slippage = slippage
                .as_deref()
                .map(Slippage::from_str)
                .transpose()
                .map_err(|e| e.to_string())?;

            let service = args.service().await?;
            let output = service
                .query_batch_swap_with_sor(&input)
                .await
                .map_err(|e| e.to_string())?;
            let limits = match slippage {
                Some(slippage) => DefaultSwapsService::get_limits_for_slippage(
                    &input.tokens_in,
                    &input.tokens_out,
                    input.swap_type,
                    &output.deltas,
                    &output.assets,
                    slippage,
                )
                .map_err(|e| e.to_string())?,
                None => vec![],
            };
            to_json(&QuoteReport { output, limits })
        }
        Command::Limits { tokens_in, tokens_out, assets, deltas, kind, slippage } => {
            let limits = DefaultSwapsService::get_limits_for_slippage(
                &parse_addresses(tokens_in)?,
                &parse_addresses(tokens_out)?,
                parse_kind(kind)?,
                &parse_deltas(deltas)?,
                &parse_addresses(assets)?,
                Slippage::from_str(slippage).map_err(|e| e.to_string())?,
            )
            .map_err(|e| e.to_string())?;
            to_json(&LimitsReport { limits })
        }
    }
}
