//! # CLI Interface
//!
//! Defines the command-line argument structure for `custody-node` using
//! `clap` derive. Supports two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};

use custody_protocol::config::{NetworkProfile, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// Custody vault node.
///
/// Hosts a custodial vault on an in-process devnet, serves the JSON-RPC and
/// REST API over it, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "custody-node",
    about = "Custodial vault node",
    version,
    propagate_version = true
)]
pub struct CustodyNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the custody node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "CUSTODY_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CUSTODY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Network profile to report: localhost, sepolia, or devnet.
    #[arg(long, env = "CUSTODY_NETWORK", default_value = "devnet")]
    pub network: NetworkProfile,

    /// Hex address of the wrapped-native token.
    ///
    /// When omitted, the devnet deploys it at its default address.
    #[arg(long, env = "WETH_ADDRESS")]
    pub weth_address: Option<String>,

    /// Log output format: pretty or json.
    #[arg(long, env = "CUSTODY_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
