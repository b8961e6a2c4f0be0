//! # CLI Interface
//!
//! Defines the command-line argument structure for `stockproof-node` using
//! `clap` derive. Every subcommand shares the global configuration, data
//! directory, and storage backend flags.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// StockProof inventory node.
///
/// Runs the attestation protocol over a four-node inventory roster: PoA
/// voting on new records, and multi-party signed, encrypted answers to
/// inventory queries.
#[derive(Parser, Debug)]
#[command(
    name = "stockproof-node",
    about = "StockProof inventory attestation node",
    version,
    propagate_version = true
)]
pub struct StockProofCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Path to the roster configuration file (TOML).
    ///
    /// When omitted, `config.toml` in the data directory is used if present,
    /// otherwise the built-in demo roster.
    #[arg(long, short = 'c', global = true, env = "STOCKPROOF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Legacy `parameters.txt` applied on top of the configuration.
    #[arg(long, global = true, env = "STOCKPROOF_PARAMETERS")]
    pub parameters: Option<PathBuf>,

    /// Directory holding `config.toml` and the inventory stores.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "STOCKPROOF_DATA_DIR",
        default_value = "./stockproof-data"
    )]
    pub data_dir: PathBuf,

    /// Inventory storage backend.
    #[arg(long, global = true, value_enum, default_value_t = Backend::Json)]
    pub backend: Backend,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One `inventory_<code>.json` file per node.
    Json,
    /// A sled database with one tree per node.
    Sled,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, write `config.toml`, and seed every store.
    Init(InitArgs),
    /// Print the derived key pairs of every member, the PKG and the requestor.
    Keys,
    /// Propose a record and run a PoA commit round.
    Propose(ProposeArgs),
    /// Attest to an item across the roster and encrypt it for the requestor.
    Query(QueryArgs),
    /// List every member's records.
    Show,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `config.toml` and reseed the stores.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `propose` subcommand.
#[derive(Parser, Debug)]
pub struct ProposeArgs {
    /// Proposing member, by code (`A`) or label (`Inventory A`).
    #[arg(long, short = 'n')]
    pub node: String,

    /// Item id.
    #[arg(long, short = 'i')]
    pub item: String,

    #[arg(long)]
    pub qty: u64,

    #[arg(long)]
    pub price: u64,

    /// Location code for a new item. Defaults to the proposer's code.
    #[arg(long)]
    pub location: Option<String>,

    /// Gather votes one at a time instead of concurrently.
    #[arg(long)]
    pub sequential: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `query` subcommand.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Item id.
    #[arg(long, short = 'i')]
    pub item: String,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}
