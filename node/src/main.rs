// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # StockProof Inventory Node
//!
//! Entry point for the `stockproof-node` binary. Parses CLI arguments,
//! initializes logging, loads the roster configuration, opens the inventory
//! store, and runs one attestation command.
//!
//! The binary supports six subcommands:
//!
//! - `init`    — create the data directory, config and seeded stores
//! - `keys`    — print derived key pairs
//! - `propose` — PoA commit round for a record, applied on commit
//! - `query`   — consistency-gated multisignature attestation
//! - `show`    — list every member's records
//! - `version` — print build version information

mod cli;
mod logging;
mod report;
mod store;

use anyhow::{Context, Result};
use clap::Parser;

use stockproof_protocol::attestation::Orchestrator;
use stockproof_protocol::config::{AttestationConfig, CONFIG_FILE_NAME, PROTOCOL_VERSION};
use stockproof_protocol::inventory::record::{seed_records, Record};
use stockproof_protocol::storage::RecordStore;

use cli::{Commands, StockProofCli};
use store::NodeStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = StockProofCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format)?;

    match &cli.command {
        Commands::Init(args) => init_node(&cli, args),
        Commands::Keys => {
            let orch = orchestrator(&cli)?;
            report::print_keys(&orch);
            Ok(())
        }
        Commands::Propose(args) => propose(&cli, args).await,
        Commands::Query(args) => query(&cli, args),
        Commands::Show => {
            let orch = orchestrator(&cli)?;
            let store = open_store(&cli)?;
            report::print_inventory(&orch, &store)
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Resolves the configuration: `--config`, then `<data-dir>/config.toml`,
/// then the demo roster, with any `--parameters` overlay applied last.
fn load_config(cli: &StockProofCli) -> Result<AttestationConfig> {
    let default_path = cli.data_dir.join(CONFIG_FILE_NAME);
    let mut config = match &cli.config {
        Some(path) => AttestationConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None if default_path.exists() => AttestationConfig::load(&default_path)
            .with_context(|| format!("failed to load config {}", default_path.display()))?,
        None => {
            tracing::info!("no configuration file found, using demo roster");
            AttestationConfig::demo()
        }
    };

    if let Some(path) = &cli.parameters {
        config
            .apply_parameters_file(path)
            .with_context(|| format!("failed to apply parameters {}", path.display()))?;
        tracing::info!(path = %path.display(), "parameters overlay applied");
    }
    Ok(config)
}

fn orchestrator(cli: &StockProofCli) -> Result<Orchestrator> {
    let config = load_config(cli)?;
    Orchestrator::new(config).context("failed to derive roster keys")
}

fn open_store(cli: &StockProofCli) -> Result<NodeStore> {
    NodeStore::open(cli.backend, &cli.data_dir).with_context(|| {
        format!(
            "failed to open {:?} store in {}",
            cli.backend,
            cli.data_dir.display()
        )
    })
}

/// Creates the data directory, writes the configuration, and seeds every
/// member's store with the starting inventory.
fn init_node(cli: &StockProofCli, args: &cli::InitArgs) -> Result<()> {
    let data_dir = &cli.data_dir;
    tracing::info!(data_dir = %data_dir.display(), backend = ?cli.backend, "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite",
            config_path.display()
        );
    }

    let config = load_config(cli)?;
    let orch = Orchestrator::new(config.clone()).context("failed to derive roster keys")?;
    std::fs::write(&config_path, config.to_toml_string()?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    let store = open_store(cli)?;
    for code in orch.roster().codes() {
        store
            .replace_all(code, &seed_records())
            .with_context(|| format!("failed to seed store for {code}"))?;
    }
    store.flush()?;

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Backend        : {:?}", cli.backend);
    println!("  Members        : {}", orch.roster().codes().join(", "));
    println!("  Quorum         : {}", orch.roster().quorum());

    Ok(())
}

async fn propose(cli: &StockProofCli, args: &cli::ProposeArgs) -> Result<()> {
    let orch = orchestrator(cli)?;
    let store = open_store(cli)?;

    let location = match &args.location {
        Some(l) => l.clone(),
        None => orch
            .roster()
            .get(&args.node)
            .map(|m| m.code().to_string())
            .with_context(|| format!("unknown proposer {}", args.node))?,
    };
    let record = Record::new(args.item.clone(), args.qty, args.price, location);

    let outcome = if args.sequential {
        orch.propose_and_commit(&args.node, record)?
    } else {
        orch.propose_and_commit_async(&args.node, record).await?
    };

    let applied = outcome
        .apply(&store)
        .context("failed to persist committed record")?;
    store.flush()?;
    tracing::info!(applied, committed = outcome.committed, "proposal handled");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        report::print_consensus(&outcome);
    }
    Ok(())
}

fn query(cli: &StockProofCli, args: &cli::QueryArgs) -> Result<()> {
    let orch = orchestrator(cli)?;
    let store = open_store(cli)?;

    let outcome = orch
        .query_and_attest(&store, &args.item, orch.requestor_public())
        .with_context(|| format!("attestation of item {} refused", args.item))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        report::print_attestation(&outcome);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("stockproof-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {}", PROTOCOL_VERSION);
}
