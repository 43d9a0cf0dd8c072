//! ragvault-keys: operator tooling for the master key.
//!
//! Generates KEKs for initial provisioning and checks that the configured
//! `MASTER_ENCRYPTION_KEY` is usable before a deploy. Output is JSON on
//! stdout; logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragvault_crypto::{generate_master_key, DataKey, KeyManager, KeyringConfig, MemoryKeyStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ragvault-keys")]
#[command(author, version, about = "Master key tooling for ragvault envelope encryption")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new base64-encoded 256-bit master key
    Keygen {
        /// Print as an env assignment (MASTER_ENCRYPTION_KEY=...)
        #[arg(long)]
        env: bool,
    },

    /// Validate the configured master key
    Check,

    /// Show algorithm parameters and cache settings
    Info,

    /// Wrap and unwrap a throwaway data key under the configured master key
    WrapTest,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Environment variables:
///   LOG_FORMAT - "json" or "text" (default: "text")
///   RUST_LOG   - standard env filter (default: "ragvault_crypto=warn,ragvault_keys=info")
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ragvault_crypto=warn,ragvault_keys=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Keygen { env } => cmd_keygen(env),
        Commands::Check => cmd_check(),
        Commands::Info => cmd_info().await,
        Commands::WrapTest => cmd_wrap_test(),
    }
}

fn load_config() -> anyhow::Result<KeyringConfig> {
    KeyringConfig::from_env().context("master key configuration")
}

fn cmd_keygen(env: bool) -> anyhow::Result<()> {
    let key = generate_master_key();
    if env {
        println!("{}={}", ragvault_core::defaults::MASTER_KEY_ENV, key);
    } else {
        let output = serde_json::json!({ "master_key": key });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn cmd_check() -> anyhow::Result<()> {
    let config = load_config()?;

    let output = serde_json::json!({
        "valid": true,
        "cache_capacity": config.cache_capacity.map(|c| c.get()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn cmd_info() -> anyhow::Result<()> {
    let keys = KeyManager::new(load_config()?, Arc::new(MemoryKeyStore::new()));
    let info = keys.info().await;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_wrap_test() -> anyhow::Result<()> {
    let keys = KeyManager::new(load_config()?, Arc::new(MemoryKeyStore::new()));

    let dek = DataKey::generate();
    let wrapped = keys.wrap_key(&dek).context("wrap")?;
    let unwrapped = keys.unwrap_key(&wrapped).context("unwrap")?;
    anyhow::ensure!(
        unwrapped.as_bytes() == dek.as_bytes(),
        "unwrapped key does not match"
    );

    info!(
        subsystem = "cli",
        op = "wrap_test",
        wrapped_len = wrapped.len(),
        "Wrap round-trip succeeded"
    );

    let output = serde_json::json!({
        "wrap_roundtrip": true,
        "wrapped_len": wrapped.len(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
