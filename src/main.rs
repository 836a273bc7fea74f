//! STAKEGUARD — Bankroll Ledger & Stake Recommendation Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the ledger from disk (or starts fresh), and serves the API
//! with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use stakeguard::api;
use stakeguard::api::routes::ServiceState;
use stakeguard::config::AppConfig;
use stakeguard::ledger::Ledger;
use stakeguard::stake::StakeCalculator;
use stakeguard::storage;

const BANNER: &str = r#"
 ____  _____  _    _  _______ ____ _   _   _    ____  ____
/ ___||_   _|/ \  | |/ / ____/ ___| | | | / \  |  _ \|  _ \
\___ \  | | / _ \ | ' /|  _|| |  _| | | |/ _ \ | |_) | | | |
 ___) | | |/ ___ \| . \| |__| |_| | |_| / ___ \|  _ <| |_| |
|____/  |_/_/   \_\_|\_\_____\____|\___/_/   \_\_| \_\____/

  Bankroll Ledger & Stake Recommendation Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration (defaults when config.toml is absent)
    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        state_file = cfg.engine.state_file.as_deref().unwrap_or("(default)"),
        "STAKEGUARD starting up"
    );

    // -- Restore or create the ledger -------------------------------------

    let state_file = cfg.engine.state_file.clone();
    let ledger = match storage::load_snapshot(state_file.as_deref())? {
        Some(snapshot) => {
            info!(accounts = snapshot.accounts.len(), "Resumed from saved snapshot");
            Ledger::from_snapshot(snapshot)
        }
        None => {
            info!("Fresh start");
            Ledger::new()
        }
    };

    let calculator = StakeCalculator::new(cfg.calculator.clone(), cfg.bands.clone());

    let state = Arc::new(ServiceState::with_persistence(
        ledger,
        calculator,
        state_file.clone(),
    ));

    // -- Serve -------------------------------------------------------------

    if cfg.server.enabled {
        api::spawn_server(state.clone(), cfg.server.port)?;
    }

    info!("Engine ready. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    // Save final state
    let snapshot = state.ledger.snapshot().await;
    storage::save_snapshot(&snapshot, state_file.as_deref())?;
    info!(
        accounts = snapshot.accounts.len(),
        "STAKEGUARD shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stakeguard=info"));

    let json_logging = std::env::var("STAKEGUARD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
