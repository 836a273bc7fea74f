//! Persistence layer.
//!
//! Saves and loads a full ledger snapshot to/from a JSON file. The snapshot
//! is written after mutating operations and on shutdown; a missing file
//! means a fresh start. SQLite can replace this later if row-level history
//! queries are ever needed, but a snapshot is sufficient here: the ledger
//! is the single writer and derives all aggregates from the wager rows.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::ledger::LedgerSnapshot;

/// Default state file path.
const DEFAULT_STATE_FILE: &str = "stakeguard_state.json";

/// Save a ledger snapshot to a JSON file.
pub fn save_snapshot(snapshot: &LedgerSnapshot, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);
    let json = serde_json::to_string_pretty(snapshot)
        .context("Failed to serialise ledger snapshot")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write snapshot to {path}"))?;

    debug!(path, accounts = snapshot.accounts.len(), "Snapshot saved");
    Ok(())
}

/// Load a ledger snapshot from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_snapshot(path: Option<&str>) -> Result<Option<LedgerSnapshot>> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved snapshot found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read snapshot from {path}"))?;

    let snapshot: LedgerSnapshot = serde_json::from_str(&json)
        .context(format!("Failed to parse snapshot from {path}"))?;

    info!(
        path,
        accounts = snapshot.accounts.len(),
        wagers = snapshot.accounts.iter().map(|c| c.wagers.len()).sum::<usize>(),
        "Snapshot loaded from disk"
    );

    Ok(Some(snapshot))
}

/// Delete the state file (for testing or reset).
pub fn delete_snapshot(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete snapshot file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
