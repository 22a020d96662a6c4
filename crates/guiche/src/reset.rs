// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `guiche reset` command implementation.
//!
//! Deletes every ticket and restarts numbering from 1. Destructive, so it
//! prompts for confirmation on stdin unless `--yes` is passed.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use guiche_config::model::GuicheConfig;
use guiche_core::error::GuicheError;
use guiche_core::TicketLedger;
use guiche_ledger::SqliteLedger;

/// Runs the `guiche reset` command.
pub async fn run_reset(config: GuicheConfig, yes: bool) -> Result<(), GuicheError> {
    if !yes && !confirm(&config.storage.database_path)? {
        println!("reset aborted");
        return Ok(());
    }

    let ledger: Arc<dyn TicketLedger> = Arc::new(SqliteLedger::new(config.storage.clone()));
    ledger.initialize().await?;
    let removed = ledger.purge_all().await?;
    ledger.close().await?;

    println!("removed {removed} tickets; numbering restarts at 1");
    Ok(())
}

/// Asks for confirmation on stdin. Only `y` / `yes` (any case) proceeds.
fn confirm(db_path: &str) -> Result<bool, GuicheError> {
    print!("delete ALL tickets in {db_path}? [y/N] ");
    io::stdout()
        .flush()
        .map_err(|e| GuicheError::Internal(format!("confirmation prompt failed: {e}")))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| GuicheError::Internal(format!("confirmation prompt failed: {e}")))?;

    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
