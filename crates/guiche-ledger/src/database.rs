// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection handle with WAL mode and embedded migrations.
//!
//! Wraps a single `tokio_rusqlite::Connection`. All access serializes
//! through its one background thread, so query modules never contend for
//! the write lock and SQLITE_BUSY cannot occur between them. Query modules
//! accept `&Database` and go through [`Database::connection`].

use std::time::Duration;

use guiche_config::model::StorageConfig;
use guiche_core::GuicheError;
use tracing::debug;

/// Handle to the ticket database. The single writer for the process.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at the configured path,
    /// applies connection pragmas, and runs pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, GuicheError> {
        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        let wal_mode = config.wal_mode;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(busy_timeout)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let migrated: Result<(), GuicheError> = conn
            .call(|conn| -> Result<Result<(), GuicheError>, rusqlite::Error> {
                Ok(crate::migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migrated?;

        debug!(path = %config.database_path, wal = wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection handle, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), GuicheError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        Ok(())
    }
}

/// Maps a `tokio_rusqlite` dispatch error into the ledger error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GuicheError {
    GuicheError::Ledger {
        source: Box::new(e),
    }
}
