//! SQLite state adapter.
//!
//! Stores the bot document as JSON text under a single key of the
//! `bot_state` key-value table.

use crate::domain::error::AltdipError;
use crate::domain::state::BotState;
use crate::ports::state_port::StatePort;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use tracing::debug;

const STATE_KEY: &str = "bot";

pub struct SqliteStateAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStateAdapter {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AltdipError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|e: r2d2::Error| AltdipError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, AltdipError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AltdipError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AltdipError> {
        self.pool.get().map_err(|e: r2d2::Error| AltdipError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), AltdipError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS bot_state (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );",
            )
            .map_err(|e: rusqlite::Error| AltdipError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

impl StatePort for SqliteStateAdapter {
    fn load(&self) -> Result<Option<BotState>, AltdipError> {
        let text: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM bot_state WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e: rusqlite::Error| AltdipError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        text.map(|t| {
            BotState::from_json(&t).map_err(|e| AltdipError::StateCorrupt {
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    fn save(&self, state: &BotState) -> Result<(), AltdipError> {
        let json = state.to_json()?;
        self.conn()?
            .execute(
                "INSERT INTO bot_state (key, value, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![STATE_KEY, json],
            )
            .map_err(|e: rusqlite::Error| AltdipError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        debug!(operation = %state.operation.operation, "saved bot state");
        Ok(())
    }

    fn clear(&self) -> Result<(), AltdipError> {
        self.conn()?
            .execute("DELETE FROM bot_state WHERE key = ?1", params![STATE_KEY])
            .map_err(|e: rusqlite::Error| AltdipError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
