//! Typed error hierarchy for the daytrack board core.
//!
//! Two top-level enums cover the two sides of the wire:
//! - `BoardError` — server authority and persistence failures
//! - `SyncError` — client-side transport and hydration failures

use thiserror::Error;

/// Errors from the server authority and its persistence layer.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Grid for board {board_id} not hydrated yet")]
    GridNotHydrated { board_id: String },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the sync client.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No active board; request full state first")]
    NoBoard,

    #[error("Failed to decode server event: {0}")]
    Decode(#[source] serde_json::Error),
}
