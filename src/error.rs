//! Error types for the arena coordinator
//!
//! Plumbing (store, configuration, start-up) uses anyhow; the session
//! registry reports `ArenaError` directly so callers can tell a stale
//! reference apart from a real failure.

use crate::session::SessionStatus;
use crate::types::{ConnectionId, GameId, PlayerId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific coordination scenarios
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Session not found: {game_id}")]
    SessionNotFound { game_id: GameId },

    #[error("Connection already queued: {connection_id}")]
    AlreadyQueued { connection_id: ConnectionId },

    #[error("Player already in an active session: {player_id}")]
    AlreadyInSession { player_id: PlayerId },

    #[error("Invalid session transition for {game_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        game_id: GameId,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Durable store operation failed: {message}")]
    StoreFailure { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Coordinator unavailable: {message}")]
    CoordinatorUnavailable { message: String },
}

impl ArenaError {
    /// Stale-reference errors are expected under racing events and are
    /// handled as silent no-ops.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, ArenaError::SessionNotFound { .. })
    }
}
