//! Utility functions for the coordinator

use crate::types::{ConnectionId, GameId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique connection ID
pub fn generate_connection_id() -> ConnectionId {
    Uuid::new_v4()
}

/// Derive a session ID from the two connections and the creation time
pub fn generate_game_id(first: ConnectionId, second: ConnectionId, at: DateTime<Utc>) -> GameId {
    format!("{}-{}-{}", first, second, at.timestamp_millis())
}

/// Derive the ID of a rematch successor from its original session
pub fn generate_rematch_id(original: &str, at: DateTime<Utc>) -> GameId {
    format!("{}-rematch-{}", original, at.timestamp_millis())
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed between two instants, never negative
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}
