//! Waiting queue plus active session map

use crate::error::ArenaError;
use crate::session::instance::{Participant, Session};
use crate::types::{ConnectionId, GameId, PlayerProfile};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

/// A connection waiting for an opponent
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub connection_id: ConnectionId,
    pub player: PlayerProfile,
    pub joined_at: DateTime<Utc>,
}

/// Owned registry of queued connections and live sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    queue: VecDeque<QueueEntry>,
    sessions: HashMap<GameId, Session>,
    by_connection: HashMap<ConnectionId, GameId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back of the queue.
    ///
    /// Fails if the connection or the player already holds a queue slot or
    /// a session.
    pub fn enqueue(&mut self, entry: QueueEntry) -> Result<(), ArenaError> {
        if self.is_queued(entry.connection_id) || self.is_player_queued(&entry.player.id) {
            return Err(ArenaError::AlreadyQueued {
                connection_id: entry.connection_id,
            });
        }
        if self.by_connection.contains_key(&entry.connection_id)
            || self.is_player_in_session(&entry.player.id)
        {
            return Err(ArenaError::AlreadyInSession {
                player_id: entry.player.id,
            });
        }
        self.queue.push_back(entry);
        Ok(())
    }

    /// Pop the longest-waiting entry
    pub fn dequeue_next(&mut self) -> Option<QueueEntry> {
        self.queue.pop_front()
    }

    /// Remove a connection's queue slot; absent is not an error
    pub fn remove_from_queue(&mut self, connection_id: ConnectionId) -> Option<QueueEntry> {
        let index = self
            .queue
            .iter()
            .position(|e| e.connection_id == connection_id)?;
        self.queue.remove(index)
    }

    pub fn is_queued(&self, connection_id: ConnectionId) -> bool {
        self.queue.iter().any(|e| e.connection_id == connection_id)
    }

    pub fn is_player_queued(&self, player_id: &str) -> bool {
        self.queue.iter().any(|e| e.player.id == player_id)
    }

    pub fn is_player_in_session(&self, player_id: &str) -> bool {
        self.sessions
            .values()
            .any(|s| s.index_of_player(player_id).is_some())
    }

    /// Connection or player is free to join the queue or a new session
    pub fn is_free(&self, connection_id: ConnectionId, player_id: &str) -> bool {
        !self.is_queued(connection_id)
            && !self.is_player_queued(player_id)
            && !self.by_connection.contains_key(&connection_id)
            && !self.is_player_in_session(player_id)
    }

    /// Register a new `Playing` session for two participants
    pub fn create_session(
        &mut self,
        id: GameId,
        participants: [Participant; 2],
        original_game_id: Option<GameId>,
        at: DateTime<Utc>,
    ) -> Result<&Session, ArenaError> {
        for participant in participants.iter() {
            if self.by_connection.contains_key(&participant.connection_id) {
                return Err(ArenaError::AlreadyInSession {
                    player_id: participant.player.id.clone(),
                });
            }
        }

        let session = Session::new(id.clone(), participants, original_game_id, at);
        for connection_id in session.connection_ids() {
            self.by_connection.insert(connection_id, id.clone());
        }
        Ok(self.sessions.entry(id).or_insert(session))
    }

    pub fn get(&self, id: &str) -> Result<&Session, ArenaError> {
        self.sessions
            .get(id)
            .ok_or_else(|| ArenaError::SessionNotFound {
                game_id: id.to_string(),
            })
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Session, ArenaError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| ArenaError::SessionNotFound {
                game_id: id.to_string(),
            })
    }

    /// Take a session out of the registry. This is the single check-and-remove
    /// step that makes settlement and abandonment happen at most once.
    pub fn remove(&mut self, id: &str) -> Result<Session, ArenaError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| ArenaError::SessionNotFound {
                game_id: id.to_string(),
            })?;
        for connection_id in session.connection_ids() {
            self.by_connection.remove(&connection_id);
        }
        Ok(session)
    }

    /// Session a connection currently plays in
    pub fn session_for_connection(&self, connection_id: ConnectionId) -> Option<&GameId> {
        self.by_connection.get(&connection_id)
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
