//! Session instance and its status machine

use crate::error::ArenaError;
use crate::types::{ConnectionId, GameId, LiveState, PlayerRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Player is in the queue; never stored in the session map
    Waiting,
    /// Both participants are matched and playing
    Playing,
    /// Settled with a result (terminal)
    Finished,
    /// Ended by a lost connection (terminal)
    Abandoned,
}

impl SessionStatus {
    /// Forward-only transitions
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        match (self, next) {
            (SessionStatus::Waiting, SessionStatus::Playing) => true,
            (SessionStatus::Playing, SessionStatus::Finished) => true,
            (SessionStatus::Playing, SessionStatus::Abandoned) => true,
            (SessionStatus::Waiting, _) => false,
            (SessionStatus::Playing, _) => false,
            (SessionStatus::Finished, _) => false,
            (SessionStatus::Abandoned, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            SessionStatus::Finished | SessionStatus::Abandoned => true,
            SessionStatus::Waiting | SessionStatus::Playing => false,
        }
    }
}

/// One side of a session
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub player: PlayerRef,
    pub live: LiveState,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, player: PlayerRef) -> Self {
        Self {
            connection_id,
            player,
            live: LiveState::default(),
        }
    }
}

/// A live match between two connections
#[derive(Debug, Clone)]
pub struct Session {
    id: GameId,
    status: SessionStatus,
    participants: [Participant; 2],
    original_game_id: Option<GameId>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// New session, already `Playing`
    pub fn new(
        id: GameId,
        participants: [Participant; 2],
        original_game_id: Option<GameId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: SessionStatus::Playing,
            participants,
            original_game_id,
            created_at,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn participants(&self) -> &[Participant; 2] {
        &self.participants
    }

    pub fn original_game_id(&self) -> Option<&GameId> {
        self.original_game_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Whether `GameStart` has been delivered
    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Record delivery of `GameStart`; later calls keep the first instant
    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
    }

    /// Move to a new status, rejecting backward or repeated transitions
    pub fn transition(&mut self, next: SessionStatus, at: DateTime<Utc>) -> Result<(), ArenaError> {
        if !self.status.can_transition_to(next) {
            return Err(ArenaError::InvalidTransition {
                game_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(at);
        }
        Ok(())
    }

    /// Slot index of a connection
    pub fn index_of_connection(&self, connection_id: ConnectionId) -> Option<usize> {
        self.participants
            .iter()
            .position(|p| p.connection_id == connection_id)
    }

    /// Slot index of a player
    pub fn index_of_player(&self, player_id: &str) -> Option<usize> {
        self.participants
            .iter()
            .position(|p| p.player.id == player_id)
    }

    pub fn participant_mut(&mut self, index: usize) -> Option<&mut Participant> {
        self.participants.get_mut(index)
    }

    /// The other side of slot `index`
    pub fn opponent_of(&self, index: usize) -> &Participant {
        &self.participants[1 - index.min(1)]
    }

    pub fn connection_ids(&self) -> [ConnectionId; 2] {
        [
            self.participants[0].connection_id,
            self.participants[1].connection_id,
        ]
    }

    pub fn players(&self) -> Vec<PlayerRef> {
        self.participants.iter().map(|p| p.player.clone()).collect()
    }
}
