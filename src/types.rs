//! Common types used throughout the coordinator

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable identity of a player
pub type PlayerId = String;

/// Opaque session / game identifier, shared with the durable game record
pub type GameId = String;

/// Identifier of one live real-time connection
pub type ConnectionId = Uuid;

/// Player profile as announced by the client in `find-match`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub custom_avatar: Option<String>,
    #[serde(default)]
    pub elo_rating: Option<i32>,
}

impl PlayerProfile {
    /// Custom avatar wins over the provider avatar
    pub fn avatar_ref(&self) -> Option<String> {
        self.custom_avatar.clone().or_else(|| self.avatar.clone())
    }
}

/// A participant as frozen at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub rating_at_session_start: i32,
}

impl PlayerRef {
    pub fn from_profile(profile: &PlayerProfile, rating: i32) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            avatar: profile.avatar_ref(),
            rating_at_session_start: rating,
        }
    }
}

/// Which part of a participant's live state an update carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Board,
    Score,
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateKind::Board => write!(f, "board"),
            UpdateKind::Score => write!(f, "score"),
        }
    }
}

/// Last-write-wins snapshot of one participant's game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveState {
    /// Opaque board payload, relayed verbatim
    pub board: serde_json::Value,
    pub score: u64,
    pub lines: u32,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            board: serde_json::Value::Array(Vec::new()),
            score: 0,
            lines: 0,
        }
    }
}
