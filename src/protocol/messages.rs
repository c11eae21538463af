//! Real-time channel message definitions
//!
//! Every frame is a JSON object tagged by `type` with kebab-case event names;
//! payload fields are camelCase.

use crate::store::{ChatEntry, GamePlayer};
use crate::types::{GameId, PlayerId, PlayerProfile, PlayerRef, UpdateKind};
use serde::{Deserialize, Serialize};

/// Player identity as reported inside `game-over`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultParty {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
}

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    FindMatch {
        player: PlayerProfile,
    },
    CancelMatch,
    #[serde(rename_all = "camelCase")]
    GameUpdate {
        game_id: GameId,
        kind: UpdateKind,
        #[serde(default)]
        board: Option<serde_json::Value>,
        #[serde(default)]
        score: Option<u64>,
        #[serde(default)]
        lines: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    GameOver {
        game_id: GameId,
        winner: ResultParty,
        loser: ResultParty,
        #[serde(default)]
        final_score: u64,
        #[serde(default)]
        lines_cleared: u32,
    },
    #[serde(rename_all = "camelCase")]
    Forfeit {
        game_id: GameId,
    },
    #[serde(rename_all = "camelCase")]
    RematchRequest {
        game_id: GameId,
    },
    #[serde(rename_all = "camelCase")]
    RematchAccept {
        game_id: GameId,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        game_id: GameId,
        message: String,
    },
}

impl ClientMessage {
    /// Event name, used as a metrics label
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::FindMatch { .. } => "find-match",
            ClientMessage::CancelMatch => "cancel-match",
            ClientMessage::GameUpdate { .. } => "game-update",
            ClientMessage::GameOver { .. } => "game-over",
            ClientMessage::Forfeit { .. } => "forfeit",
            ClientMessage::RematchRequest { .. } => "rematch-request",
            ClientMessage::RematchAccept { .. } => "rematch-accept",
            ClientMessage::ChatMessage { .. } => "chat-message",
        }
    }
}

/// Named error codes answered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    AlreadyQueued,
    NotIdentified,
    MalformedMessage,
    InvalidResult,
    InvalidChatMessage,
}

/// Signed rating change of one side of a settled game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledParty {
    pub id: PlayerId,
    pub name: String,
    pub elo_change: i32,
}

/// Events sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    WaitingForOpponent,
    MatchCancelled,
    Error {
        code: ErrorCode,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    MatchFound {
        game_id: GameId,
        players: Vec<PlayerRef>,
    },
    #[serde(rename_all = "camelCase")]
    GameStart {
        game_id: GameId,
    },
    #[serde(rename_all = "camelCase")]
    GameUpdate {
        kind: UpdateKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        board: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        score: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lines: Option<u32>,
        player_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner: SettledParty,
        loser: SettledParty,
        final_score: u64,
        lines_cleared: u32,
    },
    #[serde(rename_all = "camelCase")]
    OpponentForfeited {
        player_name: String,
    },
    OpponentDisconnected,
    #[serde(rename_all = "camelCase")]
    RematchRequested {
        player_id: PlayerId,
        player_name: String,
    },
    #[serde(rename_all = "camelCase")]
    RematchAccepted {
        rematch_game_id: GameId,
        players: Vec<GamePlayer>,
    },
    ChatMessage {
        entry: ChatEntry,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Event name, used in logs
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::WaitingForOpponent => "waiting-for-opponent",
            ServerMessage::MatchCancelled => "match-cancelled",
            ServerMessage::Error { .. } => "error",
            ServerMessage::MatchFound { .. } => "match-found",
            ServerMessage::GameStart { .. } => "game-start",
            ServerMessage::GameUpdate { .. } => "game-update",
            ServerMessage::GameOver { .. } => "game-over",
            ServerMessage::OpponentForfeited { .. } => "opponent-forfeited",
            ServerMessage::OpponentDisconnected => "opponent-disconnected",
            ServerMessage::RematchRequested { .. } => "rematch-requested",
            ServerMessage::RematchAccepted { .. } => "rematch-accepted",
            ServerMessage::ChatMessage { .. } => "chat-message",
        }
    }
}
