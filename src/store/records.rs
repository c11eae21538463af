//! Durable record shapes: users, games and chat transcripts

use crate::rating::{RankTier, DEFAULT_RATING};
use crate::types::{GameId, PlayerId, PlayerRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub elo_rating: i32,
    pub rank: RankTier,
    pub wins: u32,
    pub losses: u32,
    pub total_games: u32,
    pub win_streak: u32,
    pub best_win_streak: u32,
    pub last_game_date: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Create a fresh record at the default rating
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            elo_rating: DEFAULT_RATING,
            rank: RankTier::from_rating(DEFAULT_RATING),
            wins: 0,
            losses: 0,
            total_games: 0,
            win_streak: 0,
            best_win_streak: 0,
            last_game_date: None,
        }
    }

    /// Builder-style rating override
    pub fn with_rating(mut self, rating: i32) -> Self {
        self.elo_rating = rating;
        self.rank = RankTier::from_rating(rating);
        self
    }

    /// Apply a won game: `delta` is added to the rating
    pub fn record_win(&mut self, delta: i32, at: DateTime<Utc>) {
        self.wins += 1;
        self.total_games += 1;
        self.elo_rating += delta;
        self.win_streak += 1;
        if self.win_streak > self.best_win_streak {
            self.best_win_streak = self.win_streak;
        }
        self.rank = RankTier::from_rating(self.elo_rating);
        self.last_game_date = Some(at);
    }

    /// Apply a lost game: `delta` is the winner's gain and is subtracted
    pub fn record_loss(&mut self, delta: i32, at: DateTime<Utc>) {
        self.losses += 1;
        self.total_games += 1;
        self.elo_rating -= delta;
        self.win_streak = 0;
        self.rank = RankTier::from_rating(self.elo_rating);
        self.last_game_date = Some(at);
    }
}

/// Lifecycle of a durable game record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Finished,
    Abandoned,
}

/// Player entry of a game record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub elo_before: i32,
    pub elo_after: Option<i32>,
}

impl From<&PlayerRef> for GamePlayer {
    fn from(player: &PlayerRef) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            avatar: player.avatar.clone(),
            elo_before: player.rating_at_session_start,
            elo_after: None,
        }
    }
}

/// One rematch request attached to a finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchRequest {
    pub player_id: PlayerId,
    pub timestamp: DateTime<Utc>,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreLine {
    pub score: u64,
    pub lines: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalScores {
    pub winner: ScoreLine,
    pub loser: ScoreLine,
}

/// Durable counterpart of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: GameId,
    pub players: Vec<GamePlayer>,
    pub winner: Option<PlayerId>,
    pub loser: Option<PlayerId>,
    pub game_type: String,
    pub status: GameStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    pub duration: i64,
    pub final_scores: Option<FinalScores>,
    pub rematch_requests: Vec<RematchRequest>,
    pub rematch_game_id: Option<GameId>,
    pub original_game_id: Option<GameId>,
}

pub const DEFAULT_GAME_TYPE: &str = "tetris";

impl GameRecord {
    /// New active record
    pub fn new_active(
        game_id: GameId,
        players: Vec<GamePlayer>,
        game_type: impl Into<String>,
        original_game_id: Option<GameId>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            players,
            winner: None,
            loser: None,
            game_type: game_type.into(),
            status: GameStatus::Active,
            start_time,
            end_time: None,
            duration: 0,
            final_scores: None,
            rematch_requests: Vec::new(),
            rematch_game_id: None,
            original_game_id,
        }
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Whether `player_id` already has an unaccepted request
    pub fn has_pending_request_from(&self, player_id: &str) -> bool {
        self.rematch_requests
            .iter()
            .any(|r| r.player_id == player_id && !r.accepted)
    }

    /// First unaccepted request made by someone other than `player_id`.
    /// Only meaningful for two-player games.
    pub fn pending_request_not_from(&mut self, player_id: &str) -> Option<&mut RematchRequest> {
        self.rematch_requests
            .iter_mut()
            .find(|r| r.player_id != player_id && !r.accepted)
    }
}

/// Kind of transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSender {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: i64,
    pub game_id: GameId,
    pub sender: ChatSender,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub timestamp: DateTime<Utc>,
}

/// Chat transcript of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTranscript {
    pub game_id: GameId,
    pub messages: Vec<ChatEntry>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ChatTranscript {
    pub fn new(game_id: GameId, at: DateTime<Utc>) -> Self {
        Self {
            game_id,
            messages: Vec::new(),
            created_at: at,
            last_activity: at,
        }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.last_activity = entry.timestamp;
        self.messages.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    #[test]
    fn test_three_wins_then_loss() {
        let now = current_timestamp();
        let mut user = UserRecord::new("p1", "Ada");
        user.best_win_streak = 2;

        for _ in 0..3 {
            user.record_win(16, now);
        }
        assert_eq!(user.win_streak, 3);
        assert_eq!(user.best_win_streak, 3);
        assert_eq!(user.elo_rating, 1248);

        user.record_loss(16, now);
        assert_eq!(user.win_streak, 0);
        assert_eq!(user.best_win_streak, 3);
        assert_eq!(user.wins, 3);
        assert_eq!(user.losses, 1);
        assert_eq!(user.total_games, 4);
        assert_eq!(user.elo_rating, 1232);
        assert_eq!(user.last_game_date, Some(now));
    }

    #[test]
    fn test_best_streak_not_lowered() {
        let now = current_timestamp();
        let mut user = UserRecord::new("p1", "Ada");
        user.best_win_streak = 7;
        user.record_win(10, now);
        assert_eq!(user.best_win_streak, 7);
    }

    #[test]
    fn test_rank_follows_rating() {
        let now = current_timestamp();
        let mut user = UserRecord::new("p1", "Ada").with_rating(1390);
        assert_eq!(user.rank, RankTier::Bronze);
        user.record_win(12, now);
        assert_eq!(user.rank, RankTier::Silver);
        user.record_loss(20, now);
        assert_eq!(user.rank, RankTier::Bronze);
    }

    #[test]
    fn test_record_wire_shape() {
        let now = current_timestamp();
        let user = serde_json::to_value(UserRecord::new("p1", "Ada")).unwrap();
        assert_eq!(user["eloRating"], 1200);
        assert_eq!(user["totalGames"], 0);
        assert!(user.get("draws").is_none());

        let entry = ChatEntry {
            id: 1,
            game_id: "g1".into(),
            sender: ChatSender {
                id: "p1".into(),
                name: "Ada".into(),
                avatar: None,
            },
            message: "gg".into(),
            kind: ChatKind::Chat,
            timestamp: now,
        };
        let entry = serde_json::to_value(entry).unwrap();
        assert_eq!(entry["type"], "chat");
        assert_eq!(entry["gameId"], "g1");
    }

    #[test]
    fn test_pending_request_matching() {
        let now = current_timestamp();
        let mut game = GameRecord::new_active("g1".into(), Vec::new(), "tetris", None, now);
        game.rematch_requests.push(RematchRequest {
            player_id: "a".into(),
            timestamp: now,
            accepted: false,
        });

        assert!(game.has_pending_request_from("a"));
        assert!(game.pending_request_not_from("a").is_none());
        assert!(game.pending_request_not_from("b").is_some());

        if let Some(request) = game.pending_request_not_from("b") {
            request.accepted = true;
        }
        assert!(!game.has_pending_request_from("a"));
        assert!(game.pending_request_not_from("b").is_none());
    }
}
