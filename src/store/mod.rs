//! Durable store collaborator
//!
//! Users, game records and chat transcripts live behind the `GameStore`
//! trait. Writes are single-document; nothing here relies on cross-document
//! transactions.

pub mod memory;
pub mod records;
pub mod timeout;

use crate::error::Result;
use async_trait::async_trait;

pub use memory::InMemoryGameStore;
pub use records::{
    ChatEntry, ChatKind, ChatSender, ChatTranscript, FinalScores, GamePlayer, GameRecord,
    GameStatus, RematchRequest, ScoreLine, UserRecord, DEFAULT_GAME_TYPE,
};
pub use timeout::TimedGameStore;

/// Trait for durable store operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Get a user by id
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Insert or replace a user record
    async fn save_user(&self, user: UserRecord) -> Result<()>;

    /// Get a game record by its game id
    async fn find_game_by_game_id(&self, game_id: &str) -> Result<Option<GameRecord>>;

    /// Insert or replace a game record
    async fn save_game(&self, game: GameRecord) -> Result<()>;

    /// Get the chat transcript of a game
    async fn find_chat_by_game_id(&self, game_id: &str) -> Result<Option<ChatTranscript>>;

    /// Insert or replace a chat transcript
    async fn save_chat(&self, chat: ChatTranscript) -> Result<()>;
}
