//! Deadline wrapper for store calls
//!
//! The coordinator awaits store calls inline, so a call that never returns
//! would stall every session. `TimedGameStore` bounds each call; an expired
//! call surfaces as an ordinary store error.

use crate::error::{ArenaError, Result};
use crate::store::records::{ChatTranscript, GameRecord, UserRecord};
use crate::store::GameStore;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A [`GameStore`] whose every call must finish within `limit`
pub struct TimedGameStore {
    inner: Arc<dyn GameStore>,
    limit: Duration,
}

impl TimedGameStore {
    pub fn new(inner: Arc<dyn GameStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ArenaError::StoreFailure {
                message: format!(
                    "{} timed out after {}ms",
                    operation,
                    self.limit.as_millis()
                ),
            }
            .into()),
        }
    }
}

#[async_trait]
impl GameStore for TimedGameStore {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>> {
        self.bounded("find_user_by_id", self.inner.find_user_by_id(user_id))
            .await
    }

    async fn save_user(&self, user: UserRecord) -> Result<()> {
        self.bounded("save_user", self.inner.save_user(user)).await
    }

    async fn find_game_by_game_id(&self, game_id: &str) -> Result<Option<GameRecord>> {
        self.bounded("find_game_by_game_id", self.inner.find_game_by_game_id(game_id))
            .await
    }

    async fn save_game(&self, game: GameRecord) -> Result<()> {
        self.bounded("save_game", self.inner.save_game(game)).await
    }

    async fn find_chat_by_game_id(&self, game_id: &str) -> Result<Option<ChatTranscript>> {
        self.bounded("find_chat_by_game_id", self.inner.find_chat_by_game_id(game_id))
            .await
    }

    async fn save_chat(&self, chat: ChatTranscript) -> Result<()> {
        self.bounded("save_chat", self.inner.save_chat(chat)).await
    }
}
