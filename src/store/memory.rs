//! In-memory store implementation
//!
//! Backs the service when no external database is wired in, and every test.

use crate::error::{ArenaError, Result};
use crate::store::records::{ChatTranscript, GameRecord, UserRecord};
use crate::store::GameStore;
use crate::types::{GameId, PlayerId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory durable store
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    users: RwLock<HashMap<PlayerId, UserRecord>>,
    games: RwLock<HashMap<GameId, GameRecord>>,
    chats: RwLock<HashMap<GameId, ChatTranscript>>,
}

fn lock_poisoned(what: &str) -> anyhow::Error {
    ArenaError::StoreFailure {
        message: format!("Failed to acquire {} lock", what),
    }
    .into()
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed users (test and dev convenience)
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.users.write() {
            for user in users {
                map.insert(user.id.clone(), user);
            }
        }
        store
    }

    /// Number of stored game records
    pub fn game_count(&self) -> Result<usize> {
        let games = self.games.read().map_err(|_| lock_poisoned("games read"))?;
        Ok(games.len())
    }

    /// All game records involving a player, oldest first
    pub fn games_for_player(&self, player_id: &str) -> Result<Vec<GameRecord>> {
        let games = self.games.read().map_err(|_| lock_poisoned("games read"))?;
        let mut found: Vec<GameRecord> = games
            .values()
            .filter(|g| g.has_player(player_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(found)
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().map_err(|_| lock_poisoned("users read"))?;
        Ok(users.get(user_id).cloned())
    }

    async fn save_user(&self, user: UserRecord) -> Result<()> {
        let mut users = self.users.write().map_err(|_| lock_poisoned("users write"))?;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn find_game_by_game_id(&self, game_id: &str) -> Result<Option<GameRecord>> {
        let games = self.games.read().map_err(|_| lock_poisoned("games read"))?;
        Ok(games.get(game_id).cloned())
    }

    async fn save_game(&self, game: GameRecord) -> Result<()> {
        let mut games = self.games.write().map_err(|_| lock_poisoned("games write"))?;
        games.insert(game.game_id.clone(), game);
        Ok(())
    }

    async fn find_chat_by_game_id(&self, game_id: &str) -> Result<Option<ChatTranscript>> {
        let chats = self.chats.read().map_err(|_| lock_poisoned("chats read"))?;
        Ok(chats.get(game_id).cloned())
    }

    async fn save_chat(&self, chat: ChatTranscript) -> Result<()> {
        let mut chats = self.chats.write().map_err(|_| lock_poisoned("chats write"))?;
        chats.insert(chat.game_id.clone(), chat);
        Ok(())
    }
}
