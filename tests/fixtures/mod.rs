//! Test fixtures for driving the coordinator end to end

#![allow(dead_code)]

use arena_room::config::MatchmakingSettings;
use arena_room::coordinator::{Coordinator, CoordinatorHandle};
use arena_room::metrics::MetricsCollector;
use arena_room::protocol::{ClientMessage, ResultParty, ServerMessage};
use arena_room::store::{GameStore, InMemoryGameStore, UserRecord};
use arena_room::types::{ConnectionId, GameId, PlayerProfile, UpdateKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Settle delay used by the harness
pub const TEST_START_DELAY_MS: u64 = 20;

/// How long to wait for an expected server message
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A running coordinator over an in-memory store
pub struct TestHarness {
    pub handle: CoordinatorHandle,
    pub store: Arc<InMemoryGameStore>,
    pub metrics: Arc<MetricsCollector>,
    _task: JoinHandle<()>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    /// Seed the store with user records before starting
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self::with_settings(users, test_settings())
    }

    pub fn with_settings(users: Vec<UserRecord>, settings: MatchmakingSettings) -> Self {
        let store = Arc::new(InMemoryGameStore::with_users(users));
        let metrics = Arc::new(MetricsCollector::new().expect("Failed to create collector"));
        let (handle, task) = Coordinator::spawn(
            store.clone() as Arc<dyn GameStore>,
            settings,
            metrics.clone(),
            64,
        )
        .expect("Failed to spawn coordinator");

        Self {
            handle,
            store,
            metrics,
            _task: task,
        }
    }

    /// Open a new connection
    pub async fn connect(&self) -> TestClient {
        let connection_id = ConnectionId::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.handle
            .connect(connection_id, tx)
            .await
            .expect("Failed to connect");

        TestClient {
            connection_id,
            handle: self.handle.clone(),
            rx,
        }
    }

    /// Connect two players and play them into a started session
    pub async fn started_pair(&self, first: &str, second: &str) -> (TestClient, TestClient, GameId) {
        let mut a = self.connect().await;
        let mut b = self.connect().await;

        a.find_match(profile(first)).await;
        a.expect("waiting-for-opponent").await;
        b.find_match(profile(second)).await;

        let game_id = match b.expect("match-found").await {
            ServerMessage::MatchFound { game_id, .. } => game_id,
            _ => unreachable!(),
        };
        a.expect("match-found").await;
        a.expect("game-start").await;
        b.expect("game-start").await;

        (a, b, game_id)
    }

    pub async fn user(&self, id: &str) -> UserRecord {
        self.store
            .find_user_by_id(id)
            .await
            .expect("store read failed")
            .expect("user missing")
    }
}

/// One simulated client connection
pub struct TestClient {
    pub connection_id: ConnectionId,
    handle: CoordinatorHandle,
    rx: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    pub async fn send(&self, message: ClientMessage) {
        self.handle
            .submit(self.connection_id, message)
            .await
            .expect("Coordinator unavailable");
    }

    pub async fn find_match(&self, player: PlayerProfile) {
        self.send(ClientMessage::FindMatch { player }).await;
    }

    pub async fn update_score(&self, game_id: &str, score: u64, lines: u32) {
        self.send(ClientMessage::GameUpdate {
            game_id: game_id.to_string(),
            kind: UpdateKind::Score,
            board: None,
            score: Some(score),
            lines: Some(lines),
        })
        .await;
    }

    pub async fn game_over(&self, game_id: &str, winner: &str, loser: &str, score: u64, lines: u32) {
        self.send(ClientMessage::GameOver {
            game_id: game_id.to_string(),
            winner: party(winner),
            loser: party(loser),
            final_score: score,
            lines_cleared: lines,
        })
        .await;
    }

    pub async fn disconnect(self) {
        self.handle
            .disconnect(self.connection_id)
            .await
            .expect("Coordinator unavailable");
    }

    /// Next server message, failing the test after [`RECV_TIMEOUT`]
    pub async fn next(&mut self) -> ServerMessage {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for server message")
            .expect("outbound queue closed")
    }

    /// Next server message, which must be `event`
    pub async fn expect(&mut self, event: &str) -> ServerMessage {
        let message = self.next().await;
        assert_eq!(
            message.event_name(),
            event,
            "unexpected message: {:?}",
            message
        );
        message
    }

    /// Assert nothing arrives within `wait`
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(Some(message)) = tokio::time::timeout(wait, self.rx.recv()).await {
            panic!("expected no message, got {:?}", message);
        }
    }
}

pub fn test_settings() -> MatchmakingSettings {
    MatchmakingSettings {
        game_start_delay_ms: TEST_START_DELAY_MS,
        ..MatchmakingSettings::default()
    }
}

pub fn profile(id: &str) -> PlayerProfile {
    PlayerProfile {
        id: id.to_string(),
        name: format!("Player {}", id),
        avatar: None,
        custom_avatar: None,
        elo_rating: None,
    }
}

pub fn party(id: &str) -> ResultParty {
    ResultParty {
        id: id.to_string(),
        name: format!("Player {}", id),
    }
}

pub fn user(id: &str, rating: i32) -> UserRecord {
    UserRecord::new(id, format!("Player {}", id)).with_rating(rating)
}

/// Yield long enough for the coordinator to drain pending commands
pub async fn settle(handle: &CoordinatorHandle) {
    handle.stats().await.expect("Coordinator unavailable");
}
