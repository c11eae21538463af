//! The coordinator task
//!
//! One task owns the session registry, the connection table and the store
//! handle. Transport tasks talk to it through a [`CoordinatorHandle`]; every
//! command is handled to completion before the next is taken off the channel,
//! so handlers never observe a half-updated registry. Store calls are awaited
//! inline, which also serializes them with respect to other events.

pub mod chat;
pub mod command;
pub mod disconnect;
pub mod matchmaker;
pub mod rematch;
pub mod relay;
pub mod settlement;

pub use command::{Command, CoordinatorHandle, CoordinatorStats, Outbox};

use crate::config::MatchmakingSettings;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::rating::{EloCalculator, EloConfig};
use crate::session::{SessionRegistry, SessionStatus};
use crate::store::{GameStore, TimedGameStore};
use crate::types::{ConnectionId, GameId, PlayerProfile};
use crate::utils::current_timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Per-connection state
#[derive(Debug)]
struct Connection {
    outbound: Outbox,
    /// Profile bound by the first `find-match`
    player: Option<PlayerProfile>,
}

/// Single owner of all live matchmaking state
pub struct Coordinator {
    registry: SessionRegistry,
    connections: HashMap<ConnectionId, Connection>,
    store: Arc<dyn GameStore>,
    settings: MatchmakingSettings,
    elo: EloCalculator,
    metrics: Arc<MetricsCollector>,
    /// Used by deferred timers; does not keep the task alive
    commands: mpsc::WeakSender<Command>,
}

impl Coordinator {
    /// Build a coordinator around an existing command channel
    pub fn new(
        store: Arc<dyn GameStore>,
        settings: MatchmakingSettings,
        metrics: Arc<MetricsCollector>,
        commands: mpsc::WeakSender<Command>,
    ) -> Result<Self> {
        let elo = EloCalculator::new(EloConfig {
            k_factor: settings.k_factor,
        })?;

        let store: Arc<dyn GameStore> =
            Arc::new(TimedGameStore::new(store, settings.store_timeout()));

        Ok(Self {
            registry: SessionRegistry::new(),
            connections: HashMap::new(),
            store,
            settings,
            elo,
            metrics,
            commands,
        })
    }

    /// Create the command channel and spawn the coordinator task
    pub fn spawn(
        store: Arc<dyn GameStore>,
        settings: MatchmakingSettings,
        metrics: Arc<MetricsCollector>,
        buffer: usize,
    ) -> Result<(CoordinatorHandle, JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let coordinator = Self::new(store, settings, metrics, tx.downgrade())?;
        let task = tokio::spawn(coordinator.run(rx));
        Ok((CoordinatorHandle::new(tx), task))
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!(
            "Coordinator started - game_start_delay_ms: {}, k_factor: {}, store_timeout_ms: {}",
            self.settings.game_start_delay_ms,
            self.settings.k_factor,
            self.settings.store_timeout_ms
        );

        while let Some(command) = rx.recv().await {
            let name = command.name();
            let timer = self.metrics.start_timer();
            self.dispatch(command).await;
            self.metrics.record_command(name, timer.stop());
        }

        info!(
            "Coordinator stopped - queued: {}, active_sessions: {}",
            self.registry.queued_count(),
            self.registry.active_count()
        );
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Connect {
                connection_id,
                outbound,
            } => {
                debug!("Connection opened - connection_id: {}", connection_id);
                self.metrics.record_connection_opened();
                self.connections.insert(
                    connection_id,
                    Connection {
                        outbound,
                        player: None,
                    },
                );
            }
            Command::Message {
                connection_id,
                message,
            } => {
                self.metrics.record_message(message.event_name());
                self.handle_message(connection_id, message).await;
            }
            Command::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id).await;
            }
            Command::StartGame { game_id } => {
                self.handle_start_game(&game_id);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    async fn handle_message(&mut self, connection_id: ConnectionId, message: ClientMessage) {
        if !self.connections.contains_key(&connection_id) {
            debug!(
                "Dropping event from unknown connection - connection_id: {}, event: {}",
                connection_id,
                message.event_name()
            );
            return;
        }

        match message {
            ClientMessage::FindMatch { player } => {
                self.request_match(connection_id, player).await;
            }
            ClientMessage::CancelMatch => {
                self.cancel_match(connection_id);
            }
            ClientMessage::GameUpdate {
                game_id,
                kind,
                board,
                score,
                lines,
            } => {
                self.apply_update(connection_id, &game_id, kind, board, score, lines);
            }
            ClientMessage::GameOver {
                game_id,
                winner,
                loser,
                final_score,
                lines_cleared,
            } => {
                self.report_result(connection_id, &game_id, winner, loser, final_score, lines_cleared)
                    .await;
            }
            ClientMessage::Forfeit { game_id } => {
                self.forfeit(connection_id, &game_id).await;
            }
            ClientMessage::RematchRequest { game_id } => {
                self.request_rematch(connection_id, &game_id).await;
            }
            ClientMessage::RematchAccept { game_id } => {
                self.accept_rematch(connection_id, &game_id).await;
            }
            ClientMessage::ChatMessage { game_id, message } => {
                self.post_chat(connection_id, &game_id, &message).await;
            }
        }
    }

    /// Deliver `GameStart` if the session survived the settle delay
    fn handle_start_game(&mut self, game_id: &str) {
        let now = current_timestamp();
        let recipients = match self.registry.get_mut(game_id) {
            Ok(session) if session.status() == SessionStatus::Playing => {
                session.mark_started(now);
                session.connection_ids()
            }
            Ok(_) => return,
            Err(e) => {
                debug!("Skipping game start - {}", e);
                return;
            }
        };

        info!("Game started - game_id: {}", game_id);
        self.send_all(
            &recipients,
            ServerMessage::GameStart {
                game_id: game_id.to_string(),
            },
        );
    }

    /// Fire `StartGame` for `game_id` after the configured delay
    fn schedule_game_start(&self, game_id: GameId) {
        let commands = self.commands.clone();
        let delay = self.settings.game_start_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::StartGame { game_id }).await;
            }
        });
    }

    fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            queued: self.registry.queued_count(),
            active_sessions: self.registry.active_count(),
            connections: self.connections.len(),
        }
    }

    /// Queue a message for one connection; closed connections are skipped
    fn send(&self, connection_id: ConnectionId, message: ServerMessage) {
        if let Some(connection) = self.connections.get(&connection_id) {
            if connection.outbound.send(message).is_err() {
                debug!(
                    "Outbound queue closed - connection_id: {}",
                    connection_id
                );
            }
        }
    }

    fn send_all(&self, connection_ids: &[ConnectionId], message: ServerMessage) {
        for connection_id in connection_ids {
            self.send(*connection_id, message.clone());
        }
    }

    fn reply_error(&self, connection_id: ConnectionId, code: ErrorCode, message: &str) {
        warn!(
            "Rejecting client event - connection_id: {}, code: {:?}, reason: {}",
            connection_id, code, message
        );
        self.send(connection_id, ServerMessage::error(code, message));
    }

    /// Profile bound to a connection, answering `not-identified` when absent
    fn identified(&self, connection_id: ConnectionId) -> Option<PlayerProfile> {
        let player = self
            .connections
            .get(&connection_id)
            .and_then(|c| c.player.clone());
        if player.is_none() {
            self.reply_error(
                connection_id,
                ErrorCode::NotIdentified,
                "Send find-match before other game events",
            );
        }
        player
    }

    /// Connections currently bound to any of `player_ids`
    fn connections_of(&self, player_ids: &[&str]) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, c)| {
                c.player
                    .as_ref()
                    .map(|p| player_ids.contains(&p.id.as_str()))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn store_failed(&self, operation: &str, key: &str, err: &anyhow::Error) {
        self.metrics.record_store_error(operation);
        error!(
            "Durable store operation failed - operation: {}, key: {}, error: {:#}",
            operation, key, err
        );
    }
}
