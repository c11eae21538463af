//! Commands accepted by the coordinator task and the handle that sends them

use crate::error::{ArenaError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::{ConnectionId, GameId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Outbound queue of one connection
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Inbound event for the coordinator
#[derive(Debug)]
pub enum Command {
    /// A channel opened
    Connect {
        connection_id: ConnectionId,
        outbound: Outbox,
    },
    /// A parsed client event
    Message {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    /// A channel closed
    Disconnect { connection_id: ConnectionId },
    /// Deferred game start, fired after the settle delay
    StartGame { game_id: GameId },
    /// Point-in-time statistics query
    Stats {
        reply: oneshot::Sender<CoordinatorStats>,
    },
}

impl Command {
    /// Label used for metrics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Message { message, .. } => message.event_name(),
            Command::Disconnect { .. } => "disconnect",
            Command::StartGame { .. } => "start-game",
            Command::Stats { .. } => "stats",
        }
    }
}

/// Snapshot of coordinator state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    /// Connections waiting for an opponent
    pub queued: usize,
    /// Sessions in the registry
    pub active_sessions: usize,
    /// Open connections
    pub connections: usize,
}

/// Cloneable sender side of the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    /// Register a new connection and its outbound queue
    pub async fn connect(&self, connection_id: ConnectionId, outbound: Outbox) -> Result<()> {
        self.send(Command::Connect {
            connection_id,
            outbound,
        })
        .await
    }

    /// Forward a client event
    pub async fn submit(&self, connection_id: ConnectionId, message: ClientMessage) -> Result<()> {
        self.send(Command::Message {
            connection_id,
            message,
        })
        .await
    }

    /// Report a closed connection
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<()> {
        self.send(Command::Disconnect { connection_id }).await
    }

    /// Query queue depth, session count and connection count
    pub async fn stats(&self) -> Result<CoordinatorStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| {
            ArenaError::CoordinatorUnavailable {
                message: "stats reply dropped".to_string(),
            }
            .into()
        })
    }

    /// Whether the coordinator task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| {
            ArenaError::CoordinatorUnavailable {
                message: "command channel closed".to_string(),
            }
            .into()
        })
    }
}
