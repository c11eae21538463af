//! Channel loss

use super::Coordinator;
use crate::protocol::ServerMessage;
use crate::session::SessionStatus;
use crate::store::GameStatus;
use crate::types::ConnectionId;
use crate::utils::{current_timestamp, elapsed_seconds};
use tracing::{debug, info, warn};

impl Coordinator {
    /// Drop the connection, its queue slot and its session.
    ///
    /// An abandoned session is never scored.
    pub(super) async fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        if self.connections.remove(&connection_id).is_some() {
            self.metrics.record_connection_closed();
        }
        debug!("Connection closed - connection_id: {}", connection_id);

        if self.registry.remove_from_queue(connection_id).is_some() {
            self.metrics
                .update_players_waiting(self.registry.queued_count());
        }

        let Some(game_id) = self.registry.session_for_connection(connection_id).cloned() else {
            return;
        };
        let mut session = match self.registry.remove(&game_id) {
            Ok(session) => session,
            Err(e) => {
                debug!("Abandonment skipped - {}", e);
                return;
            }
        };
        let now = current_timestamp();
        if let Err(e) = session.transition(SessionStatus::Abandoned, now) {
            warn!("Abandonment skipped - {}", e);
            return;
        }

        if let Some(index) = session.index_of_connection(connection_id) {
            let remaining = session.opponent_of(index).connection_id;
            self.send(remaining, ServerMessage::OpponentDisconnected);
        }
        let lifetime = (now - session.created_at()).to_std().unwrap_or_default();
        self.metrics.record_session_abandoned(lifetime);
        info!(
            "Session abandoned - game_id: {}, connection_id: {}",
            game_id, connection_id
        );

        match self.store.find_game_by_game_id(&game_id).await {
            Ok(Some(mut record)) if record.status == GameStatus::Active => {
                record.status = GameStatus::Abandoned;
                record.end_time = Some(now);
                record.duration = elapsed_seconds(record.start_time, now);
                if let Err(e) = self.store.save_game(record).await {
                    self.store_failed("save_game", &game_id, &e);
                }
            }
            Ok(_) => {
                debug!("No active game record to abandon - game_id: {}", game_id);
            }
            Err(e) => self.store_failed("find_game_by_game_id", &game_id, &e),
        }
    }
}
