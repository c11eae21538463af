//! Rematch handshake on finished games
//!
//! Requests live on the durable game record because the live session is gone
//! by the time players ask for a rematch. A record links to at most one
//! successor through `rematch_game_id`.

use super::Coordinator;
use crate::protocol::ServerMessage;
use crate::session::Participant;
use crate::store::{ChatTranscript, GamePlayer, GameRecord, RematchRequest};
use crate::types::{ConnectionId, PlayerId, PlayerRef};
use crate::utils::{current_timestamp, generate_rematch_id};
use tracing::{debug, info};

impl Coordinator {
    /// Record a pending rematch request and tell both players
    pub(super) async fn request_rematch(&mut self, connection_id: ConnectionId, game_id: &str) {
        let Some(player) = self.identified(connection_id) else {
            return;
        };
        let Some(mut record) = self.load_game(game_id).await else {
            return;
        };
        if !record.has_player(&player.id) {
            debug!(
                "Ignoring rematch request from non-player - game_id: {}, player_id: '{}'",
                game_id, player.id
            );
            return;
        }
        if record.rematch_game_id.is_some() || record.has_pending_request_from(&player.id) {
            debug!(
                "Rematch request already pending or spawned - game_id: {}, player_id: '{}'",
                game_id, player.id
            );
            return;
        }

        record.rematch_requests.push(RematchRequest {
            player_id: player.id.clone(),
            timestamp: current_timestamp(),
            accepted: false,
        });
        let player_ids = player_ids(&record);
        if let Err(e) = self.store.save_game(record).await {
            self.store_failed("save_game", game_id, &e);
            return;
        }

        info!(
            "Rematch requested - game_id: {}, player_id: '{}'",
            game_id, player.id
        );
        let recipients = self.connections_of(&as_strs(&player_ids));
        self.send_all(
            &recipients,
            ServerMessage::RematchRequested {
                player_id: player.id,
                player_name: player.name,
            },
        );
    }

    /// Accept the opponent's pending request and spawn the successor game
    pub(super) async fn accept_rematch(&mut self, connection_id: ConnectionId, game_id: &str) {
        let Some(player) = self.identified(connection_id) else {
            return;
        };
        let Some(mut record) = self.load_game(game_id).await else {
            return;
        };
        if !record.has_player(&player.id) || record.rematch_game_id.is_some() {
            debug!(
                "Ignoring rematch accept - game_id: {}, player_id: '{}'",
                game_id, player.id
            );
            return;
        }
        let Some(request) = record.pending_request_not_from(&player.id) else {
            debug!(
                "No pending rematch request to accept - game_id: {}, player_id: '{}'",
                game_id, player.id
            );
            return;
        };
        request.accepted = true;

        let now = current_timestamp();
        let rematch_game_id = generate_rematch_id(game_id, now);
        let mut players = Vec::with_capacity(record.players.len());
        for previous in record.players.iter() {
            let rating = match self.load_user(&previous.id).await {
                Some(user) => user.elo_rating,
                None => previous.elo_after.unwrap_or(previous.elo_before),
            };
            players.push(GamePlayer {
                elo_before: rating,
                elo_after: None,
                ..previous.clone()
            });
        }
        let successor = GameRecord::new_active(
            rematch_game_id.clone(),
            players.clone(),
            record.game_type.clone(),
            Some(game_id.to_string()),
            now,
        );
        record.rematch_game_id = Some(rematch_game_id.clone());

        if let Err(e) = self.store.save_game(record).await {
            self.store_failed("save_game", game_id, &e);
            return;
        }
        if let Err(e) = self.store.save_game(successor).await {
            self.store_failed("save_game", &rematch_game_id, &e);
        }
        if let Err(e) = self
            .store
            .save_chat(ChatTranscript::new(rematch_game_id.clone(), now))
            .await
        {
            self.store_failed("save_chat", &rematch_game_id, &e);
        }

        info!(
            "Rematch accepted - game_id: {}, rematch_game_id: {}",
            game_id, rematch_game_id
        );
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let recipients = self.connections_of(&as_strs(&ids));
        self.send_all(
            &recipients,
            ServerMessage::RematchAccepted {
                rematch_game_id: rematch_game_id.clone(),
                players: players.clone(),
            },
        );

        self.activate_rematch(rematch_game_id, game_id, &players);
    }

    /// Register the successor as a live session when both players are online
    /// and free; otherwise it stays a durable record only
    fn activate_rematch(&mut self, rematch_game_id: String, game_id: &str, players: &[GamePlayer]) {
        let [first, second] = players else {
            return;
        };
        let (Some(first_connection), Some(second_connection)) =
            (self.free_connection_of(&first.id), self.free_connection_of(&second.id))
        else {
            debug!(
                "Rematch not activated, a player is offline or busy - rematch_game_id: {}",
                rematch_game_id
            );
            return;
        };

        let participants = [
            Participant::new(first_connection, player_ref(first)),
            Participant::new(second_connection, player_ref(second)),
        ];
        self.open_session(
            rematch_game_id,
            participants,
            Some(game_id.to_string()),
            "rematch",
            None,
        );
    }

    /// A connection bound to `player_id` that is neither queued nor playing
    fn free_connection_of(&self, player_id: &str) -> Option<ConnectionId> {
        self.connections_of(&[player_id])
            .into_iter()
            .find(|id| self.registry.is_free(*id, player_id))
    }

    pub(super) async fn load_game(&self, game_id: &str) -> Option<GameRecord> {
        match self.store.find_game_by_game_id(game_id).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!("No game record - game_id: {}", game_id);
                None
            }
            Err(e) => {
                self.store_failed("find_game_by_game_id", game_id, &e);
                None
            }
        }
    }
}

fn player_ids(record: &GameRecord) -> Vec<PlayerId> {
    record.players.iter().map(|p| p.id.clone()).collect()
}

fn as_strs(ids: &[PlayerId]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

fn player_ref(player: &GamePlayer) -> PlayerRef {
    PlayerRef {
        id: player.id.clone(),
        name: player.name.clone(),
        avatar: player.avatar.clone(),
        rating_at_session_start: player.elo_before,
    }
}
