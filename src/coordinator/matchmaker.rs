//! Pairing queued connections into sessions

use super::Coordinator;
use crate::protocol::{ErrorCode, ServerMessage};
use crate::session::{Participant, QueueEntry};
use crate::store::{ChatTranscript, GamePlayer, GameRecord, DEFAULT_GAME_TYPE};
use crate::types::{ConnectionId, GameId, PlayerProfile, PlayerRef};
use crate::utils::{current_timestamp, generate_game_id};
use std::time::Duration;
use tracing::{debug, error, info};

impl Coordinator {
    /// Pair with the longest-waiting connection, or join the queue
    pub(super) async fn request_match(&mut self, connection_id: ConnectionId, player: PlayerProfile) {
        info!(
            "Processing match request - connection_id: {}, player_id: '{}'",
            connection_id, player.id
        );

        if !self.registry.is_free(connection_id, &player.id) {
            self.metrics.record_match_request("rejected");
            self.reply_error(
                connection_id,
                ErrorCode::AlreadyQueued,
                "You are already in queue or in a game",
            );
            return;
        }

        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.player = Some(player.clone());
        }

        let now = current_timestamp();
        let Some(opponent) = self.registry.dequeue_next() else {
            let entry = QueueEntry {
                connection_id,
                player,
                joined_at: now,
            };
            if let Err(e) = self.registry.enqueue(entry) {
                self.metrics.record_match_request("rejected");
                self.reply_error(connection_id, ErrorCode::AlreadyQueued, &e.to_string());
                return;
            }
            self.metrics.record_match_request("queued");
            self.metrics
                .update_players_waiting(self.registry.queued_count());
            debug!(
                "Player waiting for opponent - connection_id: {}, queue_depth: {}",
                connection_id,
                self.registry.queued_count()
            );
            self.send(connection_id, ServerMessage::WaitingForOpponent);
            return;
        };
        self.metrics
            .update_players_waiting(self.registry.queued_count());
        self.metrics.record_match_request("matched");

        let requester_rating = self.rating_snapshot(&player).await;
        let opponent_rating = self.rating_snapshot(&opponent.player).await;

        let game_id = generate_game_id(connection_id, opponent.connection_id, now);
        let participants = [
            Participant::new(connection_id, PlayerRef::from_profile(&player, requester_rating)),
            Participant::new(
                opponent.connection_id,
                PlayerRef::from_profile(&opponent.player, opponent_rating),
            ),
        ];
        let players: Vec<PlayerRef> = participants.iter().map(|p| p.player.clone()).collect();
        let queue_wait = (now - opponent.joined_at).to_std().unwrap_or_default();

        if !self.open_session(game_id.clone(), participants, None, "match", Some(queue_wait)) {
            return;
        }

        info!(
            "Match found - game_id: {}, players: '{}' ({}) vs '{}' ({}), queue_wait: {:.1}s",
            game_id,
            players[0].id,
            requester_rating,
            players[1].id,
            opponent_rating,
            queue_wait.as_secs_f64()
        );

        let record = GameRecord::new_active(
            game_id.clone(),
            players.iter().map(GamePlayer::from).collect(),
            DEFAULT_GAME_TYPE,
            None,
            now,
        );
        if let Err(e) = self.store.save_game(record).await {
            self.store_failed("save_game", &game_id, &e);
        }
        if let Err(e) = self
            .store
            .save_chat(ChatTranscript::new(game_id.clone(), now))
            .await
        {
            self.store_failed("save_chat", &game_id, &e);
        }

        self.send_all(
            &[connection_id, opponent.connection_id],
            ServerMessage::MatchFound { game_id, players },
        );
    }

    /// Leave the queue; always answered with `match-cancelled`
    pub(super) fn cancel_match(&mut self, connection_id: ConnectionId) {
        if self.registry.remove_from_queue(connection_id).is_some() {
            debug!("Match request cancelled - connection_id: {}", connection_id);
            self.metrics
                .update_players_waiting(self.registry.queued_count());
        }
        self.send(connection_id, ServerMessage::MatchCancelled);
    }

    /// Register a live session and arm its game-start timer
    pub(super) fn open_session(
        &mut self,
        game_id: GameId,
        participants: [Participant; 2],
        original_game_id: Option<GameId>,
        origin: &str,
        queue_wait: Option<Duration>,
    ) -> bool {
        let now = current_timestamp();
        if let Err(e) =
            self.registry
                .create_session(game_id.clone(), participants, original_game_id, now)
        {
            error!("Failed to register session {} - {}", game_id, e);
            return false;
        }
        self.metrics.record_session_created(origin, queue_wait);
        self.schedule_game_start(game_id);
        true
    }

    /// Rating frozen into the session: durable record first, then the
    /// client-supplied rating, then the configured default
    pub(super) async fn rating_snapshot(&self, profile: &PlayerProfile) -> i32 {
        let fallback = profile.elo_rating.unwrap_or(self.settings.default_rating);
        match self.store.find_user_by_id(&profile.id).await {
            Ok(Some(user)) => user.elo_rating,
            Ok(None) => fallback,
            Err(e) => {
                self.store_failed("find_user_by_id", &profile.id, &e);
                fallback
            }
        }
    }
}
