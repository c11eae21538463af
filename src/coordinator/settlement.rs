//! Settlement: the one-time finalization of a session
//!
//! The session is taken out of the registry before anything else happens.
//! A second completion signal for the same game finds nothing to remove and
//! becomes a no-op, so ratings move at most once per session.

use super::Coordinator;
use crate::error::ArenaError;
use crate::protocol::{ErrorCode, ResultParty, ServerMessage, SettledParty};
use crate::session::{Session, SessionStatus};
use crate::store::{
    FinalScores, GamePlayer, GameRecord, GameStatus, ScoreLine, UserRecord, DEFAULT_GAME_TYPE,
};
use crate::types::ConnectionId;
use crate::utils::{current_timestamp, elapsed_seconds};
use tracing::{debug, info, warn};

impl Coordinator {
    /// Handle `game-over` reported by a participant
    pub(super) async fn report_result(
        &mut self,
        connection_id: ConnectionId,
        game_id: &str,
        winner: ResultParty,
        loser: ResultParty,
        final_score: u64,
        lines_cleared: u32,
    ) {
        let session = match self.registry.get(game_id) {
            Ok(session) => session,
            Err(e) => {
                self.ignore_completion(game_id, "game over", &e).await;
                return;
            }
        };

        if session.index_of_connection(connection_id).is_none() {
            self.reply_error(
                connection_id,
                ErrorCode::InvalidResult,
                "Only participants can report a result",
            );
            return;
        }

        let winner_index = match (
            session.index_of_player(&winner.id),
            session.index_of_player(&loser.id),
        ) {
            (Some(w), Some(l)) if w != l => w,
            _ => {
                self.reply_error(
                    connection_id,
                    ErrorCode::InvalidResult,
                    "Winner and loser must be the two participants",
                );
                return;
            }
        };

        let winner_line = ScoreLine {
            score: final_score,
            lines: lines_cleared,
        };
        self.settle(game_id, winner_index, winner_line, "game_over")
            .await;
    }

    /// Handle `forfeit`: notify the opponent, then settle in their favour
    pub(super) async fn forfeit(&mut self, connection_id: ConnectionId, game_id: &str) {
        let session = match self.registry.get(game_id) {
            Ok(session) => session,
            Err(e) => {
                self.ignore_completion(game_id, "forfeit", &e).await;
                return;
            }
        };
        let Some(index) = session.index_of_connection(connection_id) else {
            debug!(
                "Ignoring forfeit from non-participant - game_id: {}, connection_id: {}",
                game_id, connection_id
            );
            return;
        };

        let forfeiting = session.participants()[index].player.name.clone();
        let opponent = session.opponent_of(index);
        let opponent_connection = opponent.connection_id;
        let winner_line = ScoreLine {
            score: opponent.live.score,
            lines: opponent.live.lines,
        };

        info!(
            "Player forfeited - game_id: {}, player: '{}'",
            game_id, forfeiting
        );
        self.send(
            opponent_connection,
            ServerMessage::OpponentForfeited {
                player_name: forfeiting,
            },
        );
        self.settle(game_id, 1 - index, winner_line, "forfeit").await;
    }

    /// Finalize a session exactly once
    async fn settle(
        &mut self,
        game_id: &str,
        winner_index: usize,
        winner_line: ScoreLine,
        reason: &str,
    ) {
        let timer = self.metrics.start_timer();
        let now = current_timestamp();

        let mut session = match self.registry.remove(game_id) {
            Ok(session) => session,
            Err(e) if e.is_stale_reference() => {
                self.metrics.record_duplicate_settlement();
                debug!("Settlement skipped - {}", e);
                return;
            }
            Err(e) => {
                warn!("Settlement skipped - {}", e);
                return;
            }
        };
        if let Err(e) = session.transition(SessionStatus::Finished, now) {
            warn!("Settlement skipped - {}", e);
            return;
        }

        let winner = session.participants()[winner_index].clone();
        let loser = session.opponent_of(winner_index).clone();
        let loser_line = ScoreLine {
            score: loser.live.score,
            lines: loser.live.lines,
        };

        // Ratings come from the durable records, not the session snapshot
        let winner_user = self.load_user(&winner.player.id).await;
        let loser_user = self.load_user(&loser.player.id).await;
        let (delta, winner_after, loser_after) = match (winner_user, loser_user) {
            (Some(mut winner_user), Some(mut loser_user)) => {
                let settlement = self.elo.settle(winner_user.elo_rating, loser_user.elo_rating);
                winner_user.record_win(settlement.winner, now);
                loser_user.record_loss(settlement.winner, now);
                let after = (winner_user.elo_rating, loser_user.elo_rating);

                for user in [winner_user, loser_user] {
                    let user_id = user.id.clone();
                    if let Err(e) = self.store.save_user(user).await {
                        self.store_failed("save_user", &user_id, &e);
                    }
                }
                (settlement.winner, Some(after.0), Some(after.1))
            }
            _ => {
                warn!(
                    "Settling without rating change, user record missing - game_id: {}, winner: '{}', loser: '{}'",
                    game_id, winner.player.id, loser.player.id
                );
                (0, None, None)
            }
        };

        let mut record = match self.store.find_game_by_game_id(game_id).await {
            Ok(Some(record)) => record,
            Ok(None) => record_from_session(&session),
            Err(e) => {
                self.store_failed("find_game_by_game_id", game_id, &e);
                record_from_session(&session)
            }
        };
        record.status = GameStatus::Finished;
        record.winner = Some(winner.player.id.clone());
        record.loser = Some(loser.player.id.clone());
        record.end_time = Some(now);
        record.duration = elapsed_seconds(record.start_time, now);
        record.final_scores = Some(FinalScores {
            winner: winner_line,
            loser: loser_line,
        });
        for player in record.players.iter_mut() {
            if player.id == winner.player.id {
                player.elo_after = winner_after;
            } else if player.id == loser.player.id {
                player.elo_after = loser_after;
            }
        }
        if let Err(e) = self.store.save_game(record).await {
            self.store_failed("save_game", game_id, &e);
        }

        self.send_all(
            &session.connection_ids(),
            ServerMessage::GameOver {
                winner: SettledParty {
                    id: winner.player.id.clone(),
                    name: winner.player.name.clone(),
                    elo_change: delta,
                },
                loser: SettledParty {
                    id: loser.player.id.clone(),
                    name: loser.player.name.clone(),
                    elo_change: -delta,
                },
                final_score: winner_line.score,
                lines_cleared: winner_line.lines,
            },
        );

        let lifetime = (now - session.created_at()).to_std().unwrap_or_default();
        self.metrics.record_session_settled(reason, lifetime, delta);
        self.metrics.record_settlement(timer.stop());
        info!(
            "Session settled - game_id: {}, reason: {}, winner: '{}', loser: '{}', elo_change: {}",
            game_id, reason, winner.player.id, loser.player.id, delta
        );
    }

    /// A completion signal for a game with no live session. Only games the
    /// store already holds as finished count as duplicate settlements.
    async fn ignore_completion(&self, game_id: &str, signal: &str, err: &ArenaError) {
        match self.store.find_game_by_game_id(game_id).await {
            Ok(Some(record)) if record.status == GameStatus::Finished => {
                self.metrics.record_duplicate_settlement();
                debug!("Ignoring {}, already settled - game_id: {}", signal, game_id);
            }
            Ok(_) => debug!("Ignoring {} - {}", signal, err),
            Err(e) => self.store_failed("find_game_by_game_id", game_id, &e),
        }
    }

    /// Fetch a user, treating store failures as absent
    pub(super) async fn load_user(&self, user_id: &str) -> Option<UserRecord> {
        match self.store.find_user_by_id(user_id).await {
            Ok(user) => user,
            Err(e) => {
                self.store_failed("find_user_by_id", user_id, &e);
                None
            }
        }
    }
}

/// Rebuild the durable record of a session whose record is missing
fn record_from_session(session: &Session) -> GameRecord {
    GameRecord::new_active(
        session.id().clone(),
        session.players().iter().map(GamePlayer::from).collect(),
        DEFAULT_GAME_TYPE,
        session.original_game_id().cloned(),
        session.created_at(),
    )
}
