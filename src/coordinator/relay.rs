//! Live state relay between the two participants of a session

use super::Coordinator;
use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, UpdateKind};
use tracing::debug;

impl Coordinator {
    /// Store the sender's latest state and forward it to the opponent only.
    ///
    /// Updates for unknown sessions, from non-participants, or before
    /// `game-start` are dropped without a reply.
    pub(super) fn apply_update(
        &mut self,
        connection_id: ConnectionId,
        game_id: &str,
        kind: UpdateKind,
        board: Option<serde_json::Value>,
        score: Option<u64>,
        lines: Option<u32>,
    ) {
        let session = match self.registry.get_mut(game_id) {
            Ok(session) => session,
            Err(e) => {
                debug!("Dropping {} update - {}", kind, e);
                return;
            }
        };
        let Some(index) = session.index_of_connection(connection_id) else {
            debug!(
                "Dropping {} update from non-participant - game_id: {}, connection_id: {}",
                kind, game_id, connection_id
            );
            return;
        };
        if !session.has_started() {
            debug!(
                "Dropping {} update before game start - game_id: {}",
                kind, game_id
            );
            return;
        }

        let opponent = session.opponent_of(index).connection_id;
        let Some(participant) = session.participant_mut(index) else {
            return;
        };
        match kind {
            UpdateKind::Board => {
                if let Some(board) = &board {
                    participant.live.board = board.clone();
                }
            }
            UpdateKind::Score => {
                if let Some(score) = score {
                    participant.live.score = score;
                }
                if let Some(lines) = lines {
                    participant.live.lines = lines;
                }
            }
        }
        let player_id = participant.player.id.clone();

        self.send(
            opponent,
            ServerMessage::GameUpdate {
                kind,
                board,
                score,
                lines,
                player_id,
            },
        );
    }
}
