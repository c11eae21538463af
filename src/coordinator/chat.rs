//! In-game chat

use super::Coordinator;
use crate::protocol::{ErrorCode, ServerMessage};
use crate::store::{ChatEntry, ChatKind, ChatSender, ChatTranscript};
use crate::types::{ConnectionId, PlayerId};
use crate::utils::current_timestamp;
use tracing::debug;

impl Coordinator {
    /// Append a message to the game's transcript and broadcast it to the
    /// game's players
    pub(super) async fn post_chat(&mut self, connection_id: ConnectionId, game_id: &str, message: &str) {
        let Some(player) = self.identified(connection_id) else {
            return;
        };

        let text = message.trim();
        let max = self.settings.max_chat_message_length;
        if text.is_empty() || text.chars().count() > max {
            self.reply_error(
                connection_id,
                ErrorCode::InvalidChatMessage,
                &format!("Chat messages must be 1 to {} characters", max),
            );
            return;
        }

        // Live participants first, then the players of the durable record
        let members: Vec<PlayerId> = match self.registry.get(game_id) {
            Ok(session) => session.players().into_iter().map(|p| p.id).collect(),
            Err(_) => match self.load_game(game_id).await {
                Some(record) => record.players.into_iter().map(|p| p.id).collect(),
                None => return,
            },
        };
        if !members.contains(&player.id) {
            self.reply_error(
                connection_id,
                ErrorCode::InvalidChatMessage,
                "Not a player of this game",
            );
            return;
        }

        let now = current_timestamp();
        let entry = ChatEntry {
            id: now.timestamp_millis(),
            game_id: game_id.to_string(),
            sender: ChatSender {
                id: player.id.clone(),
                name: player.name.clone(),
                avatar: player.avatar_ref(),
            },
            message: text.to_string(),
            kind: ChatKind::Chat,
            timestamp: now,
        };

        let mut transcript = match self.store.find_chat_by_game_id(game_id).await {
            Ok(Some(transcript)) => transcript,
            Ok(None) => ChatTranscript::new(game_id.to_string(), now),
            Err(e) => {
                self.store_failed("find_chat_by_game_id", game_id, &e);
                return;
            }
        };
        transcript.push(entry.clone());
        if let Err(e) = self.store.save_chat(transcript).await {
            self.store_failed("save_chat", game_id, &e);
            return;
        }

        debug!(
            "Chat message posted - game_id: {}, player_id: '{}'",
            game_id, player.id
        );
        let member_ids: Vec<&str> = members.iter().map(String::as_str).collect();
        let recipients = self.connections_of(&member_ids);
        self.send_all(&recipients, ServerMessage::ChatMessage { entry });
    }
}
