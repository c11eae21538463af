//! Integration tests for the arena-room coordinator
//!
//! These tests drive the coordinator through its handle the way socket tasks
//! do, covering:
//! - First-come-first-served pairing and the deferred game start
//! - Live state relay between opponents
//! - Exactly-once settlement and rating updates
//! - Forfeits, disconnects and abandonment
//! - The rematch handshake and chat

mod fixtures;

use arena_room::protocol::{ClientMessage, ErrorCode, ServerMessage};
use arena_room::store::{GameStatus, GameStore, ScoreLine};
use arena_room::types::UpdateKind;
use fixtures::{party, profile, settle, user, TestHarness, TEST_START_DELAY_MS};
use std::time::Duration;

fn quiet_period() -> Duration {
    Duration::from_millis(TEST_START_DELAY_MS * 5)
}

fn error_code(message: ServerMessage) -> ErrorCode {
    match message {
        ServerMessage::Error { code, .. } => code,
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pairing_is_first_come_first_served() {
    let harness = TestHarness::new();
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;
    let mut c = harness.connect().await;

    a.find_match(profile("a")).await;
    a.expect("waiting-for-opponent").await;

    b.find_match(profile("b")).await;
    match b.expect("match-found").await {
        ServerMessage::MatchFound { players, .. } => {
            let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids, vec!["b", "a"]);
            assert!(players.iter().all(|p| p.rating_at_session_start == 1200));
        }
        _ => unreachable!(),
    }
    a.expect("match-found").await;

    c.find_match(profile("c")).await;
    c.expect("waiting-for-opponent").await;

    a.expect("game-start").await;
    b.expect("game-start").await;

    let stats = harness.handle.stats().await.unwrap();
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.active_sessions, 1);
    assert_eq!(stats.connections, 3);
}

#[tokio::test]
async fn test_match_found_carries_stored_rating() {
    let harness = TestHarness::with_users(vec![user("a", 1400)]);
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;

    let mut claimed = profile("a");
    claimed.elo_rating = Some(1000);
    a.find_match(claimed).await;
    a.expect("waiting-for-opponent").await;

    let mut b_profile = profile("b");
    b_profile.elo_rating = Some(1300);
    b.find_match(b_profile).await;

    match b.expect("match-found").await {
        ServerMessage::MatchFound { game_id, players } => {
            assert_eq!(players[0].rating_at_session_start, 1300);
            assert_eq!(players[1].rating_at_session_start, 1400);

            let record = harness
                .store
                .find_game_by_game_id(&game_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.status, GameStatus::Active);
            assert_eq!(record.player("a").unwrap().elo_before, 1400);
            assert!(harness
                .store
                .find_chat_by_game_id(&game_id)
                .await
                .unwrap()
                .is_some());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_duplicate_match_requests_are_rejected() {
    let harness = TestHarness::new();
    let mut a = harness.connect().await;
    let mut a_again = harness.connect().await;

    a.find_match(profile("a")).await;
    a.expect("waiting-for-opponent").await;

    a.find_match(profile("a")).await;
    assert_eq!(error_code(a.expect("error").await), ErrorCode::AlreadyQueued);

    // Same player from a second connection
    a_again.find_match(profile("a")).await;
    assert_eq!(
        error_code(a_again.expect("error").await),
        ErrorCode::AlreadyQueued
    );

    let stats = harness.handle.stats().await.unwrap();
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.active_sessions, 0);
}

#[tokio::test]
async fn test_player_in_session_cannot_queue() {
    let harness = TestHarness::new();
    let (mut a, _b, _game_id) = harness.started_pair("a", "b").await;

    a.find_match(profile("a")).await;
    assert_eq!(error_code(a.expect("error").await), ErrorCode::AlreadyQueued);
}

#[tokio::test]
async fn test_cancel_match_leaves_queue() {
    let harness = TestHarness::new();
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;

    a.find_match(profile("a")).await;
    a.expect("waiting-for-opponent").await;
    a.send(ClientMessage::CancelMatch).await;
    a.expect("match-cancelled").await;

    // Cancelling while not queued is still acknowledged
    a.send(ClientMessage::CancelMatch).await;
    a.expect("match-cancelled").await;

    b.find_match(profile("b")).await;
    b.expect("waiting-for-opponent").await;
    a.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_updates_relay_to_opponent_only() {
    let harness = TestHarness::new();
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    a.update_score(&game_id, 1200, 8).await;
    match b.expect("game-update").await {
        ServerMessage::GameUpdate {
            kind,
            score,
            lines,
            player_id,
            ..
        } => {
            assert_eq!(kind, UpdateKind::Score);
            assert_eq!(score, Some(1200));
            assert_eq!(lines, Some(8));
            assert_eq!(player_id, "a");
        }
        _ => unreachable!(),
    }

    b.send(ClientMessage::GameUpdate {
        game_id: game_id.clone(),
        kind: UpdateKind::Board,
        board: Some(serde_json::json!([[0, 1], [1, 1]])),
        score: None,
        lines: None,
    })
    .await;
    match a.expect("game-update").await {
        ServerMessage::GameUpdate { board, player_id, .. } => {
            assert_eq!(board, Some(serde_json::json!([[0, 1], [1, 1]])));
            assert_eq!(player_id, "b");
        }
        _ => unreachable!(),
    }

    a.expect_silence(quiet_period()).await;
    b.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_update_for_unknown_game_is_dropped() {
    let harness = TestHarness::new();
    let (mut a, mut b, _game_id) = harness.started_pair("a", "b").await;

    a.update_score("no-such-game", 10, 1).await;

    a.expect_silence(quiet_period()).await;
    b.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_update_before_game_start_is_dropped() {
    let mut settings = fixtures::test_settings();
    settings.game_start_delay_ms = 60_000;
    let harness = TestHarness::with_settings(Vec::new(), settings);
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;

    a.find_match(profile("a")).await;
    a.expect("waiting-for-opponent").await;
    b.find_match(profile("b")).await;
    let game_id = match b.expect("match-found").await {
        ServerMessage::MatchFound { game_id, .. } => game_id,
        _ => unreachable!(),
    };
    a.expect("match-found").await;

    b.update_score(&game_id, 100, 1).await;
    a.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_abandoned_before_start_gets_no_game_start() {
    let mut settings = fixtures::test_settings();
    settings.game_start_delay_ms = 200;
    let harness = TestHarness::with_settings(Vec::new(), settings);
    let mut a = harness.connect().await;
    let mut b = harness.connect().await;

    a.find_match(profile("a")).await;
    a.expect("waiting-for-opponent").await;
    b.find_match(profile("b")).await;
    b.expect("match-found").await;
    a.expect("match-found").await;

    a.disconnect().await;
    b.expect("opponent-disconnected").await;

    // The start timer still fires, but the session is gone
    b.expect_silence(Duration::from_millis(400)).await;
    assert_eq!(harness.handle.stats().await.unwrap().active_sessions, 0);
}

#[tokio::test]
async fn test_game_over_settles_exactly_once() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    b.update_score(&game_id, 300, 2).await;
    a.expect("game-update").await;

    // Both clients report the same result
    a.game_over(&game_id, "a", "b", 2500, 20).await;
    b.game_over(&game_id, "a", "b", 2500, 20).await;

    for client in [&mut a, &mut b] {
        match client.expect("game-over").await {
            ServerMessage::GameOver {
                winner,
                loser,
                final_score,
                lines_cleared,
            } => {
                assert_eq!(winner.id, "a");
                assert_eq!(winner.elo_change, 16);
                assert_eq!(loser.id, "b");
                assert_eq!(loser.elo_change, -16);
                assert_eq!(final_score, 2500);
                assert_eq!(lines_cleared, 20);
            }
            _ => unreachable!(),
        }
        client.expect_silence(quiet_period()).await;
    }

    let winner = harness.user("a").await;
    let loser = harness.user("b").await;
    assert_eq!(winner.elo_rating, 1216);
    assert_eq!(loser.elo_rating, 1184);
    assert_eq!(winner.wins, 1);
    assert_eq!(loser.losses, 1);
    assert!(winner.last_game_date.is_some());

    let record = harness
        .store
        .find_game_by_game_id(&game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GameStatus::Finished);
    assert_eq!(record.winner.as_deref(), Some("a"));
    assert_eq!(record.loser.as_deref(), Some("b"));
    assert!(record.end_time.is_some());
    let scores = record.final_scores.unwrap();
    assert_eq!(scores.winner, ScoreLine { score: 2500, lines: 20 });
    assert_eq!(scores.loser, ScoreLine { score: 300, lines: 2 });
    assert_eq!(record.player("a").unwrap().elo_after, Some(1216));
    assert_eq!(record.player("b").unwrap().elo_after, Some(1184));

    assert_eq!(
        harness.metrics.session().duplicate_settlements_total.get(),
        1
    );
    assert_eq!(harness.handle.stats().await.unwrap().active_sessions, 0);
}

#[tokio::test]
async fn test_forfeit_racing_game_over_settles_once() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    a.send(ClientMessage::Forfeit {
        game_id: game_id.clone(),
    })
    .await;
    b.game_over(&game_id, "a", "b", 900, 9).await;

    b.expect("opponent-forfeited").await;
    for client in [&mut a, &mut b] {
        match client.expect("game-over").await {
            ServerMessage::GameOver { winner, loser, .. } => {
                assert_eq!(winner.id, "b");
                assert_eq!(winner.elo_change, 16);
                assert_eq!(loser.elo_change, -16);
            }
            _ => unreachable!(),
        }
        client.expect_silence(quiet_period()).await;
    }

    let a = harness.user("a").await;
    let b = harness.user("b").await;
    assert_eq!(a.elo_rating, 1184);
    assert_eq!(b.elo_rating, 1216);
    assert_eq!(a.total_games, 1);
    assert_eq!(b.total_games, 1);
    assert_eq!(
        harness.metrics.session().duplicate_settlements_total.get(),
        1
    );
}

#[tokio::test]
async fn test_game_over_for_unknown_game_is_not_a_duplicate() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, mut b, _game_id) = harness.started_pair("a", "b").await;

    a.game_over("no-such-game", "a", "b", 100, 1).await;
    a.send(ClientMessage::Forfeit {
        game_id: "no-such-game".to_string(),
    })
    .await;

    a.expect_silence(quiet_period()).await;
    b.expect_silence(quiet_period()).await;
    assert_eq!(
        harness.metrics.session().duplicate_settlements_total.get(),
        0
    );
    assert_eq!(harness.handle.stats().await.unwrap().active_sessions, 1);
}

#[tokio::test]
async fn test_invalid_result_is_rejected() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, _b, game_id) = harness.started_pair("a", "b").await;

    a.game_over(&game_id, "a", "a", 10, 1).await;
    assert_eq!(error_code(a.expect("error").await), ErrorCode::InvalidResult);

    a.send(ClientMessage::GameOver {
        game_id: game_id.clone(),
        winner: party("a"),
        loser: party("stranger"),
        final_score: 10,
        lines_cleared: 1,
    })
    .await;
    assert_eq!(error_code(a.expect("error").await), ErrorCode::InvalidResult);

    assert_eq!(harness.user("a").await.elo_rating, 1200);
    assert_eq!(harness.handle.stats().await.unwrap().active_sessions, 1);
}

#[tokio::test]
async fn test_disconnect_abandons_without_rating_change() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (a, mut b, game_id) = harness.started_pair("a", "b").await;

    a.disconnect().await;
    b.expect("opponent-disconnected").await;

    // A late result for the abandoned game is ignored
    b.game_over(&game_id, "b", "a", 100, 1).await;
    b.expect_silence(quiet_period()).await;

    assert_eq!(harness.user("a").await.elo_rating, 1200);
    assert_eq!(harness.user("b").await.elo_rating, 1200);
    assert_eq!(harness.user("b").await.total_games, 0);

    let record = harness
        .store
        .find_game_by_game_id(&game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GameStatus::Abandoned);
    assert!(record.winner.is_none());

    let stats = harness.handle.stats().await.unwrap();
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.connections, 1);
    assert_eq!(harness.metrics.session().sessions_abandoned_total.get(), 1);
}

#[tokio::test]
async fn test_disconnect_while_queued_frees_the_slot() {
    let harness = TestHarness::new();
    let a = harness.connect().await;
    let mut b = harness.connect().await;

    a.find_match(profile("a")).await;
    a.disconnect().await;

    b.find_match(profile("b")).await;
    b.expect("waiting-for-opponent").await;
}

#[tokio::test]
async fn test_forfeit_settles_for_opponent() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    b.update_score(&game_id, 700, 5).await;
    a.expect("game-update").await;

    a.send(ClientMessage::Forfeit {
        game_id: game_id.clone(),
    })
    .await;

    match b.expect("opponent-forfeited").await {
        ServerMessage::OpponentForfeited { player_name } => {
            assert_eq!(player_name, "Player a");
        }
        _ => unreachable!(),
    }
    for client in [&mut b, &mut a] {
        match client.expect("game-over").await {
            ServerMessage::GameOver {
                winner,
                final_score,
                lines_cleared,
                ..
            } => {
                assert_eq!(winner.id, "b");
                assert_eq!(winner.elo_change, 16);
                assert_eq!(final_score, 700);
                assert_eq!(lines_cleared, 5);
            }
            _ => unreachable!(),
        }
    }

    assert_eq!(harness.user("b").await.elo_rating, 1216);
    assert_eq!(harness.user("a").await.elo_rating, 1184);

    // A second forfeit finds nothing to settle
    a.send(ClientMessage::Forfeit { game_id }).await;
    b.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_rematch_handshake() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    a.game_over(&game_id, "a", "b", 1000, 10).await;
    a.expect("game-over").await;
    b.expect("game-over").await;

    // Accepting with nothing pending is a no-op
    b.send(ClientMessage::RematchAccept {
        game_id: game_id.clone(),
    })
    .await;
    b.expect_silence(quiet_period()).await;

    a.send(ClientMessage::RematchRequest {
        game_id: game_id.clone(),
    })
    .await;
    for client in [&mut a, &mut b] {
        match client.expect("rematch-requested").await {
            ServerMessage::RematchRequested { player_id, .. } => assert_eq!(player_id, "a"),
            _ => unreachable!(),
        }
    }

    // A repeated request is not broadcast again
    a.send(ClientMessage::RematchRequest {
        game_id: game_id.clone(),
    })
    .await;
    a.expect_silence(quiet_period()).await;

    // The requester cannot accept their own request
    a.send(ClientMessage::RematchAccept {
        game_id: game_id.clone(),
    })
    .await;
    a.expect_silence(quiet_period()).await;

    b.send(ClientMessage::RematchAccept {
        game_id: game_id.clone(),
    })
    .await;
    let rematch_game_id = match b.expect("rematch-accepted").await {
        ServerMessage::RematchAccepted {
            rematch_game_id,
            players,
        } => {
            assert_eq!(players.len(), 2);
            let a_player = players.iter().find(|p| p.id == "a").unwrap();
            assert_eq!(a_player.elo_before, 1216);
            assert!(a_player.elo_after.is_none());
            rematch_game_id
        }
        _ => unreachable!(),
    };
    a.expect("rematch-accepted").await;

    // Both players were free, so the successor goes live
    for client in [&mut a, &mut b] {
        match client.expect("game-start").await {
            ServerMessage::GameStart { game_id } => assert_eq!(game_id, rematch_game_id),
            _ => unreachable!(),
        }
    }

    // A second accept spawns nothing
    b.send(ClientMessage::RematchAccept {
        game_id: game_id.clone(),
    })
    .await;
    b.expect_silence(quiet_period()).await;

    let original = harness
        .store
        .find_game_by_game_id(&game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(original.rematch_game_id.as_deref(), Some(rematch_game_id.as_str()));
    assert!(original.rematch_requests.iter().any(|r| r.accepted));

    let successor = harness
        .store
        .find_game_by_game_id(&rematch_game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(successor.status, GameStatus::Active);
    assert_eq!(successor.original_game_id.as_deref(), Some(game_id.as_str()));
    assert_eq!(harness.store.games_for_player("a").unwrap().len(), 2);

    // The successor plays and settles like any other session
    a.update_score(&rematch_game_id, 50, 1).await;
    b.expect("game-update").await;
    b.game_over(&rematch_game_id, "b", "a", 900, 9).await;
    a.expect("game-over").await;
    b.expect("game-over").await;
    assert_eq!(harness.handle.stats().await.unwrap().active_sessions, 0);
}

#[tokio::test]
async fn test_chat_is_trimmed_stored_and_broadcast() {
    let harness = TestHarness::new();
    let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;

    a.send(ClientMessage::ChatMessage {
        game_id: game_id.clone(),
        message: "  good luck  ".to_string(),
    })
    .await;
    for client in [&mut a, &mut b] {
        match client.expect("chat-message").await {
            ServerMessage::ChatMessage { entry } => {
                assert_eq!(entry.message, "good luck");
                assert_eq!(entry.sender.id, "a");
                assert_eq!(entry.game_id, game_id);
            }
            _ => unreachable!(),
        }
    }

    a.send(ClientMessage::ChatMessage {
        game_id: game_id.clone(),
        message: "   ".to_string(),
    })
    .await;
    assert_eq!(
        error_code(a.expect("error").await),
        ErrorCode::InvalidChatMessage
    );

    a.send(ClientMessage::ChatMessage {
        game_id: game_id.clone(),
        message: "x".repeat(501),
    })
    .await;
    assert_eq!(
        error_code(a.expect("error").await),
        ErrorCode::InvalidChatMessage
    );

    settle(&harness.handle).await;
    let transcript = harness
        .store
        .find_chat_by_game_id(&game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transcript.messages.len(), 1);
    b.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_chat_from_outsider_is_rejected() {
    let harness = TestHarness::new();
    let (_a, mut b, game_id) = harness.started_pair("a", "b").await;
    let mut outsider = harness.connect().await;

    outsider.find_match(profile("c")).await;
    outsider.expect("waiting-for-opponent").await;
    outsider
        .send(ClientMessage::ChatMessage {
            game_id,
            message: "hello".to_string(),
        })
        .await;

    assert_eq!(
        error_code(outsider.expect("error").await),
        ErrorCode::InvalidChatMessage
    );
    b.expect_silence(quiet_period()).await;
}

#[tokio::test]
async fn test_win_streaks_across_games() {
    let harness = TestHarness::with_users(vec![user("a", 1200), user("b", 1200)]);

    for winner in ["a", "a", "a", "b"] {
        let loser = if winner == "a" { "b" } else { "a" };
        let (mut a, mut b, game_id) = harness.started_pair("a", "b").await;
        a.game_over(&game_id, winner, loser, 100, 1).await;
        a.expect("game-over").await;
        b.expect("game-over").await;
    }

    let a = harness.user("a").await;
    assert_eq!(a.wins, 3);
    assert_eq!(a.losses, 1);
    assert_eq!(a.total_games, 4);
    assert_eq!(a.win_streak, 0);
    assert_eq!(a.best_win_streak, 3);

    let b = harness.user("b").await;
    assert_eq!(b.win_streak, 1);
    // Every settlement is zero-sum
    assert_eq!(a.elo_rating + b.elo_rating, 2400);
}
