use std::collections::HashSet;

use hexpop::{matchmaking::MatchStatus, websockets::MessageType, AppError};

mod utils;

use utils::*;

#[tokio::test]
async fn test_pairing_notifies_both_players() {
    let setup = TestSetupBuilder::new().with_two_players().build().await;

    let session_id = setup.match_players("alice", "bob").await;

    let to_alice = setup
        .connections
        .messages_of_type("alice", MessageType::MatchFound)
        .await;
    let to_bob = setup
        .connections
        .messages_of_type("bob", MessageType::MatchFound)
        .await;
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_bob.len(), 1);

    assert_eq!(to_alice[0].payload["session_id"], session_id.as_str());
    assert_eq!(to_alice[0].payload["seat"], "one");
    assert_eq!(to_alice[0].payload["opponent"]["player_id"], "bob");
    assert_eq!(to_bob[0].payload["seat"], "two");
    assert_eq!(to_bob[0].payload["opponent"]["player_id"], "alice");
}

#[tokio::test]
async fn test_longest_waiting_player_takes_seat_one() {
    let setup = TestSetupBuilder::new().with_two_players().build().await;
    let session_id = setup.match_players("bob", "alice").await;

    let snapshot = setup.state.registry.get(&session_id).await.unwrap();
    assert_eq!(snapshot.players[0].player.player_id, "bob");
    assert_eq!(snapshot.players[1].player.player_id, "alice");
}

#[tokio::test]
async fn test_concurrent_joins_never_double_pair() {
    let setup = TestSetupBuilder::new().with_numbered_players(41).build().await;

    let mut tasks = Vec::new();
    for player in setup.players.clone() {
        let matchmaking = setup.state.matchmaking.clone();
        tasks.push(tokio::spawn(async move {
            matchmaking.join(&player).await.unwrap()
        }));
    }

    let mut matched = 0;
    for task in tasks {
        if let MatchStatus::Matched { .. } = task.await.unwrap() {
            matched += 1;
        }
    }
    assert_eq!(matched, 20);
    assert_eq!(setup.state.registry.session_count().await, 20);
    assert_eq!(setup.state.matchmaking.queue().len().await, 1);

    let mut sessions = HashSet::new();
    let mut seated = 0;
    for player in &setup.players {
        if let Some(session_id) = setup.state.registry.active_session_for(player).await {
            sessions.insert(session_id);
            seated += 1;
        }
    }
    assert_eq!(seated, 40);
    assert_eq!(sessions.len(), 20);
}

/// `a` rejoins while `b` is pairing with it, and `c` arrives right after.
/// Whichever pairing seats `a` first wins; the other side goes back to waiting.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejoin_during_pairing_never_seats_twice() {
    for _ in 0..200 {
        let setup = TestSetupBuilder::new()
            .with_players(vec!["a", "b", "c"])
            .build()
            .await;
        let matchmaking = setup.state.matchmaking.clone();
        matchmaking.join("a").await.unwrap();

        let b_joins = tokio::spawn({
            let matchmaking = matchmaking.clone();
            async move { matchmaking.join("b").await }
        });
        let a_rejoins = tokio::spawn({
            let matchmaking = matchmaking.clone();
            async move { matchmaking.join("a").await }
        });
        let b_result = b_joins.await.unwrap().unwrap();
        let a_result = a_rejoins.await.unwrap();
        let c_result = matchmaking.join("c").await.unwrap();

        let mut sessions_with_a = Vec::new();
        if let Ok(MatchStatus::Matched { session_id, .. }) = &a_result {
            sessions_with_a.push(session_id.clone());
        }
        for result in [&b_result, &c_result] {
            if let MatchStatus::Matched { session_id, opponent } = result {
                if opponent.player_id == "a" {
                    sessions_with_a.push(session_id.clone());
                }
            }
        }
        assert!(
            sessions_with_a.len() <= 1,
            "a was seated in {} sessions",
            sessions_with_a.len()
        );
        if let Err(e) = &a_result {
            assert!(matches!(e, AppError::BadRequest(_)), "unexpected {:?}", e);
        }

        let seated = setup.state.registry.active_session_for("a").await;
        assert_eq!(seated, sessions_with_a.pop());
        assert_eq!(setup.state.registry.session_count().await, usize::from(seated.is_some()));
    }
}

#[tokio::test]
async fn test_rejoining_refreshes_instead_of_duplicating() {
    let setup = TestSetupBuilder::new().with_two_players().build().await;

    let first = setup.state.matchmaking.join("alice").await.unwrap();
    let second = setup.state.matchmaking.join("alice").await.unwrap();

    assert_eq!(first, MatchStatus::Waiting { requeued: false });
    assert_eq!(second, MatchStatus::Waiting { requeued: true });
    assert_eq!(setup.state.matchmaking.queue().len().await, 1);
}

#[tokio::test]
async fn test_cancel_withdraws_and_is_a_noop_otherwise() {
    let setup = TestSetupBuilder::new().with_two_players().build().await;

    assert!(!setup.state.matchmaking.cancel("alice").await);

    setup.state.matchmaking.join("alice").await.unwrap();
    assert!(setup.state.matchmaking.cancel("alice").await);
    assert!(!setup.state.matchmaking.cancel("alice").await);

    // Bob now waits alone instead of being paired with a cancelled request
    let status = setup.state.matchmaking.join("bob").await.unwrap();
    assert_eq!(status, MatchStatus::Waiting { requeued: false });
}

#[tokio::test]
async fn test_seated_player_cannot_queue() {
    let setup = TestSetupBuilder::new()
        .with_players(vec!["alice", "bob", "carol"])
        .build()
        .await;
    setup.match_players("alice", "bob").await;

    let result = setup.state.matchmaking.join("alice").await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let waiting = setup.state.matchmaking.join("carol").await.unwrap();
    assert_eq!(waiting, MatchStatus::Waiting { requeued: false });
}

#[tokio::test]
async fn test_unknown_player_is_rejected() {
    let setup = TestSetupBuilder::new().with_two_players().build().await;

    let result = setup.state.matchmaking.join("mallory").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(setup.state.matchmaking.queue().is_empty().await);
}

#[tokio::test]
async fn test_auto_registered_strangers_can_be_matched() {
    let setup = TestSetupBuilder::new().with_auto_register().build().await;

    let session_id = setup.match_players("stranger-1", "stranger-2").await;

    let snapshot = setup.state.registry.get(&session_id).await.unwrap();
    assert_eq!(snapshot.players[0].player.display_name, "stranger-1");
    assert_eq!(snapshot.players[1].player.player_id, "stranger-2");
    assert!(matches!(
        setup.state.matchmaking.join("").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_join_over_the_socket_replies_queued() {
    use hexpop::websockets::MessageHandler;

    let setup = TestSetupBuilder::new().with_two_players().build().await;
    let handler = setup.handler();

    handler
        .handle_message("alice", r#"{"type":"JOIN_QUEUE"}"#.to_string())
        .await;

    let queued = setup
        .connections
        .messages_of_type("alice", MessageType::Queued)
        .await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].payload["requeued"], false);

    handler
        .handle_message("alice", r#"{"type":"CANCEL_QUEUE"}"#.to_string())
        .await;
    assert!(setup.state.matchmaking.queue().is_empty().await);
}
