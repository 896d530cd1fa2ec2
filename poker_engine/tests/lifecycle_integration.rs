/// Integration tests for the room lifecycle
///
/// These tests seat and unseat players directly in an in-memory store, the
/// way client-facing servers do, and verify what the monitor and the
/// lifecycle controller make of it.
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use poker_engine::{
    Engine, EngineError, EngineResult, GamePhase,
    actions::{ActionLogger, ActionSink, ActionType},
    deck::{HOLE_CARDS, Shuffler},
    game::{FieldValue, PlayerStatus, RoomStatus},
    monitor::{
        EngineConfig, REASON_DEAL_FAILED, REASON_INSUFFICIENT_PLAYERS, RoomAction, StartOutcome,
        StopOutcome,
    },
    store::{KeyBuilder, KeyValueStore, MemoryStore},
};

const CLUB: &str = "club1";
const ROOM: &str = "room1";

fn test_config(deal_on_start: bool) -> EngineConfig {
    EngineConfig {
        check_interval: Duration::from_millis(20),
        deal_on_start,
        ..EngineConfig::default()
    }
}

fn setup(deal_on_start: bool) -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::with_shuffler(
        store.clone(),
        KeyBuilder::new(),
        test_config(deal_on_start),
        Arc::new(Shuffler::seeded(7)),
    );
    (store, engine)
}

/// Register a room in its club index with the given phase
async fn create_room(store: &MemoryStore, club: &str, room: &str, phase: &str) {
    let keys = KeyBuilder::new();
    store
        .zadd(&keys.club_rooms_active(club), room, 1.0)
        .await
        .unwrap();
    store
        .hset_multiple(
            &keys.room_info(club, room),
            &[
                ("room_id".to_string(), room.to_string()),
                ("max_players".to_string(), "9".to_string()),
                ("status".to_string(), "waiting".to_string()),
            ],
        )
        .await
        .unwrap();
    store
        .hset_multiple(
            &keys.game_state(club, room),
            &[
                ("phase".to_string(), phase.to_string()),
                ("game_id".to_string(), String::new()),
                ("pot".to_string(), "0".to_string()),
                ("community_cards".to_string(), "[]".to_string()),
            ],
        )
        .await
        .unwrap();
}

async fn seat_player(store: &MemoryStore, club: &str, room: &str, user: &str) {
    let keys = KeyBuilder::new();
    store
        .sadd(&keys.room_players(club, room), &[user.to_string()])
        .await
        .unwrap();
    store
        .hset_multiple(
            &keys.player_info(club, room, user),
            &[
                ("user_id".to_string(), user.to_string()),
                ("username".to_string(), format!("name_{user}")),
                ("chips".to_string(), "1000".to_string()),
                ("bet".to_string(), "0".to_string()),
                ("cards".to_string(), "[]".to_string()),
                ("status".to_string(), "waiting".to_string()),
            ],
        )
        .await
        .unwrap();
}

async fn unseat_player(store: &MemoryStore, club: &str, room: &str, user: &str) {
    store
        .srem(&KeyBuilder::new().room_players(club, room), &[user.to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tick_starts_room_with_enough_players() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;

    let report = engine.monitor.force_check().await;
    assert_eq!(report.games_started, 0);

    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    let report = engine.monitor.force_check().await;
    assert_eq!(report.rooms_checked, 1);
    assert_eq!(report.games_started, 1);
    assert_eq!(report.failures, 0);

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert_eq!(game.phase, FieldValue::Known(GamePhase::PreFlop));
    assert!(game.game_id.starts_with("game_club1_room1_"));
    assert_eq!(game.pot, 0);
    assert_eq!(game.current_bet, 0);
    assert!(game.started_at.is_some());

    let room = engine.repository.get_room(CLUB, ROOM).await.unwrap().unwrap();
    assert_eq!(room.status, FieldValue::Known(RoomStatus::Gaming));
    assert_eq!(room.current_players, 2);

    let started = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::GameStarted.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(started.len(), 1);
    let data = started[0].data.as_ref().unwrap();
    assert_eq!(data["players_count"], 2);
    assert_eq!(data["game_id"], game.game_id.as_str());
    assert_eq!(started[0].source, "game_engine");
}

#[tokio::test]
async fn test_tick_stops_room_when_players_leave() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "flop").await;
    engine
        .repository
        .update_game_fields(
            CLUB,
            ROOM,
            &[
                ("game_id", "game_club1_room1_1".to_string()),
                ("pot", "300".to_string()),
                ("community_cards", r#"["AH","KD","7C"]"#.to_string()),
            ],
        )
        .await
        .unwrap();
    for user in ["u1", "u2", "u3"] {
        seat_player(&store, CLUB, ROOM, user).await;
        engine
            .repository
            .update_player_fields(
                CLUB,
                ROOM,
                user,
                &[
                    ("bet", "50".to_string()),
                    ("cards", r#"["2S","3S"]"#.to_string()),
                    ("status", "active".to_string()),
                ],
            )
            .await
            .unwrap();
    }
    unseat_player(&store, CLUB, ROOM, "u2").await;
    unseat_player(&store, CLUB, ROOM, "u3").await;

    let report = engine.monitor.force_check().await;
    assert_eq!(report.games_stopped, 1);

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.is_waiting());
    assert_eq!(game.game_id, "");
    assert!(game.community_cards.is_empty());
    assert_eq!(game.pot, 0);
    assert_eq!(game.current_player_position, None);

    let player = engine
        .repository
        .get_player(CLUB, ROOM, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(player.bet, 0);
    assert!(player.cards.is_empty());
    assert!(player.status.is(&PlayerStatus::Waiting));

    let stopped = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::GameStopped.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(stopped.len(), 1);
    let data = stopped[0].data.as_ref().unwrap();
    assert_eq!(data["previous_phase"], "flop");
    assert_eq!(data["reason"], REASON_INSUFFICIENT_PLAYERS);
}

#[tokio::test]
async fn test_stop_on_waiting_room_is_noop() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;

    let outcome = engine
        .controller
        .stop_game(CLUB, ROOM, REASON_INSUFFICIENT_PLAYERS)
        .await
        .unwrap();
    assert_eq!(outcome, StopOutcome::AlreadyWaiting);
    assert_eq!(engine.actions.count(CLUB, ROOM).await.unwrap(), 0);

    let missing = engine
        .controller
        .stop_game(CLUB, "nowhere", REASON_INSUFFICIENT_PLAYERS)
        .await
        .unwrap();
    assert_eq!(missing, StopOutcome::AlreadyWaiting);
}

#[tokio::test]
async fn test_start_is_retry_safe_after_failed_write() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;
    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    store.fail_next_batches(1);
    let err = engine.controller.start_game(CLUB, ROOM, 2).await.unwrap_err();
    assert!(err.is_retryable());

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.is_waiting());
    assert_eq!(game.game_id, "");
    assert_eq!(engine.actions.count(CLUB, ROOM).await.unwrap(), 0);

    let outcome = engine.controller.start_game(CLUB, ROOM, 2).await.unwrap();
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert_eq!(game.phase, FieldValue::Known(GamePhase::PreFlop));

    let again = engine.controller.start_game(CLUB, ROOM, 2).await.unwrap();
    assert_eq!(again, StartOutcome::AlreadyInProgress);
}

#[tokio::test]
async fn test_tick_retries_room_after_store_failure() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;
    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    store.fail_next_batches(1);
    let report = engine.monitor.force_check().await;
    assert_eq!(report.failures, 1);
    assert_eq!(report.games_started, 0);

    let report = engine.monitor.force_check().await;
    assert_eq!(report.failures, 0);
    assert_eq!(report.games_started, 1);
}

#[tokio::test]
async fn test_failing_room_does_not_abort_tick() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, "broken", "waiting").await;
    create_room(&store, CLUB, "healthy", "waiting").await;
    for user in ["u1", "u2"] {
        seat_player(&store, CLUB, "healthy", user).await;
    }
    // A string where the players set should be makes the count fail
    store
        .set(&KeyBuilder::new().room_players(CLUB, "broken"), "oops")
        .await
        .unwrap();

    let report = engine.monitor.force_check().await;
    assert_eq!(report.rooms_checked, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(report.games_started, 1);
}

#[tokio::test]
async fn test_start_deals_hole_cards() {
    let (store, engine) = setup(true);
    create_room(&store, CLUB, ROOM, "waiting").await;
    for user in ["u1", "u2", "u3"] {
        seat_player(&store, CLUB, ROOM, user).await;
    }

    let report = engine.monitor.force_check().await;
    assert_eq!(report.games_started, 1);

    let hands = engine.dealer.get_all_player_cards(CLUB, ROOM).await.unwrap();
    assert_eq!(hands.len(), 3);
    assert!(hands.values().all(|cards| cards.len() == HOLE_CARDS));
    assert_eq!(engine.decks.deck_size(CLUB, ROOM).await.unwrap(), 46);

    let dealt = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::CardsDealt.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(dealt.len(), 1);
}

#[tokio::test]
async fn test_deal_failure_stops_the_game() {
    let (store, engine) = setup(true);
    create_room(&store, CLUB, ROOM, "waiting").await;
    // 30 players need 60 hole cards
    for i in 0..30 {
        seat_player(&store, CLUB, ROOM, &format!("u{i:02}")).await;
    }

    let err = engine.controller.start_game(CLUB, ROOM, 30).await.unwrap_err();
    assert!(matches!(err, EngineError::DeckExhausted { .. }));

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.is_waiting());
    assert_eq!(game.game_id, "");

    let hands = engine.dealer.get_all_player_cards(CLUB, ROOM).await.unwrap();
    assert!(hands.values().all(|cards| cards.is_empty()));

    let stopped = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::GameStopped.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].data.as_ref().unwrap()["reason"], REASON_DEAL_FAILED);
    let errors = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::Error.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
}

/// Sink that takes the store offline when an error event is recorded
struct OfflineOnError {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ActionSink for OfflineOnError {
    async fn append(
        &self,
        _club_id: &str,
        _room_id: &str,
        _action: &str,
        _data: Option<serde_json::Value>,
    ) -> EngineResult<()> {
        Ok(())
    }

    async fn error(&self, _club_id: &str, _room_id: &str, _error_type: &str, _message: &str) {
        self.store.set_offline(true);
    }
}

#[tokio::test]
async fn test_deal_failure_reports_deal_error_when_stop_fails() {
    let store = Arc::new(MemoryStore::new());
    let keys = KeyBuilder::new();
    let engine = Engine::with_sink(
        store.clone(),
        keys.clone(),
        test_config(true),
        Arc::new(Shuffler::seeded(7)),
        ActionLogger::new(store.clone(), keys),
        Arc::new(OfflineOnError {
            store: store.clone(),
        }),
    );
    create_room(&store, CLUB, ROOM, "waiting").await;
    for i in 0..30 {
        seat_player(&store, CLUB, ROOM, &format!("u{i:02}")).await;
    }

    let err = engine.controller.start_game(CLUB, ROOM, 30).await.unwrap_err();
    assert!(matches!(err, EngineError::DeckExhausted { .. }));

    // The stop never reached the store; the hand is still marked started
    store.set_offline(false);
    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.phase.is(&GamePhase::PreFlop));
    assert!(!game.game_id.is_empty());
}

#[tokio::test]
async fn test_stop_skips_player_that_cannot_be_reset() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "turn").await;
    for user in ["u1", "u2", "u3"] {
        seat_player(&store, CLUB, ROOM, user).await;
        engine
            .repository
            .update_player_fields(
                CLUB,
                ROOM,
                user,
                &[
                    ("bet", "20".to_string()),
                    ("cards", r#"["9H","9D"]"#.to_string()),
                    ("status", "active".to_string()),
                ],
            )
            .await
            .unwrap();
    }
    // u2's record is no longer a field-set, so its reset fails
    store
        .set(&KeyBuilder::new().player_info(CLUB, ROOM, "u2"), "x")
        .await
        .unwrap();

    let outcome = engine
        .controller
        .stop_game(CLUB, ROOM, REASON_INSUFFICIENT_PLAYERS)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StopOutcome::Stopped {
            previous_phase: "turn".to_string()
        }
    );

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.is_waiting());
    let room = engine.repository.get_room(CLUB, ROOM).await.unwrap().unwrap();
    assert_eq!(room.status, FieldValue::Known(RoomStatus::Waiting));

    for user in ["u1", "u3"] {
        let player = engine
            .repository
            .get_player(CLUB, ROOM, user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(player.bet, 0);
        assert!(player.cards.is_empty());
        assert!(player.status.is(&PlayerStatus::Waiting));
    }
}

#[tokio::test]
async fn test_advance_phase_records_phase_change() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "pre_flop").await;

    let from = engine
        .controller
        .advance_phase(CLUB, ROOM, GamePhase::Flop)
        .await
        .unwrap();
    assert_eq!(from, GamePhase::PreFlop);

    let err = engine
        .controller
        .advance_phase(CLUB, ROOM, GamePhase::Waiting)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert!(game.phase.is(&GamePhase::Flop));

    let changes = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::PhaseChanged.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(changes.len(), 1);
    let data = changes[0].data.as_ref().unwrap();
    assert_eq!(data["old_phase"], "pre_flop");
    assert_eq!(data["new_phase"], "flop");
}

#[tokio::test]
async fn test_force_stop_cleans_deck_and_pots() {
    let (store, engine) = setup(true);
    create_room(&store, CLUB, ROOM, "waiting").await;
    for user in ["u1", "u2", "u3"] {
        seat_player(&store, CLUB, ROOM, user).await;
    }
    engine.controller.start_game(CLUB, ROOM, 3).await.unwrap();
    assert!(engine.decks.deck_size(CLUB, ROOM).await.unwrap() > 0);

    let outcome = engine
        .controller
        .force_stop(CLUB, ROOM, "maintenance")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StopOutcome::Stopped {
            previous_phase: "pre_flop".to_string()
        }
    );
    assert_eq!(engine.decks.deck_size(CLUB, ROOM).await.unwrap(), 0);

    let keys = KeyBuilder::new();
    let pots = store.hget_all(&keys.room_pots(CLUB, ROOM)).await.unwrap();
    assert_eq!(pots.get("main_pot").map(String::as_str), Some("0"));
    assert_eq!(pots.get("side_pots").map(String::as_str), Some("[]"));

    let stopped = engine
        .actions
        .by_type(CLUB, ROOM, ActionType::GameStopped.as_str(), 0)
        .await
        .unwrap();
    assert_eq!(
        stopped[0].data.as_ref().unwrap()["reason"],
        "force_stop: maintenance"
    );
}

#[tokio::test]
async fn test_stop_if_needed() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;
    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    // Not active yet
    assert!(!engine.controller.stop_if_needed(CLUB, ROOM, 2).await.unwrap());

    engine.controller.start_game(CLUB, ROOM, 2).await.unwrap();
    assert!(!engine.controller.stop_if_needed(CLUB, ROOM, 2).await.unwrap());

    unseat_player(&store, CLUB, ROOM, "u2").await;
    assert!(engine.controller.stop_if_needed(CLUB, ROOM, 2).await.unwrap());
    assert!(!engine.repository.is_game_active(CLUB, ROOM).await.unwrap());
}

#[tokio::test]
async fn test_save_game_results_requires_active_hand() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;

    let err = engine
        .controller
        .save_game_results(CLUB, ROOM)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoActiveHand { .. }));

    let StartOutcome::Started { game_id } =
        engine.controller.start_game(CLUB, ROOM, 2).await.unwrap()
    else {
        panic!("expected a started game");
    };
    let saved = engine.controller.save_game_results(CLUB, ROOM).await.unwrap();
    assert_eq!(saved, game_id);
}

#[tokio::test]
async fn test_check_specific_room() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;

    let err = engine
        .monitor
        .check_specific_room(CLUB, "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RoomNotFound { .. }));

    let action = engine.monitor.check_specific_room(CLUB, ROOM).await.unwrap();
    assert_eq!(action, RoomAction::NoAction);

    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;
    let action = engine.monitor.check_specific_room(CLUB, ROOM).await.unwrap();
    assert!(matches!(action, RoomAction::Started { .. }));
}

#[tokio::test]
async fn test_unrecognized_phase_is_left_alone_with_players() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "lobby").await;
    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    let action = engine.monitor.check_specific_room(CLUB, ROOM).await.unwrap();
    assert_eq!(action, RoomAction::NoAction);

    let game = engine.repository.get_game(CLUB, ROOM).await.unwrap().unwrap();
    assert_eq!(game.phase, FieldValue::Unrecognized("lobby".to_string()));
}

#[tokio::test]
async fn test_rooms_without_game_record_are_skipped() {
    let (store, engine) = setup(false);
    store
        .zadd(&KeyBuilder::new().club_rooms_active(CLUB), "ghost", 1.0)
        .await
        .unwrap();

    let report = engine.monitor.force_check().await;
    assert_eq!(report.rooms_checked, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(report.games_started + report.games_stopped, 0);
}

#[tokio::test]
async fn test_monitor_scans_every_club() {
    let (store, engine) = setup(false);
    for club in ["club_a", "club_b"] {
        create_room(&store, club, ROOM, "waiting").await;
        seat_player(&store, club, ROOM, "u1").await;
        seat_player(&store, club, ROOM, "u2").await;
    }

    let report = engine.monitor.force_check().await;
    assert_eq!(report.rooms_checked, 2);
    assert_eq!(report.games_started, 2);
}

#[tokio::test]
async fn test_monitor_loop_lifecycle() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;
    seat_player(&store, CLUB, ROOM, "u1").await;
    seat_player(&store, CLUB, ROOM, "u2").await;

    assert!(matches!(
        engine.monitor.health_check().await,
        Err(EngineError::MonitorNotRunning)
    ));

    engine.monitor.start().await;
    engine.monitor.start().await;
    assert!(engine.monitor.is_running());
    engine.monitor.health_check().await.unwrap();

    let mut started = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if engine.repository.is_game_active(CLUB, ROOM).await.unwrap() {
            started = true;
            break;
        }
    }
    assert!(started, "monitor loop never started the room");

    engine.monitor.stop().await;
    assert!(!engine.monitor.is_running());

    let stats = engine.monitor.statistics();
    assert!(!stats.running);
    assert!(stats.ticks >= 1);
    assert_eq!(stats.games_started, 1);
    assert_eq!(stats.min_players_to_start, 2);

    // Stopped loop no longer reacts
    unseat_player(&store, CLUB, ROOM, "u2").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(engine.repository.is_game_active(CLUB, ROOM).await.unwrap());
}

#[tokio::test]
async fn test_health_check_reports_store_outage() {
    let (store, engine) = setup(false);
    engine.monitor.start().await;

    store.set_offline(true);
    let err = engine.monitor.health_check().await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    store.set_offline(false);
    engine.monitor.health_check().await.unwrap();
    engine.monitor.stop().await;
}

#[tokio::test]
async fn test_tick_survives_store_outage() {
    let (store, engine) = setup(false);
    create_room(&store, CLUB, ROOM, "waiting").await;

    store.set_offline(true);
    let report = engine.monitor.force_check().await;
    assert_eq!(report.failures, 1);
    assert_eq!(report.rooms_checked, 0);

    store.set_offline(false);
    let report = engine.monitor.force_check().await;
    assert_eq!(report.failures, 0);
    assert_eq!(report.rooms_checked, 1);
}
