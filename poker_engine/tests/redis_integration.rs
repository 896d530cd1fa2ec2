/// Integration tests against a live Redis server
///
/// These tests are ignored by default. Run them with a reachable server:
///
/// ```text
/// REDIS_URL=redis://127.0.0.1:6379/15 cargo test --test redis_integration -- --ignored
/// ```
///
/// Every test works under its own key namespace and deletes what it wrote.
use serial_test::serial;
use std::{collections::HashSet, sync::Arc, time::Duration};

use poker_engine::{
    Engine, GamePhase,
    deck::{DECK_SIZE, Shuffler},
    game::FieldValue,
    monitor::EngineConfig,
    store::{KeyBuilder, KeyScan, KeyValueStore, RedisStore, StoreConfig, WriteBatch},
};

async fn connect() -> Arc<RedisStore> {
    let config = StoreConfig {
        reconnect_attempts: 1,
        ..StoreConfig::from_env()
    };
    Arc::new(
        RedisStore::connect(&config)
            .await
            .expect("REDIS_URL must point at a running server"),
    )
}

fn namespace(test: &str) -> KeyBuilder {
    KeyBuilder::with_namespace(format!("pe_test_{}_{}", std::process::id(), test))
}

async fn cleanup(store: &RedisStore, keys: &KeyBuilder) {
    let pattern = format!("{}*", keys.namespace());
    let found = KeyScan::new(store, pattern).collect_all().await.unwrap();
    if !found.is_empty() {
        store.del(&found).await.unwrap();
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_hash_set_and_list_commands() {
    let store = connect().await;
    let keys = namespace("commands");
    let room = keys.room_info("c1", "r1");

    store
        .hset_multiple(&room, &[("status".to_string(), "waiting".to_string())])
        .await
        .unwrap();
    assert_eq!(
        store.hget(&room, "status").await.unwrap().as_deref(),
        Some("waiting")
    );
    assert_eq!(store.hget(&room, "missing").await.unwrap(), None);

    let players = keys.room_players("c1", "r1");
    store
        .sadd(&players, &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(store.scard(&players).await.unwrap(), 2);
    assert!(store.sismember(&players, "a").await.unwrap());

    let deck = keys.room_deck("c1", "r1");
    store
        .rpush(&deck, &["AH".to_string(), "KD".to_string()])
        .await
        .unwrap();
    assert_eq!(store.rpop(&deck).await.unwrap().as_deref(), Some("KD"));
    assert_eq!(store.llen(&deck).await.unwrap(), 1);

    cleanup(&store, &keys).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_batch_is_applied() {
    let store = connect().await;
    let keys = namespace("batch");
    let game = keys.game_state("c1", "r1");
    let deck = keys.room_deck("c1", "r1");

    let batch = WriteBatch::new()
        .hset(game.clone(), [("phase", "pre_flop"), ("pot", "0")])
        .del(deck.clone())
        .rpush(deck.clone(), vec!["2C".to_string(), "3C".to_string()]);
    store.execute_batch(batch).await.unwrap();

    let fields = store.hget_all(&game).await.unwrap();
    assert_eq!(fields.get("phase").map(String::as_str), Some("pre_flop"));
    assert_eq!(store.llen(&deck).await.unwrap(), 2);

    cleanup(&store, &keys).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_concurrent_draws_are_unique() {
    let store = connect().await;
    let keys = namespace("draws");
    let engine = Engine::with_shuffler(
        store.clone(),
        keys.clone(),
        EngineConfig::default(),
        Arc::new(Shuffler::seeded(11)),
    );
    engine
        .decks
        .save_deck("c1", "r1", &Shuffler::seeded(11).shuffled_deck())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let decks = engine.decks.clone();
        handles.push(tokio::spawn(async move {
            let mut codes = Vec::new();
            while let Some(card) = decks.draw_one("c1", "r1").await.unwrap() {
                codes.push(card.code());
            }
            codes
        }));
    }
    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(all.len(), DECK_SIZE);
    assert_eq!(unique.len(), DECK_SIZE);

    cleanup(&store, &keys).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_redis_monitor_starts_room() {
    let store = connect().await;
    let keys = namespace("monitor");
    let engine = Engine::with_shuffler(
        store.clone(),
        keys.clone(),
        EngineConfig {
            check_interval: Duration::from_millis(50),
            ..EngineConfig::default()
        },
        Arc::new(Shuffler::seeded(3)),
    );

    store
        .zadd(&keys.club_rooms_active("c1"), "r1", 1.0)
        .await
        .unwrap();
    store
        .hset_multiple(
            &keys.game_state("c1", "r1"),
            &[("phase".to_string(), "waiting".to_string())],
        )
        .await
        .unwrap();
    store
        .sadd(
            &keys.room_players("c1", "r1"),
            &["u1".to_string(), "u2".to_string()],
        )
        .await
        .unwrap();

    let report = engine.monitor.force_check().await;
    assert_eq!(report.games_started, 1);

    let game = engine.repository.get_game("c1", "r1").await.unwrap().unwrap();
    assert_eq!(game.phase, FieldValue::Known(GamePhase::PreFlop));
    assert_eq!(engine.decks.deck_size("c1", "r1").await.unwrap(), 48);

    cleanup(&store, &keys).await;
}
