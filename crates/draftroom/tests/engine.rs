//! End-to-end tests through the engine facade.

use std::sync::Arc;
use std::time::Duration;

use draftroom::prelude::*;
use draftroom::transport::Frame;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);

fn pool() -> Vec<Entity> {
    vec![
        Entity::new(10, "QB"),
        Entity::new(11, "QB"),
        Entity::new(20, "RB"),
        Entity::new(21, "RB"),
        Entity::new(30, "WR"),
        Entity::new(31, "WR"),
    ]
}

fn provision(room: u64, max_rounds: u32) -> RoomProvision {
    RoomProvision {
        room_id: RoomId(room),
        participants: vec![ParticipantSeed::new("alice"), ParticipantSeed::new("bob")],
        lineup: LineupConfig::standard(),
        max_rounds,
    }
}

fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        min_interval: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

async fn engine() -> (DraftEngine<MemoryStore>, Arc<MemoryStore>, MemoryPublisher) {
    let store = Arc::new(MemoryStore::new());
    let publisher = MemoryPublisher::new();
    let engine = DraftEngine::builder()
        .pipeline_config(fast_pipeline())
        .build(Arc::clone(&store), publisher.clone());
    engine.seed_pool(pool()).await.unwrap();
    (engine, store, publisher)
}

async fn start(engine: &DraftEngine<MemoryStore>, room: u64, max_rounds: u32) -> RoomId {
    let room_id = engine.create_room(provision(room, max_rounds)).await.unwrap();
    engine.join(room_id, A, ParticipantKey::new("alice"), None).await.unwrap();
    engine
        .join(room_id, B, ParticipantKey::new("bob"), Some("Bob".into()))
        .await
        .unwrap();
    engine.start_draft(room_id).await.unwrap();
    room_id
}

// =========================================================================
// Full drafts
// =========================================================================

#[tokio::test]
async fn test_two_participant_single_round_draft_completes() {
    let (engine, _store, publisher) = engine().await;
    let room = start(&engine, 1, 1).await;

    engine.make_pick(room, A, EntityId(10)).await.unwrap();
    assert_eq!(engine.next_turn(room).await.unwrap(), None);
    engine.make_pick(room, B, EntityId(20)).await.unwrap();

    let snapshot = engine.room_snapshot(room).await.unwrap();
    assert_eq!(snapshot.phase, DraftPhase::DraftComplete);
    assert_eq!(snapshot.participant(B).unwrap().display_name, "Bob");

    let history = engine.pick_history(room).await.unwrap();
    let numbers: Vec<u64> = history.iter().map(|r| r.pick_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(history[0].participant_id, A);
    assert_eq!(history[1].entity_id, EntityId(20));

    let stats = engine.room_stats(room).await.unwrap();
    assert_eq!(stats.total_picks, 2);

    engine.flush_broadcasts().await;
    let events = publisher.events_on("draft-room-1");
    assert_eq!(events.last().map(String::as_str), Some("draft-complete"));
}

#[tokio::test]
async fn test_available_entities_filters_by_category() {
    let (engine, _store, _publisher) = engine().await;
    let room = start(&engine, 1, 2).await;
    engine.make_pick(room, A, EntityId(20)).await.unwrap();

    let rbs = engine
        .available_entities(room, Some(&Category::new("rb")))
        .await
        .unwrap();
    assert_eq!(rbs.into_iter().collect::<Vec<_>>(), vec![EntityId(21)]);
    assert_eq!(engine.available_entities(room, None).await.unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_turn_owner_is_auto_picked_after_grace() {
    let (engine, _store, publisher) = engine().await;
    let room = start(&engine, 1, 1).await;
    engine
        .set_preferences(room, A, vec![EntityId(30)])
        .await
        .unwrap();

    engine.disconnect(room, A).await.unwrap();
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(engine.pick_history(room).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let history = engine.pick_history(room).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entity_id, EntityId(30));
    assert!(history[0].was_automatic);

    engine.flush_broadcasts().await;
    let events = publisher.events_on("draft-room-1");
    assert!(events.contains(&"participant-disconnected".to_string()));
    assert!(events.contains(&"auto-pick-made".to_string()));
}

#[tokio::test]
async fn test_reconnect_after_leave_keeps_roster() {
    let (engine, _store, _publisher) = engine().await;
    let room = start(&engine, 1, 2).await;
    engine.make_pick(room, A, EntityId(10)).await.unwrap();
    engine.leave(room, A).await.unwrap();

    let previous = engine
        .reconnect(room, ParticipantKey::new("alice"), ParticipantId(7))
        .await
        .unwrap();
    assert_eq!(previous, A);

    let snapshot = engine.room_snapshot(room).await.unwrap();
    let alice = snapshot.participant(ParticipantId(7)).unwrap();
    assert!(alice.connected);
    assert_eq!(alice.picks.len(), 1);
}

// =========================================================================
// Rooms on one store
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rooms_share_a_store_without_interference() {
    let (engine, _store, _publisher) = engine().await;
    let engine = Arc::new(engine);
    let first = start(&engine, 1, 1).await;
    let second = start(&engine, 2, 1).await;

    let picks = [first, second].map(|room| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.make_pick(room, A, EntityId(10)).await })
    });
    for pick in picks {
        assert!(pick.await.unwrap().is_ok());
    }
    assert_eq!(engine.room_ids().await, vec![first, second]);
}

#[tokio::test]
async fn test_destroy_room_then_operations_are_not_found() {
    let (engine, _store, _publisher) = engine().await;
    let room = start(&engine, 3, 1).await;
    engine.destroy_room(room).await.unwrap();

    let err = engine.make_pick(room, A, EntityId(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(engine.pick_history(room).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_slow_room_creation_does_not_block_other_calls() {
    let store = Arc::new(MemoryStore::with_latency(Duration::from_millis(500)));
    let engine = Arc::new(
        DraftEngine::builder()
            .pipeline_config(fast_pipeline())
            .build(store, MemoryPublisher::new()),
    );
    engine.seed_pool(pool()).await.unwrap();

    let creating = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.create_room(provision(1, 1)).await })
    };
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }

    // the store round trip is in flight; the registry stays responsive
    let ids = tokio::time::timeout(Duration::from_millis(1), engine.room_ids())
        .await
        .expect("registry lock is not held across the store call");
    assert!(ids.is_empty());
    let err = engine.create_room(provision(1, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);

    assert_eq!(creating.await.unwrap().unwrap(), RoomId(1));
    assert_eq!(engine.room_ids().await, vec![RoomId(1)]);
}

// =========================================================================
// Degraded dependencies
// =========================================================================

#[tokio::test]
async fn test_health_check_reports_store_outage() {
    let (engine, store, _publisher) = engine().await;
    engine.health_check().await.unwrap();

    store.set_available(false);
    let err = engine.health_check().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
}

#[tokio::test]
async fn test_transport_failure_degrades_without_blocking_picks() {
    let (engine, _store, publisher) = engine().await;
    let room = start(&engine, 1, 1).await;
    engine.flush_broadcasts().await;

    publisher.fail_next(draftroom::transport::TransportError::PublishFailed("provider down".into()));
    engine.make_pick(room, A, EntityId(10)).await.unwrap();
    engine.flush_broadcasts().await;
    assert!(engine.transport_status().degraded);

    // picks keep committing while observers lag
    engine.make_pick(room, B, EntityId(20)).await.unwrap();
    assert_eq!(engine.pick_history(room).await.unwrap().len(), 2);
    assert!(engine.transport_status().dropped >= 1);

    engine.reset_transport();
    assert!(!engine.transport_status().degraded);
}

#[tokio::test]
async fn test_config_from_json_builds_engine() {
    let config = EngineConfig::from_json(r#"{"room":{"max_participants":2}}"#).unwrap();
    let engine = DraftEngine::builder()
        .config(config)
        .build(Arc::new(MemoryStore::new()), MemoryPublisher::new());
    engine.seed_pool(pool()).await.unwrap();

    let mut seeded = provision(1, 1);
    seeded.participants.push(ParticipantSeed::new("carol"));
    let err = engine.create_room(seeded).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

// =========================================================================
// WebSocket observers
// =========================================================================

#[tokio::test]
async fn test_websocket_observer_sees_committed_pick() {
    let (engine, addr) = DraftEngine::builder()
        .pipeline_config(fast_pipeline())
        .build_with_websocket(Arc::new(MemoryStore::new()), "127.0.0.1:0", 0)
        .await
        .unwrap();
    engine.seed_pool(pool()).await.unwrap();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws.send(Message::Text("draft-room-5".to_string().into()))
        .await
        .expect("subscribe frame should send");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let room = start(&engine, 5, 1).await;
    engine.make_pick(room, A, EntityId(11)).await.unwrap();

    let pick = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let frame: Frame = serde_json::from_str(text.as_str()).expect("frame is JSON");
            if frame.event == "pick-made" {
                return Some(frame);
            }
        }
        None
    })
    .await
    .expect("pick frame should arrive")
    .expect("stream open");

    assert_eq!(pick.channel, "draft-room-5");
    assert_eq!(pick.data["record"]["entity_id"], 11);
    assert_eq!(pick.data["record"]["slot"], "QB");
}
