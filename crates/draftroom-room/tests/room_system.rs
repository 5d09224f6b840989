//! Integration tests for the room system against the in-memory store and
//! publisher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use draftroom_clock::ClockConfig;
use draftroom_ledger::{AtomicStore, CheckAndInsert, CheckOutcome, MemoryStore, PickLedger, StoreError};
use draftroom_protocol::{
    DeadlineKind, Entity, EntityId, LineupConfig, ParticipantId, ParticipantKey, ParticipantSeed,
    PickSource, RoomId, RoomProvision, SlotLimit, room_channel,
};
use draftroom_room::{
    AutoPickOutcome, DraftPhase, ErrorKind, JoinOutcome, RoomConfig, RoomError, RoomHandle,
    RoomRegistry,
};
use draftroom_transport::{Broadcaster, MemoryPublisher, PipelineConfig};

// =========================================================================
// Fixtures
// =========================================================================

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);

struct Fixture {
    registry: RoomRegistry<MemoryStore>,
    store: Arc<MemoryStore>,
    publisher: MemoryPublisher,
    broadcaster: Broadcaster,
}

/// QB, RB, WR entities with ids 1..=12.
fn pool() -> Vec<Entity> {
    let categories = ["QB", "RB", "WR"];
    (1..=12).map(|id| Entity::new(id, categories[(id as usize - 1) % 3])).collect()
}

/// One QB, one RB, one WR, one bench spot.
fn lineup() -> LineupConfig {
    LineupConfig {
        slots: vec![
            SlotLimit::new("QB", 1, 1),
            SlotLimit::new("RB", 1, 1),
            SlotLimit::new("WR", 1, 1),
        ],
        flex_eligible: Default::default(),
        bench_capacity: 1,
    }
}

fn provision(room: u64, max_rounds: u32) -> RoomProvision {
    RoomProvision {
        room_id: RoomId(room),
        participants: Vec::new(),
        lineup: lineup(),
        max_rounds,
    }
}

fn config() -> RoomConfig {
    RoomConfig {
        clock: ClockConfig {
            turn_timeout: Duration::from_secs(15),
            disconnect_grace: Duration::from_secs(30),
        },
        ..RoomConfig::default()
    }
}

async fn fixture_with(config: RoomConfig, entities: Vec<Entity>) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let publisher = MemoryPublisher::new();
    let broadcaster = Broadcaster::spawn(
        publisher.clone(),
        PipelineConfig {
            min_interval: Duration::ZERO,
            ..PipelineConfig::default()
        },
    );
    let mut registry = RoomRegistry::new(PickLedger::new(Arc::clone(&store)), broadcaster.clone(), config);
    registry.seed_pool(entities).await.unwrap();
    Fixture {
        registry,
        store,
        publisher,
        broadcaster,
    }
}

async fn fixture() -> Fixture {
    fixture_with(config(), pool()).await
}

fn key(name: &str) -> ParticipantKey {
    ParticipantKey::new(name)
}

/// Creates a room, joins alice as A and bob as B, and starts.
async fn started_room(fx: &mut Fixture, max_rounds: u32) -> RoomHandle {
    let room = fx.registry.create_room(provision(1, max_rounds)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();
    room.start().await.unwrap();
    room
}

async fn events(fx: &Fixture, room: u64) -> Vec<String> {
    fx.broadcaster.flush().await;
    fx.publisher.events_on(&room_channel(RoomId(room)))
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_create_room_duplicate_id_is_rejected() {
    let mut fx = fixture().await;
    fx.registry.create_room(provision(1, 2)).await.unwrap();
    let err = fx.registry.create_room(provision(1, 2)).await.err().unwrap();
    assert!(matches!(err, RoomError::AlreadyExists(RoomId(1))));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert_eq!(fx.registry.room_count(), 1);
}

#[tokio::test]
async fn test_create_room_max_rounds_out_of_range_is_invalid() {
    let mut fx = fixture().await;
    assert!(matches!(
        fx.registry.create_room(provision(1, 0)).await,
        Err(RoomError::InvalidProvision(_))
    ));
    // capacity is 3 + 1 bench
    assert!(matches!(
        fx.registry.create_room(provision(1, 5)).await,
        Err(RoomError::InvalidProvision(_))
    ));
    assert!(fx.registry.create_room(provision(1, 4)).await.is_ok());
}

#[tokio::test]
async fn test_create_room_before_seeding_is_invalid() {
    let store = Arc::new(MemoryStore::new());
    let broadcaster = Broadcaster::spawn(MemoryPublisher::new(), PipelineConfig::default());
    let mut registry = RoomRegistry::new(PickLedger::new(store), broadcaster, config());
    assert!(matches!(
        registry.create_room(provision(1, 2)).await,
        Err(RoomError::InvalidProvision(_))
    ));
}

#[tokio::test]
async fn test_reserve_holds_id_until_released() {
    let mut fx = fixture().await;
    let pending = fx.registry.reserve(provision(4, 2)).unwrap();
    assert!(matches!(
        fx.registry.reserve(provision(4, 2)),
        Err(RoomError::AlreadyExists(RoomId(4)))
    ));
    assert!(matches!(fx.registry.room(RoomId(4)), Err(RoomError::NotFound(_))));

    fx.registry.release(pending.room_id());
    let pending = fx.registry.reserve(provision(4, 2)).unwrap();
    let room = fx.registry.activate(pending);
    assert_eq!(room.room_id(), RoomId(4));
    assert_eq!(fx.registry.room_ids(), vec![RoomId(4)]);
}

#[tokio::test]
async fn test_destroy_room_frees_the_id() {
    let mut fx = fixture().await;
    fx.registry.create_room(provision(7, 2)).await.unwrap();
    fx.registry.destroy_room(RoomId(7)).await.unwrap();

    assert!(matches!(fx.registry.room(RoomId(7)), Err(RoomError::NotFound(_))));
    assert!(fx.registry.create_room(provision(7, 2)).await.is_ok());
    assert_eq!(fx.registry.room_ids(), vec![RoomId(7)]);
}

// =========================================================================
// Joining and starting
// =========================================================================

#[tokio::test]
async fn test_join_unknown_key_with_seed_list_is_rejected() {
    let mut fx = fixture().await;
    let mut seeded = provision(1, 2);
    seeded.participants = vec![ParticipantSeed::new("alice"), ParticipantSeed::new("bob")];
    let room = fx.registry.create_room(seeded).await.unwrap();

    assert_eq!(room.join(A, key("ALICE"), None).await.unwrap(), JoinOutcome::Joined);
    let err = room.join(B, key("mallory"), None).await.unwrap_err();
    assert!(matches!(err, RoomError::NotInvited(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_join_when_full_is_rejected() {
    let mut fx = fixture_with(
        RoomConfig {
            max_participants: 2,
            ..config()
        },
        pool(),
    )
    .await;
    let room = fx.registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();
    assert!(matches!(
        room.join(ParticipantId(3), key("carol"), None).await,
        Err(RoomError::RoomFull(_))
    ));
}

#[tokio::test]
async fn test_start_with_one_participant_is_rejected() {
    let mut fx = fixture().await;
    let room = fx.registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();

    assert!(matches!(
        room.start().await,
        Err(RoomError::NotEnoughParticipants { have: 1, need: 2 })
    ));
    assert_eq!(room.snapshot().await.unwrap().phase, DraftPhase::NotStarted);
}

#[tokio::test]
async fn test_leave_before_start_removes_participant() {
    let mut fx = fixture().await;
    let room = fx.registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();
    room.leave(B).await.unwrap();

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.turn_order, vec![A]);
    assert!(room.start().await.is_err());
    assert!(events(&fx, 1).await.contains(&"participant-left".to_string()));
}

#[tokio::test]
async fn test_join_after_start_with_new_key_is_rejected() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    assert!(matches!(
        room.join(ParticipantId(3), key("carol"), None).await,
        Err(RoomError::InvalidPhase(_))
    ));
}

// =========================================================================
// Manual picks
// =========================================================================

#[tokio::test]
async fn test_full_draft_two_participants_one_round_completes() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 1).await;

    let first = room.pick(A, EntityId(1)).await.unwrap();
    assert_eq!(first.pick_number, 1);
    let second = room.pick(B, EntityId(2)).await.unwrap();
    assert_eq!(second.pick_number, 2);

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, DraftPhase::DraftComplete);
    assert_eq!(snapshot.stats.unwrap().total_picks, 2);
    assert_eq!(snapshot.time_left_ms, None);
    assert!(!snapshot.available.contains(&EntityId(1)));

    let names = events(&fx, 1).await;
    let tail: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !name.starts_with("draft-pool") && !name.starts_with("participant-"))
        .collect();
    assert_eq!(
        tail,
        vec![
            "draft-started",
            "turn-started",
            "pick-made",
            "turn-started",
            "pick-made",
            "draft-complete"
        ]
    );
    assert!(names.contains(&"draft-pool-meta".to_string()));
}

#[tokio::test]
async fn test_snake_order_reverses_each_round() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    room.pick(A, EntityId(1)).await.unwrap();
    room.pick(B, EntityId(2)).await.unwrap();
    // round 2 starts with B
    assert!(matches!(
        room.pick(A, EntityId(3)).await,
        Err(RoomError::NotYourTurn { current: Some(B), .. })
    ));
    room.pick(B, EntityId(3)).await.unwrap();
    room.pick(A, EntityId(5)).await.unwrap();

    assert_eq!(room.snapshot().await.unwrap().phase, DraftPhase::DraftComplete);
    assert!(events(&fx, 1).await.contains(&"round-complete".to_string()));
}

#[tokio::test]
async fn test_pick_taken_entity_is_a_race_loss() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    room.pick(A, EntityId(1)).await.unwrap();

    let err = room.pick(B, EntityId(1)).await.unwrap_err();
    assert!(matches!(err, RoomError::AlreadyPicked(EntityId(1))));
    assert_eq!(err.kind(), ErrorKind::RaceLoss);
    assert_eq!(room.snapshot().await.unwrap().current_participant, Some(B));
}

#[tokio::test]
async fn test_pick_unknown_entity_is_rejected() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    assert!(matches!(
        room.pick(A, EntityId(999)).await,
        Err(RoomError::EntityUnknown(EntityId(999)))
    ));
}

#[tokio::test]
async fn test_pick_without_legal_slot_is_rejected() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 4).await;

    room.pick(A, EntityId(1)).await.unwrap();
    room.pick(B, EntityId(2)).await.unwrap();
    room.pick(B, EntityId(3)).await.unwrap();
    room.pick(A, EntityId(4)).await.unwrap();
    room.pick(A, EntityId(5)).await.unwrap();
    // B: RB, WR, then a second RB on the bench
    room.pick(B, EntityId(8)).await.unwrap();

    let err = room.pick(B, EntityId(11)).await.unwrap_err();
    assert!(matches!(err, RoomError::NoLegalSlot { entity: EntityId(11), .. }));
    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.available.contains(&EntityId(11)));
    assert_eq!(snapshot.current_participant, Some(B));
}

#[tokio::test]
async fn test_rooms_draft_the_same_entity_independently() {
    let mut fx = fixture().await;
    let first = fx.registry.create_room(provision(1, 1)).await.unwrap();
    let second = fx.registry.create_room(provision(2, 1)).await.unwrap();
    for room in [&first, &second] {
        room.join(A, key("alice"), None).await.unwrap();
        room.join(B, key("bob"), None).await.unwrap();
        room.start().await.unwrap();
    }

    assert!(first.pick(A, EntityId(1)).await.is_ok());
    assert!(second.pick(A, EntityId(1)).await.is_ok());
}

// =========================================================================
// Auto-pick and timers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_auto_picks_first_preference() {
    let mut fx = fixture().await;
    let room = fx.registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();
    room.set_preferences(A, vec![EntityId(999), EntityId(6), EntityId(6)])
        .await
        .unwrap();
    room.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(16)).await;

    let snapshot = room.snapshot().await.unwrap();
    let alice = snapshot.participant(A).unwrap();
    assert_eq!(alice.preferences, vec![EntityId(6)]);
    assert_eq!(alice.picks.len(), 1);
    assert_eq!(alice.picks[0].entity_id, EntityId(6));
    assert!(alice.picks[0].was_automatic);
    assert_eq!(snapshot.current_participant, Some(B));
    assert!(events(&fx, 1).await.contains(&"auto-pick-made".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_manual_pick_before_deadline_cancels_expiry() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    tokio::time::sleep(Duration::from_secs(14)).await;
    room.pick(A, EntityId(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.stats.unwrap().total_picks, 1);
    assert_eq!(snapshot.current_participant, Some(B));
    assert!(snapshot.time_left_ms.unwrap() > 12_000);
}

#[tokio::test(start_paused = true)]
async fn test_request_auto_pick_takes_lowest_legal_id() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    let outcome = room.auto_pick(A).await.unwrap();
    let AutoPickOutcome::Picked { record, .. } = outcome else {
        panic!("expected a pick, got {outcome:?}");
    };
    assert_eq!(record.entity_id, EntityId(1));
    assert!(matches!(room.auto_pick(A).await, Err(RoomError::NotYourTurn { .. })));
}

/// A [`MemoryStore`] where another room instance claims one chosen
/// entity just before this caller's next pick reaches the store.
#[derive(Default)]
struct ContestedStore {
    inner: MemoryStore,
    contested: Mutex<Option<EntityId>>,
}

impl ContestedStore {
    fn contest(&self, entity: EntityId) {
        *self.contested.lock().unwrap() = Some(entity);
    }
}

impl AtomicStore for ContestedStore {
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        self.inner.set_add(key, members).await
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.inner.set_is_member(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_members(key).await
    }

    async fn set_difference(&self, key: &str, minus: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_difference(key, minus).await
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        self.inner.set_card(key).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner.hash_set(key, field, value).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.inner.hash_get(key, field).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.inner.hash_get_all(key).await
    }

    async fn hash_incr(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        self.inner.hash_incr(key, field, by).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.exists(key).await
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        self.inner.delete(keys).await
    }

    async fn check_and_insert(&self, op: &CheckAndInsert) -> Result<CheckOutcome, StoreError> {
        let contested = self.contested.lock().unwrap().take_if(|id| id.to_string() == op.member);
        if contested.is_some() {
            self.inner.set_add(&op.picked_key, &[op.member.clone()]).await?;
        }
        self.inner.check_and_insert(op).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_auto_pick_losing_race_moves_to_next_candidate() {
    let store = Arc::new(ContestedStore::default());
    let broadcaster = Broadcaster::spawn(MemoryPublisher::new(), PipelineConfig::default());
    let mut registry = RoomRegistry::new(PickLedger::new(Arc::clone(&store)), broadcaster, config());
    registry.seed_pool(pool()).await.unwrap();
    let room = registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();
    room.set_preferences(A, vec![EntityId(6), EntityId(9)]).await.unwrap();
    room.start().await.unwrap();

    store.contest(EntityId(6));
    let outcome = room.auto_pick(A).await.unwrap();
    let AutoPickOutcome::Picked { record, source } = outcome else {
        panic!("expected a pick, got {outcome:?}");
    };
    assert_eq!(record.entity_id, EntityId(9));
    assert_eq!(source, PickSource::Preference { rank: 1 });
    assert!(record.was_automatic);

    let snapshot = room.snapshot().await.unwrap();
    assert!(!snapshot.available.contains(&EntityId(6)));
    assert_eq!(snapshot.participant(A).unwrap().picks.len(), 1);
    assert_eq!(snapshot.current_participant, Some(B));
}

#[tokio::test(start_paused = true)]
async fn test_auto_pick_with_exhausted_pool_records_no_pick() {
    let mut fx = fixture_with(config(), vec![Entity::new(1, "QB"), Entity::new(2, "RB")]).await;
    let room = started_room(&mut fx, 2).await;
    room.pick(A, EntityId(1)).await.unwrap();
    room.pick(B, EntityId(2)).await.unwrap();

    let outcome = room.auto_pick(B).await.unwrap();
    assert_eq!(
        outcome,
        AutoPickOutcome::NoPick {
            reason: "pool exhausted".into()
        }
    );
    tokio::time::sleep(Duration::from_secs(16)).await;

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, DraftPhase::DraftComplete);
    assert_eq!(snapshot.stats.unwrap().total_picks, 2);
    let names = events(&fx, 1).await;
    assert_eq!(names.iter().filter(|n| *n == "no-pick").count(), 2);
}

// =========================================================================
// Disconnect and reconnect
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_holding_turn_waits_for_grace() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    room.disconnect(A).await.unwrap();
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.deadline_kind, Some(DeadlineKind::Grace));
    assert!(!snapshot.participant(A).unwrap().connected);

    // past the turn timeout, still inside the grace window
    tokio::time::sleep(Duration::from_secs(20)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.current_participant, Some(A));
    assert!(snapshot.participant(A).unwrap().picks.is_empty());

    tokio::time::sleep(Duration::from_secs(11)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.participant(A).unwrap().picks.len(), 1);
    assert_eq!(snapshot.current_participant, Some(B));
    assert_eq!(snapshot.deadline_kind, Some(DeadlineKind::Turn));
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_during_grace_reconnects_and_restores_turn_timer() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    room.pick(A, EntityId(1)).await.unwrap();
    room.disconnect(A).await.unwrap();
    room.pick(B, EntityId(2)).await.unwrap();

    // round 2: B then A, and A is away
    room.pick(B, EntityId(3)).await.unwrap();
    assert_eq!(room.snapshot().await.unwrap().deadline_kind, Some(DeadlineKind::Grace));

    let fresh = ParticipantId(10);
    let outcome = room.join(fresh, key("Alice"), None).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Reconnected { previous: A });

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.current_participant, Some(fresh));
    assert_eq!(snapshot.deadline_kind, Some(DeadlineKind::Turn));
    assert_eq!(snapshot.turn_order, vec![fresh, B]);
    let alice = snapshot.participant(fresh).unwrap();
    assert_eq!(alice.picks[0].entity_id, EntityId(1));
    assert_eq!(alice.picks[0].participant_id, fresh);

    room.pick(fresh, EntityId(5)).await.unwrap();
    assert_eq!(room.snapshot().await.unwrap().phase, DraftPhase::DraftComplete);

    let names = events(&fx, 1).await;
    assert!(names.contains(&"participant-reconnected".to_string()));
    // initial pool plus the resync
    assert_eq!(names.iter().filter(|n| *n == "draft-pool-meta").count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_turn_holder_cannot_pick() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    room.disconnect(A).await.unwrap();

    let err = room.pick(A, EntityId(1)).await.unwrap_err();
    assert!(matches!(err, RoomError::Disconnected(A)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(room.auto_pick(A).await, Err(RoomError::Disconnected(A))));

    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.participant(A).unwrap().picks.is_empty());
    assert_eq!(snapshot.current_participant, Some(A));
    assert_eq!(snapshot.deadline_kind, Some(DeadlineKind::Grace));

    // the grace deadline still picks for the frozen participant
    tokio::time::sleep(Duration::from_secs(31)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.participant(A).unwrap().picks.len(), 1);
    assert_eq!(snapshot.current_participant, Some(B));
}

#[tokio::test]
async fn test_reconnect_live_key_is_rejected() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;
    assert!(matches!(
        room.reconnect(key("alice"), ParticipantId(10)).await,
        Err(RoomError::Session(_))
    ));
}

// =========================================================================
// Store outages
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pick_with_store_down_fails_closed() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    fx.store.set_available(false);
    let err = room.pick(A, EntityId(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.stale);
    assert!(snapshot.available.contains(&EntityId(1)));
    assert_eq!(snapshot.current_participant, Some(A));

    fx.store.set_available(true);
    room.pick(A, EntityId(1)).await.unwrap();
    assert!(!room.snapshot().await.unwrap().stale);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_with_store_down_rearms_turn_timer() {
    let mut fx = fixture().await;
    let room = started_room(&mut fx, 2).await;

    fx.store.set_available(false);
    tokio::time::sleep(Duration::from_secs(16)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.current_participant, Some(A));
    assert_eq!(snapshot.deadline_kind, Some(DeadlineKind::Turn));

    fx.store.set_available(true);
    tokio::time::sleep(Duration::from_secs(15)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.participant(A).unwrap().picks.len(), 1);
    assert_eq!(snapshot.current_participant, Some(B));
}

#[tokio::test]
async fn test_start_with_store_down_fails_closed() {
    let mut fx = fixture().await;
    let room = fx.registry.create_room(provision(1, 2)).await.unwrap();
    room.join(A, key("alice"), None).await.unwrap();
    room.join(B, key("bob"), None).await.unwrap();

    fx.store.set_available(false);
    assert!(matches!(room.start().await, Err(RoomError::StoreUnavailable(_))));
    fx.store.set_available(true);
    assert_eq!(room.start().await.unwrap(), vec![A, B]);
}
