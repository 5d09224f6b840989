//! Integration tests for the turn clock.
//!
//! Time is paused, so `sleep_until` resolves as soon as the runtime is
//! idle and `advance` moves the clock deterministically.

use std::time::Duration;

use draftroom_clock::{ClockConfig, TurnClock, TurnKey};
use draftroom_protocol::{DeadlineKind, ParticipantId};
use tokio::time::{self, Instant};

// =========================================================================
// Helpers
// =========================================================================

fn config() -> ClockConfig {
    ClockConfig {
        turn_timeout: Duration::from_secs(15),
        disconnect_grace: Duration::from_secs(30),
    }
}

const ALICE: ParticipantId = ParticipantId(1);
const BOB: ParticipantId = ParticipantId(2);

// =========================================================================
// ClockConfig
// =========================================================================

#[test]
fn test_default_config_matches_turn_and_grace_defaults() {
    let cfg = ClockConfig::default();
    assert_eq!(cfg.turn_timeout, Duration::from_secs(15));
    assert_eq!(cfg.disconnect_grace, Duration::from_secs(30));
}

#[test]
fn test_validated_raises_grace_not_longer_than_turn() {
    let cfg = ClockConfig {
        turn_timeout: Duration::from_secs(10),
        disconnect_grace: Duration::from_secs(10),
    }
    .validated();
    assert_eq!(cfg.disconnect_grace, Duration::from_secs(20));
}

#[test]
fn test_validated_raises_zero_timeouts_to_floor() {
    let cfg = ClockConfig {
        turn_timeout: Duration::ZERO,
        disconnect_grace: Duration::ZERO,
    }
    .validated();
    assert_eq!(cfg.turn_timeout, ClockConfig::MIN_TIMEOUT);
    assert!(cfg.disconnect_grace > cfg.turn_timeout);
}

#[test]
fn test_duration_for_each_kind() {
    let cfg = config();
    assert_eq!(cfg.duration_for(DeadlineKind::Turn), Duration::from_secs(15));
    assert_eq!(cfg.duration_for(DeadlineKind::Grace), Duration::from_secs(30));
}

// =========================================================================
// Arming and firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_expiry_fires_after_turn_timeout() {
    let mut clock = TurnClock::new(config());
    let started = Instant::now();
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);

    let expiry = clock.wait_for_expiry().await;

    assert_eq!(expiry.owner, ALICE);
    assert_eq!(expiry.turn, TurnKey::new(1, 0));
    assert_eq!(expiry.kind, DeadlineKind::Turn);
    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert!(!clock.is_armed());
    assert_eq!(clock.metrics().expired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_grace_deadline_is_longer_than_turn() {
    let mut clock = TurnClock::new(config());
    let started = Instant::now();
    clock.arm(ALICE, TurnKey::new(2, 1), DeadlineKind::Grace);

    let expiry = clock.wait_for_expiry().await;

    assert_eq!(expiry.kind, DeadlineKind::Grace);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert_eq!(clock.metrics().grace_expired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_expiry_pends_when_disarmed() {
    let mut clock = TurnClock::new(config());
    let result = time::timeout(Duration::from_secs(3600), clock.wait_for_expiry()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_previous_deadline() {
    let mut clock = TurnClock::new(config());
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);
    time::advance(Duration::from_secs(10)).await;
    clock.arm(BOB, TurnKey::new(1, 1), DeadlineKind::Turn);

    let started = Instant::now();
    let expiry = clock.wait_for_expiry().await;

    assert_eq!(expiry.owner, BOB);
    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert_eq!(expiry.generation, 2);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let mut clock = TurnClock::new(config());
    assert_eq!(clock.remaining(), None);
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);
    time::advance(Duration::from_secs(4)).await;
    assert_eq!(clock.remaining(), Some(Duration::from_secs(11)));
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_expiry() {
    let mut clock = TurnClock::new(config());
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);
    assert!(clock.cancel());
    assert!(!clock.cancel());

    let result = time::timeout(Duration::from_secs(60), clock.wait_for_expiry()).await;
    assert!(result.is_err());
    assert_eq!(clock.metrics().cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_for_only_touches_own_deadline() {
    let mut clock = TurnClock::new(config());
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);

    assert!(!clock.cancel_for(BOB));
    assert_eq!(clock.owner(), Some(ALICE));
    assert!(clock.cancel_for(ALICE));
    assert!(!clock.is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_leaves_deadline_armed() {
    let mut clock = TurnClock::new(config());
    clock.arm(ALICE, TurnKey::new(1, 0), DeadlineKind::Turn);

    let early = time::timeout(Duration::from_secs(5), clock.wait_for_expiry()).await;
    assert!(early.is_err());
    assert!(clock.is_armed());

    let expiry = clock.wait_for_expiry().await;
    assert_eq!(expiry.owner, ALICE);
}
