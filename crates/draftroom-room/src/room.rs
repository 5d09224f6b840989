//! Room actor: an isolated Tokio task that owns one draft.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Every state change (joins, picks, timer
//! expiries, disconnects) happens inside that one task, so they are
//! serialized without locks. The only state shared with other tasks is
//! the pick ledger, whose store arbitrates races by itself.
//!
//! ```text
//! RoomHandle ──cmd──→ [ mpsc ] ──→ RoomActor::run ←── TurnClock expiry
//!                                       │
//!                                       ├──→ PickLedger (atomic store)
//!                                       └──→ Broadcaster (events, in commit order)
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use draftroom_clock::{Expiry, TurnClock, TurnKey};
use draftroom_ledger::{AtomicStore, EntityCatalog, PickError, PickLedger, PickRequest, RoomStats};
use draftroom_protocol::{
    DeadlineKind, DraftEvent, Entity, EntityId, LineupConfig, ParticipantId, ParticipantKey,
    PickRecord, PickSource, RoomId, RoomProvision, room_channel,
};
use draftroom_session::{SessionError, SessionManager};
use draftroom_transport::Broadcaster;
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::governor::{Fallback, select_fallback};
use crate::roster::{Placement, SlotOpening, open_slots, place};
use crate::sequencer::{Advance, DraftPhase, TurnSequencer};
use crate::{RoomConfig, RoomError};

/// Event name the available pool is streamed under, in chunks.
pub const POOL_EVENT: &str = "draft-pool";

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        participant: ParticipantId,
        key: ParticipantKey,
        display_name: Option<String>,
        reply: Reply<JoinOutcome>,
    },
    Leave {
        participant: ParticipantId,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<Vec<ParticipantId>>,
    },
    Pick {
        participant: ParticipantId,
        entity: EntityId,
        reply: Reply<PickRecord>,
    },
    AutoPick {
        participant: ParticipantId,
        reply: Reply<AutoPickOutcome>,
    },
    SetPreferences {
        participant: ParticipantId,
        preferences: Vec<EntityId>,
        reply: Reply<Vec<EntityId>>,
    },
    Disconnect {
        participant: ParticipantId,
        reply: Reply<()>,
    },
    Reconnect {
        key: ParticipantKey,
        participant: ParticipantId,
        reply: Reply<ParticipantId>,
    },
    NextTurn {
        reply: oneshot::Sender<Option<(TurnKey, ParticipantId)>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// How a join was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// The draft had started and the key was frozen, so the join was
    /// treated as a reconnect.
    Reconnected { previous: ParticipantId },
}

/// What an auto-pick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoPickOutcome {
    Picked { record: PickRecord, source: PickSource },
    NoPick { reason: String },
}

/// One participant as a snapshot shows it.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub key: ParticipantKey,
    pub display_name: String,
    pub connected: bool,
    pub picks: Vec<PickRecord>,
    pub preferences: Vec<EntityId>,
    pub open_slots: Vec<SlotOpening>,
}

/// A point-in-time view of a room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub phase: DraftPhase,
    pub current_turn: Option<TurnKey>,
    pub current_participant: Option<ParticipantId>,
    pub next_participant: Option<ParticipantId>,
    /// The base order once started; join order before.
    pub turn_order: Vec<ParticipantId>,
    pub max_rounds: u32,
    pub participants: Vec<ParticipantView>,
    pub available: Vec<EntityId>,
    pub stats: Option<RoomStats>,
    pub time_left_ms: Option<u64>,
    pub deadline_kind: Option<DeadlineKind>,
    /// Set when the store could not be reached and `available` is the
    /// last-known pool rather than the store's current answer.
    pub stale: bool,
}

impl RoomSnapshot {
    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| p.id == id)
    }
}

#[derive(Serialize)]
struct PoolMeta {
    room_id: RoomId,
    round: u32,
    available: usize,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Used to send commands to it.
///
/// This is cheap to clone; it's just an `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's unique ID.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Sends a command and waits for the actor's reply.
    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Joins `key` under connection id `participant`. After the draft
    /// has started, a frozen key is reconnected instead.
    pub async fn join(
        &self,
        participant: ParticipantId,
        key: ParticipantKey,
        display_name: Option<String>,
    ) -> Result<JoinOutcome, RoomError> {
        self.call(|reply| RoomCommand::Join {
            participant,
            key,
            display_name,
            reply,
        })
        .await?
    }

    /// Removes a participant before the draft starts; freezes it after.
    pub async fn leave(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Leave { participant, reply }).await?
    }

    /// Starts the draft. Returns the base turn order.
    pub async fn start(&self) -> Result<Vec<ParticipantId>, RoomError> {
        self.call(|reply| RoomCommand::Start { reply }).await?
    }

    /// A manual pick by the participant holding the turn.
    pub async fn pick(&self, participant: ParticipantId, entity: EntityId) -> Result<PickRecord, RoomError> {
        self.call(|reply| RoomCommand::Pick {
            participant,
            entity,
            reply,
        })
        .await?
    }

    /// Lets the turn holder hand its pick to auto-pick right away.
    pub async fn auto_pick(&self, participant: ParticipantId) -> Result<AutoPickOutcome, RoomError> {
        self.call(|reply| RoomCommand::AutoPick { participant, reply }).await?
    }

    /// Replaces a participant's preference list. Returns the stored list.
    pub async fn set_preferences(
        &self,
        participant: ParticipantId,
        preferences: Vec<EntityId>,
    ) -> Result<Vec<EntityId>, RoomError> {
        self.call(|reply| RoomCommand::SetPreferences {
            participant,
            preferences,
            reply,
        })
        .await?
    }

    pub async fn disconnect(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Disconnect { participant, reply }).await?
    }

    /// Re-attaches the frozen participant known by `key` to the new
    /// connection id. Returns the id it replaced.
    pub async fn reconnect(&self, key: ParticipantKey, participant: ParticipantId) -> Result<ParticipantId, RoomError> {
        self.call(|reply| RoomCommand::Reconnect {
            key,
            participant,
            reply,
        })
        .await?
    }

    /// The turn after the current one.
    pub async fn next_turn(&self) -> Result<Option<(TurnKey, ParticipantId)>, RoomError> {
        self.call(|reply| RoomCommand::NextTurn { reply }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Stops the actor and waits for it to acknowledge.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Shutdown { reply }).await
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// Everything a room actor is built from.
pub(crate) struct RoomSetup<S> {
    pub provision: RoomProvision,
    pub config: RoomConfig,
    pub ledger: PickLedger<S>,
    pub catalog: Arc<EntityCatalog>,
    pub broadcaster: Broadcaster,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S> {
    room_id: RoomId,
    channel: String,
    config: RoomConfig,
    lineup: LineupConfig,
    /// Seeded keys and their display names. Empty means open.
    invited: HashMap<ParticipantKey, Option<String>>,
    sessions: SessionManager,
    sequencer: TurnSequencer,
    clock: TurnClock,
    ledger: PickLedger<S>,
    catalog: Arc<EntityCatalog>,
    broadcaster: Broadcaster,
    /// Last pool the store reported, for stale snapshots.
    last_pool: Option<BTreeSet<EntityId>>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: AtomicStore> RoomActor<S> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        info!(room_id = %self.room_id, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd).await {
                        break;
                    }
                }
                expiry = self.clock.wait_for_expiry() => {
                    self.on_expiry(expiry).await;
                }
            }
        }

        self.clock.cancel();
        info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Handles one command. Returns `false` when the actor should stop.
    async fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                participant,
                key,
                display_name,
                reply,
            } => {
                let result = self.handle_join(participant, key, display_name).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { participant, reply } => {
                let result = self.handle_leave(participant);
                let _ = reply.send(result);
            }
            RoomCommand::Start { reply } => {
                let result = self.handle_start().await;
                let _ = reply.send(result);
            }
            RoomCommand::Pick {
                participant,
                entity,
                reply,
            } => {
                let result = self.handle_pick(participant, entity).await;
                let _ = reply.send(result);
            }
            RoomCommand::AutoPick { participant, reply } => {
                let result = match self.check_turn(participant) {
                    Ok(turn) => self.run_auto_pick(participant, turn).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            RoomCommand::SetPreferences {
                participant,
                preferences,
                reply,
            } => {
                let result = self.handle_set_preferences(participant, preferences);
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect { participant, reply } => {
                let result = self.handle_disconnect(participant);
                let _ = reply.send(result);
            }
            RoomCommand::Reconnect {
                key,
                participant,
                reply,
            } => {
                let result = self.handle_reconnect(key, participant).await;
                let _ = reply.send(result);
            }
            RoomCommand::NextTurn { reply } => {
                let _ = reply.send(self.sequencer.next_turn());
            }
            RoomCommand::Snapshot { reply } => {
                let snapshot = self.snapshot().await;
                let _ = reply.send(snapshot);
            }
            RoomCommand::Shutdown { reply } => {
                info!(room_id = %self.room_id, "room shutting down");
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // -- membership ---------------------------------------------------------

    async fn handle_join(
        &mut self,
        participant: ParticipantId,
        key: ParticipantKey,
        display_name: Option<String>,
    ) -> Result<JoinOutcome, RoomError> {
        if self.sequencer.phase().is_started() {
            if self.sessions.is_frozen_key(&key) {
                let previous = self.handle_reconnect(key, participant).await?;
                return Ok(JoinOutcome::Reconnected { previous });
            }
            return Err(RoomError::InvalidPhase("draft already started".into()));
        }

        let seeded_name = if self.invited.is_empty() {
            None
        } else {
            match self.invited.get(&key) {
                Some(name) => name.clone(),
                None => return Err(RoomError::NotInvited(key)),
            }
        };
        if self.sessions.len() >= self.config.max_participants {
            return Err(RoomError::RoomFull(self.room_id));
        }

        let joined = self.sessions.join(participant, key, display_name.or(seeded_name))?;
        let event = DraftEvent::ParticipantJoined {
            participant,
            key: joined.key.clone(),
            display_name: joined.display_name.clone(),
        };
        info!(
            room_id = %self.room_id,
            %participant,
            participants = self.sessions.len(),
            "participant joined room"
        );
        self.emit(event);
        Ok(JoinOutcome::Joined)
    }

    fn handle_leave(&mut self, participant: ParticipantId) -> Result<(), RoomError> {
        // Once the draft runs, the seat is kept; leaving only freezes it.
        self.handle_disconnect(participant)
    }

    fn handle_disconnect(&mut self, participant: ParticipantId) -> Result<(), RoomError> {
        if !self.sequencer.phase().is_started() {
            let removed = self.sessions.remove(participant)?;
            info!(room_id = %self.room_id, %participant, "participant left before start");
            self.emit(DraftEvent::ParticipantLeft {
                participant,
                key: removed.key,
            });
            return Ok(());
        }

        let key = self.sessions.disconnect(participant)?.key.clone();
        let holding_turn = self.sequencer.current_participant() == Some(participant);
        let grace_ms = match (holding_turn, self.sequencer.current_turn()) {
            (true, Some(turn)) => {
                let grace = self.clock.arm(participant, turn, DeadlineKind::Grace);
                Some(grace.as_millis() as u64)
            }
            _ => None,
        };
        info!(
            room_id = %self.room_id,
            %participant,
            holding_turn,
            "participant disconnected"
        );
        self.emit(DraftEvent::ParticipantDisconnected {
            participant,
            key,
            holding_turn,
            grace_ms,
        });
        Ok(())
    }

    async fn handle_reconnect(
        &mut self,
        key: ParticipantKey,
        participant: ParticipantId,
    ) -> Result<ParticipantId, RoomError> {
        let previous = self.sessions.reconnect(&key, participant)?.previous;
        self.sequencer.replace_participant(previous, participant);
        self.emit(DraftEvent::ParticipantReconnected {
            previous,
            participant,
            key,
        });

        if self.sequencer.current_participant() == Some(participant) {
            // The grace deadline for `previous` is replaced here.
            self.open_turn();
        }
        self.publish_pool().await;
        Ok(previous)
    }

    fn handle_set_preferences(
        &mut self,
        participant: ParticipantId,
        preferences: Vec<EntityId>,
    ) -> Result<Vec<EntityId>, RoomError> {
        let known: Vec<EntityId> = preferences
            .into_iter()
            .filter(|id| self.catalog.contains(id))
            .collect();
        let stored = self.sessions.set_preferences(participant, known)?.to_vec();
        debug!(room_id = %self.room_id, %participant, count = stored.len(), "preferences updated");
        self.emit(DraftEvent::PreferencesUpdated {
            participant,
            preferences: stored.clone(),
        });
        Ok(stored)
    }

    // -- draft flow ---------------------------------------------------------

    async fn handle_start(&mut self) -> Result<Vec<ParticipantId>, RoomError> {
        if self.sequencer.phase().is_started() {
            return Err(RoomError::InvalidPhase(format!(
                "draft already started ({})",
                self.sequencer.phase()
            )));
        }
        let connected = self.sessions.connected_count();
        if connected < self.config.min_participants {
            return Err(RoomError::NotEnoughParticipants {
                have: connected,
                need: self.config.min_participants,
            });
        }
        let pool = self.ledger.available_entities(self.room_id, None).await?;

        let mut order = self.sessions.ordered_ids().to_vec();
        if self.config.randomize_order {
            order.shuffle(&mut rand::rng());
        }
        self.sequencer.start(order.clone())?;

        info!(
            room_id = %self.room_id,
            participants = order.len(),
            max_rounds = self.sequencer.max_rounds(),
            pool = pool.len(),
            "draft started"
        );
        self.emit(DraftEvent::DraftStarted {
            turn_order: order.clone(),
            max_rounds: self.sequencer.max_rounds(),
        });
        self.broadcast_pool(&pool);
        self.last_pool = Some(pool);
        self.open_turn();
        Ok(order)
    }

    /// The turn `participant` may act on, or why it may not. Only a
    /// connected turn holder may act; expiry bypasses this check.
    fn check_turn(&self, participant: ParticipantId) -> Result<TurnKey, RoomError> {
        match self.sequencer.phase() {
            DraftPhase::NotStarted => Err(RoomError::InvalidPhase("draft has not started".into())),
            DraftPhase::DraftComplete => Err(RoomError::InvalidPhase("draft is complete".into())),
            DraftPhase::RoundComplete { round } => {
                Err(RoomError::InvalidPhase(format!("round {round} is closing")))
            }
            DraftPhase::AwaitingPick { round, turn_index } => {
                let current = self.sequencer.current_participant();
                if current != Some(participant) {
                    return Err(RoomError::NotYourTurn { participant, current });
                }
                if !self.sessions.is_connected(participant) {
                    return Err(RoomError::Disconnected(participant));
                }
                Ok(TurnKey::new(round, turn_index))
            }
        }
    }

    async fn handle_pick(&mut self, participant: ParticipantId, entity_id: EntityId) -> Result<PickRecord, RoomError> {
        let turn = self.check_turn(participant)?;
        let entity = self
            .catalog
            .get(&entity_id)
            .cloned()
            .ok_or(RoomError::EntityUnknown(entity_id))?;
        let owner = self
            .sessions
            .get(participant)
            .ok_or(SessionError::NotFound(participant))?;
        let slot = match place(&owner.picks, &entity, &self.lineup) {
            Placement::Accepted(slot) => slot,
            Placement::Rejected { reason } => {
                return Err(RoomError::NoLegalSlot {
                    entity: entity_id,
                    reason,
                });
            }
        };

        let request = PickRequest {
            room_id: self.room_id,
            entity_id,
            category: entity.category,
            participant_id: participant,
            participant_key: owner.key.clone(),
            round: turn.round,
            slot,
            automatic: false,
        };
        // The clock keeps running if the ledger refuses.
        let record = self.ledger.pick(request).await.map_err(|e| {
            match &e {
                PickError::StoreUnavailable(cause) => {
                    warn!(room_id = %self.room_id, %participant, error = %cause, "pick failed closed")
                }
                _ => debug!(room_id = %self.room_id, %participant, error = %e, "pick rejected by ledger"),
            }
            RoomError::from(e)
        })?;

        self.clock.cancel();
        self.commit(record.clone(), PickSource::Manual);
        self.advance().await;
        Ok(record)
    }

    /// Picks for `owner` on `turn` without asking it.
    ///
    /// Races are retried with a fresh view of the pool, up to
    /// `auto_pick_attempts` candidates. A store outage is returned
    /// without touching the turn.
    async fn run_auto_pick(&mut self, owner: ParticipantId, turn: TurnKey) -> Result<AutoPickOutcome, RoomError> {
        let mut rejected: BTreeSet<EntityId> = BTreeSet::new();

        for attempt in 1..=self.config.auto_pick_attempts {
            let mut available = self.ledger.available_entities(self.room_id, None).await?;
            self.last_pool = Some(available.clone());
            available.retain(|id| !rejected.contains(id));

            let participant = self.sessions.get(owner).ok_or(SessionError::NotFound(owner))?;
            let key = participant.key.clone();
            let choice = select_fallback(
                &participant.preferences,
                &available,
                &self.catalog,
                &participant.picks,
                &self.lineup,
            );

            let (entity, slot, source) = match choice {
                Fallback::Pick { entity, slot, source } => (entity, slot, source),
                Fallback::NoPick { reason } => return Ok(self.skip_turn(owner, turn, reason).await),
            };
            let request = PickRequest {
                room_id: self.room_id,
                entity_id: entity.id,
                category: entity.category,
                participant_id: owner,
                participant_key: key,
                round: turn.round,
                slot,
                automatic: true,
            };

            match self.ledger.pick(request).await {
                Ok(record) => {
                    self.clock.cancel();
                    info!(
                        room_id = %self.room_id,
                        participant = %owner,
                        entity = %record.entity_id,
                        ?source,
                        "auto-pick committed"
                    );
                    self.commit(record.clone(), source);
                    self.advance().await;
                    return Ok(AutoPickOutcome::Picked { record, source });
                }
                Err(PickError::AlreadyPicked(id) | PickError::EntityUnknown(id)) => {
                    debug!(
                        room_id = %self.room_id,
                        participant = %owner,
                        entity = %id,
                        attempt,
                        "auto-pick candidate refused, choosing again"
                    );
                    rejected.insert(id);
                }
                Err(PickError::StoreUnavailable(e)) => {
                    warn!(room_id = %self.room_id, participant = %owner, error = %e, "auto-pick failed closed");
                    return Err(RoomError::StoreUnavailable(e));
                }
            }
        }

        let reason = format!("auto-pick gave up after {} attempts", self.config.auto_pick_attempts);
        Ok(self.skip_turn(owner, turn, reason).await)
    }

    /// Records a no-pick for the turn and moves on.
    async fn skip_turn(&mut self, owner: ParticipantId, turn: TurnKey, reason: String) -> AutoPickOutcome {
        self.clock.cancel();
        info!(
            room_id = %self.room_id,
            participant = %owner,
            round = turn.round,
            turn_index = turn.turn_index,
            %reason,
            "turn skipped"
        );
        self.emit(DraftEvent::NoPick {
            participant: owner,
            round: turn.round,
            turn_index: turn.turn_index,
            reason: reason.clone(),
        });
        self.advance().await;
        AutoPickOutcome::NoPick { reason }
    }

    async fn on_expiry(&mut self, expiry: Expiry) {
        let live = self.sequencer.current_turn() == Some(expiry.turn)
            && self.sequencer.current_participant() == Some(expiry.owner);
        if !live {
            debug!(
                room_id = %self.room_id,
                owner = %expiry.owner,
                generation = expiry.generation,
                "stale expiry ignored"
            );
            return;
        }

        info!(
            room_id = %self.room_id,
            participant = %expiry.owner,
            round = expiry.turn.round,
            turn_index = expiry.turn.turn_index,
            kind = ?expiry.kind,
            "turn expired, auto-picking"
        );
        match self.run_auto_pick(expiry.owner, expiry.turn).await {
            Ok(_) => {}
            Err(RoomError::StoreUnavailable(e)) => {
                warn!(
                    room_id = %self.room_id,
                    participant = %expiry.owner,
                    error = %e,
                    "store unavailable on expiry, retrying after another turn timeout"
                );
                self.clock.arm(expiry.owner, expiry.turn, DeadlineKind::Turn);
            }
            Err(e) => {
                warn!(room_id = %self.room_id, participant = %expiry.owner, error = %e, "auto-pick failed");
                self.skip_turn(expiry.owner, expiry.turn, e.to_string()).await;
            }
        }
    }

    /// Applies a committed pick to the roster and announces it.
    fn commit(&mut self, record: PickRecord, source: PickSource) {
        if let Err(e) = self.sessions.record_pick(record.participant_id, record.clone()) {
            warn!(room_id = %self.room_id, error = %e, "committed pick has no roster to land on");
        }
        self.emit(DraftEvent::PickMade { record, source });
    }

    /// Closes the current turn and opens whatever comes next.
    async fn advance(&mut self) {
        match self.sequencer.advance() {
            Ok(Advance::NextTurn(_)) => self.open_turn(),
            Ok(Advance::RoundComplete { round }) => {
                info!(room_id = %self.room_id, round, "round complete");
                self.emit(DraftEvent::RoundComplete { round });
                match self.sequencer.open_next_round() {
                    Ok(_) => self.open_turn(),
                    Err(e) => warn!(room_id = %self.room_id, error = %e, "could not open next round"),
                }
            }
            Ok(Advance::DraftComplete) => self.complete().await,
            Err(e) => warn!(room_id = %self.room_id, error = %e, "advance without an open turn"),
        }
    }

    /// Arms the clock for the current turn and announces it.
    fn open_turn(&mut self) {
        let (Some(turn), Some(owner)) = (self.sequencer.current_turn(), self.sequencer.current_participant()) else {
            return;
        };
        let kind = if self.sessions.is_connected(owner) {
            DeadlineKind::Turn
        } else {
            DeadlineKind::Grace
        };
        let timeout = self.clock.arm(owner, turn, kind);
        self.emit(DraftEvent::TurnStarted {
            participant: owner,
            round: turn.round,
            turn_index: turn.turn_index,
            kind,
            time_left_ms: timeout.as_millis() as u64,
        });
    }

    async fn complete(&mut self) {
        self.clock.cancel();
        let total_picks = match self.ledger.room_stats(self.room_id).await {
            Ok(stats) => stats.total_picks,
            Err(e) => {
                warn!(room_id = %self.room_id, error = %e, "stats unavailable, counting rosters");
                self.sessions.participants().map(|p| p.picks.len() as u64).sum()
            }
        };
        info!(room_id = %self.room_id, total_picks, "draft complete");
        self.emit(DraftEvent::DraftComplete { total_picks });
    }

    // -- observation --------------------------------------------------------

    fn emit(&self, event: DraftEvent) {
        if let Err(e) = self.broadcaster.publish_event(&self.channel, &event) {
            warn!(room_id = %self.room_id, event = event.name(), error = %e, "event not encodable, dropped");
        }
    }

    fn broadcast_pool(&self, pool: &BTreeSet<EntityId>) {
        let entities: Vec<Entity> = pool.iter().filter_map(|id| self.catalog.get(id).cloned()).collect();
        let meta = PoolMeta {
            room_id: self.room_id,
            round: self.sequencer.current_turn().map_or(0, |t| t.round),
            available: entities.len(),
        };
        if let Err(e) = self
            .broadcaster
            .publish_chunked(&self.channel, POOL_EVENT, &entities, meta)
        {
            warn!(room_id = %self.room_id, error = %e, "pool not encodable, not published");
        }
    }

    async fn publish_pool(&mut self) {
        match self.ledger.available_entities(self.room_id, None).await {
            Ok(pool) => {
                self.broadcast_pool(&pool);
                self.last_pool = Some(pool);
            }
            Err(e) => warn!(room_id = %self.room_id, error = %e, "pool unavailable, not published"),
        }
    }

    /// Best local guess at the pool: the last store answer (or the whole
    /// catalog) minus every pick this room has seen since.
    fn last_known_pool(&self) -> BTreeSet<EntityId> {
        let picked: HashSet<EntityId> = self
            .sessions
            .participants()
            .flat_map(|p| p.picks.iter().map(|r| r.entity_id))
            .collect();
        let base = match &self.last_pool {
            Some(pool) => pool.clone(),
            None => self.catalog.iter().map(|e| e.id).collect(),
        };
        base.into_iter().filter(|id| !picked.contains(id)).collect()
    }

    async fn snapshot(&mut self) -> RoomSnapshot {
        let (available, stale) = match self.ledger.available_entities(self.room_id, None).await {
            Ok(pool) => {
                self.last_pool = Some(pool.clone());
                (pool, false)
            }
            Err(e) => {
                warn!(room_id = %self.room_id, error = %e, "store unavailable, serving last-known pool");
                (self.last_known_pool(), true)
            }
        };
        let stats = if stale {
            None
        } else {
            self.ledger.room_stats(self.room_id).await.ok()
        };

        let participants = self
            .sessions
            .participants()
            .map(|p| ParticipantView {
                id: p.id,
                key: p.key.clone(),
                display_name: p.display_name.clone(),
                connected: p.is_connected(),
                picks: p.picks.clone(),
                preferences: p.preferences.clone(),
                open_slots: open_slots(&p.picks, &self.lineup),
            })
            .collect();
        let turn_order = if self.sequencer.phase().is_started() {
            self.sequencer.base_order().to_vec()
        } else {
            self.sessions.ordered_ids().to_vec()
        };

        RoomSnapshot {
            room_id: self.room_id,
            phase: self.sequencer.phase(),
            current_turn: self.sequencer.current_turn(),
            current_participant: self.sequencer.current_participant(),
            next_participant: self.sequencer.next_turn().map(|(_, p)| p),
            turn_order,
            max_rounds: self.sequencer.max_rounds(),
            participants,
            available: available.into_iter().collect(),
            stats,
            time_left_ms: self.clock.remaining().map(|d| d.as_millis() as u64),
            deadline_kind: self.clock.kind(),
            stale,
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `config.channel_size` controls backpressure: if the channel fills
/// up, senders wait.
pub(crate) fn spawn_room<S: AtomicStore>(setup: RoomSetup<S>) -> RoomHandle {
    let RoomSetup {
        provision,
        config,
        ledger,
        catalog,
        broadcaster,
    } = setup;
    let (tx, rx) = mpsc::channel(config.channel_size);
    let room_id = provision.room_id;

    let invited = provision
        .participants
        .into_iter()
        .map(|seed| (seed.key, seed.display_name))
        .collect();

    let actor = RoomActor {
        room_id,
        channel: room_channel(room_id),
        clock: TurnClock::new(config.clock.clone()),
        config,
        lineup: provision.lineup,
        invited,
        sessions: SessionManager::new(),
        sequencer: TurnSequencer::new(provision.max_rounds),
        ledger,
        catalog,
        broadcaster,
        last_pool: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { room_id, sender: tx }
}
