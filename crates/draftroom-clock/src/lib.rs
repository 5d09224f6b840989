//! Per-room turn clock for Draftroom.
//!
//! A room has at most one open deadline at a time: the clock of the
//! participant whose turn it is. A connected owner gets the normal turn
//! timeout; a disconnected owner gets the longer grace period before
//! the room forces a pick.
//!
//! # Integration
//!
//! The clock is a plain value stored in room state and driven from the
//! room actor's `tokio::select!` loop. Arming and cancelling happen in
//! command handlers, firing happens in the select branch, so the two can
//! never interleave:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may arm or cancel */ }
//!         expiry = clock.wait_for_expiry() => {
//!             /* force a pick for expiry.owner */
//!         }
//!     }
//! }
//! ```
//!
//! When nothing is armed, [`TurnClock::wait_for_expiry`] pends forever,
//! which leaves `select!` free to serve the other branches.

use std::time::Duration;

use draftroom_protocol::{DeadlineKind, ParticipantId};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timer lengths for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// How long a connected participant has to pick.
    pub turn_timeout: Duration,
    /// How long a disconnected turn owner is waited for before auto-pick.
    pub disconnect_grace: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(15),
            disconnect_grace: Duration::from_secs(30),
        }
    }
}

impl ClockConfig {
    /// Shortest timeout accepted for either kind.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TurnClock::new`]. Rules:
    /// - both timeouts are raised to at least [`Self::MIN_TIMEOUT`];
    /// - `disconnect_grace` must be strictly longer than `turn_timeout`,
    ///   otherwise it becomes twice the turn timeout.
    pub fn validated(mut self) -> Self {
        if self.turn_timeout < Self::MIN_TIMEOUT {
            warn!(
                turn_timeout_ms = self.turn_timeout.as_millis() as u64,
                "turn_timeout below minimum, clamping"
            );
            self.turn_timeout = Self::MIN_TIMEOUT;
        }
        if self.disconnect_grace <= self.turn_timeout {
            let raised = self.turn_timeout * 2;
            warn!(
                grace_ms = self.disconnect_grace.as_millis() as u64,
                raised_ms = raised.as_millis() as u64,
                "disconnect_grace must exceed turn_timeout, raising"
            );
            self.disconnect_grace = raised;
        }
        self
    }

    /// The timeout used for a deadline of `kind`.
    pub fn duration_for(&self, kind: DeadlineKind) -> Duration {
        match kind {
            DeadlineKind::Turn => self.turn_timeout,
            DeadlineKind::Grace => self.disconnect_grace,
        }
    }
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// Identifies one turn of a draft: the round and the position inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnKey {
    pub round: u32,
    pub turn_index: usize,
}

impl TurnKey {
    pub fn new(round: u32, turn_index: usize) -> Self {
        Self { round, turn_index }
    }
}

#[derive(Debug, Clone)]
struct Armed {
    owner: ParticipantId,
    turn: TurnKey,
    kind: DeadlineKind,
    deadline: Instant,
    generation: u64,
}

/// A deadline that ran out, returned by [`TurnClock::wait_for_expiry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub owner: ParticipantId,
    pub turn: TurnKey,
    pub kind: DeadlineKind,
    /// Bumped on every arm. Lets the caller tell this expiry apart from
    /// any later deadline for the same turn.
    pub generation: u64,
    /// How far past the deadline the expiry was observed.
    pub late_by: Duration,
}

/// Counters for one clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockMetrics {
    pub armed: u64,
    pub cancelled: u64,
    pub expired: u64,
    pub grace_expired: u64,
    /// Largest lateness observed on an expiry.
    pub max_late_by: Duration,
}

// ---------------------------------------------------------------------------
// TurnClock
// ---------------------------------------------------------------------------

/// The single deadline of one room.
///
/// Arming replaces whatever was armed before; the old deadline can
/// never fire afterwards.
pub struct TurnClock {
    config: ClockConfig,
    armed: Option<Armed>,
    generation: u64,
    metrics: ClockMetrics,
}

impl TurnClock {
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        debug!(
            turn_ms = config.turn_timeout.as_millis() as u64,
            grace_ms = config.disconnect_grace.as_millis() as u64,
            "turn clock created"
        );
        Self {
            config,
            armed: None,
            generation: 0,
            metrics: ClockMetrics::default(),
        }
    }

    /// Opens a deadline of `kind` for `owner`, replacing any open one.
    /// Returns the time the owner has.
    pub fn arm(&mut self, owner: ParticipantId, turn: TurnKey, kind: DeadlineKind) -> Duration {
        let timeout = self.config.duration_for(kind);
        self.generation += 1;
        if let Some(previous) = self.armed.replace(Armed {
            owner,
            turn,
            kind,
            deadline: Instant::now() + timeout,
            generation: self.generation,
        }) {
            trace!(previous = %previous.owner, generation = previous.generation, "deadline replaced");
        }
        self.metrics.armed += 1;
        debug!(
            %owner,
            round = turn.round,
            turn_index = turn.turn_index,
            ?kind,
            timeout_ms = timeout.as_millis() as u64,
            "deadline armed"
        );
        timeout
    }

    /// Closes the open deadline, if any. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                self.metrics.cancelled += 1;
                trace!(owner = %armed.owner, generation = armed.generation, "deadline cancelled");
                true
            }
            None => false,
        }
    }

    /// Closes the open deadline only if it belongs to `owner`.
    pub fn cancel_for(&mut self, owner: ParticipantId) -> bool {
        if self.owner() == Some(owner) {
            self.cancel()
        } else {
            false
        }
    }

    /// Waits for the open deadline and disarms the clock when it fires.
    ///
    /// Pends forever while nothing is armed. Cancel-safe: dropping the
    /// future before it resolves leaves the deadline armed.
    pub async fn wait_for_expiry(&mut self) -> Expiry {
        let Some(deadline) = self.armed.as_ref().map(|a| a.deadline) else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        let Some(armed) = self.armed.take() else {
            return std::future::pending().await;
        };
        let late_by = Instant::now().saturating_duration_since(armed.deadline);
        self.metrics.expired += 1;
        if armed.kind == DeadlineKind::Grace {
            self.metrics.grace_expired += 1;
        }
        if late_by > self.metrics.max_late_by {
            self.metrics.max_late_by = late_by;
        }
        debug!(
            owner = %armed.owner,
            round = armed.turn.round,
            turn_index = armed.turn.turn_index,
            kind = ?armed.kind,
            late_ms = late_by.as_millis() as u64,
            "deadline expired"
        );

        Expiry {
            owner: armed.owner,
            turn: armed.turn,
            kind: armed.kind,
            generation: armed.generation,
            late_by,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn owner(&self) -> Option<ParticipantId> {
        self.armed.as_ref().map(|a| a.owner)
    }

    pub fn turn(&self) -> Option<TurnKey> {
        self.armed.as_ref().map(|a| a.turn)
    }

    pub fn kind(&self) -> Option<DeadlineKind> {
        self.armed.as_ref().map(|a| a.kind)
    }

    /// Time left on the open deadline. `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.armed
            .as_ref()
            .map(|a| a.deadline.saturating_duration_since(Instant::now()))
    }

    /// Generation of the most recent arm.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ClockMetrics {
        &self.metrics
    }
}
