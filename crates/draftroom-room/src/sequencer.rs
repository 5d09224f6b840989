//! Snake-order turn sequencing.
//!
//! The base order is fixed at start and never mutated between rounds.
//! Whose turn it is follows from `(round, turn_index)` alone:
//!
//! ```text
//! round 1 (odd):  base[0], base[1], ..., base[n-1]
//! round 2 (even): base[n-1], ..., base[1], base[0]
//! ```
//!
//! Phases:
//!
//! ```text
//! NotStarted → AwaitingPick(1, 0) → ... → AwaitingPick(r, n-1)
//!                                             │
//!                        r < max_rounds ──────┤────── r == max_rounds
//!                               ↓                          ↓
//!                       RoundComplete(r)             DraftComplete
//!                               ↓
//!                      AwaitingPick(r+1, 0)
//! ```

use std::fmt;

use draftroom_clock::TurnKey;
use draftroom_protocol::ParticipantId;
use serde::Serialize;

use crate::RoomError;

/// Where a draft is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase")]
pub enum DraftPhase {
    NotStarted,
    AwaitingPick { round: u32, turn_index: usize },
    /// Between the last pick of a round and the first of the next.
    RoundComplete { round: u32 },
    /// Terminal. No further picks are accepted.
    DraftComplete,
}

impl DraftPhase {
    pub fn is_started(&self) -> bool {
        !matches!(self, Self::NotStarted)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::DraftComplete)
    }
}

impl fmt::Display for DraftPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::AwaitingPick { round, turn_index } => write!(f, "AwaitingPick({round}, {turn_index})"),
            Self::RoundComplete { round } => write!(f, "RoundComplete({round})"),
            Self::DraftComplete => write!(f, "DraftComplete"),
        }
    }
}

/// What [`TurnSequencer::advance`] moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextTurn(TurnKey),
    /// The round is over; call [`TurnSequencer::open_next_round`].
    RoundComplete { round: u32 },
    DraftComplete,
}

/// Snake-order state for one room.
#[derive(Debug, Clone)]
pub struct TurnSequencer {
    base_order: Vec<ParticipantId>,
    max_rounds: u32,
    phase: DraftPhase,
}

impl TurnSequencer {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            base_order: Vec::new(),
            max_rounds,
            phase: DraftPhase::NotStarted,
        }
    }

    /// Fixes the base order and opens the first turn.
    ///
    /// # Errors
    /// - [`RoomError::InvalidPhase`] if already started.
    /// - [`RoomError::NotEnoughParticipants`] for fewer than two.
    pub fn start(&mut self, base_order: Vec<ParticipantId>) -> Result<TurnKey, RoomError> {
        if self.phase.is_started() {
            return Err(RoomError::InvalidPhase(format!("draft already started ({})", self.phase)));
        }
        if base_order.len() < 2 {
            return Err(RoomError::NotEnoughParticipants {
                have: base_order.len(),
                need: 2,
            });
        }
        self.base_order = base_order;
        self.phase = DraftPhase::AwaitingPick {
            round: 1,
            turn_index: 0,
        };
        Ok(TurnKey::new(1, 0))
    }

    /// Who picks at `turn_index` of `round`.
    pub fn participant_at(&self, round: u32, turn_index: usize) -> Option<ParticipantId> {
        let n = self.base_order.len();
        if round == 0 || turn_index >= n {
            return None;
        }
        let position = if round % 2 == 1 { turn_index } else { n - 1 - turn_index };
        self.base_order.get(position).copied()
    }

    pub fn current_turn(&self) -> Option<TurnKey> {
        match self.phase {
            DraftPhase::AwaitingPick { round, turn_index } => Some(TurnKey::new(round, turn_index)),
            _ => None,
        }
    }

    pub fn current_participant(&self) -> Option<ParticipantId> {
        self.current_turn()
            .and_then(|turn| self.participant_at(turn.round, turn.turn_index))
    }

    /// The turn after the current one, without moving.
    pub fn next_turn(&self) -> Option<(TurnKey, ParticipantId)> {
        let turn = self.current_turn()?;
        let next = if turn.turn_index + 1 < self.base_order.len() {
            TurnKey::new(turn.round, turn.turn_index + 1)
        } else if turn.round < self.max_rounds {
            TurnKey::new(turn.round + 1, 0)
        } else {
            return None;
        };
        self.participant_at(next.round, next.turn_index)
            .map(|participant| (next, participant))
    }

    /// Closes the current turn after a pick or a no-pick.
    ///
    /// # Errors
    /// [`RoomError::InvalidPhase`] unless a turn is open.
    pub fn advance(&mut self) -> Result<Advance, RoomError> {
        let DraftPhase::AwaitingPick { round, turn_index } = self.phase else {
            return Err(RoomError::InvalidPhase(format!("no open turn ({})", self.phase)));
        };

        if turn_index + 1 < self.base_order.len() {
            self.phase = DraftPhase::AwaitingPick {
                round,
                turn_index: turn_index + 1,
            };
            Ok(Advance::NextTurn(TurnKey::new(round, turn_index + 1)))
        } else if round < self.max_rounds {
            self.phase = DraftPhase::RoundComplete { round };
            Ok(Advance::RoundComplete { round })
        } else {
            self.phase = DraftPhase::DraftComplete;
            Ok(Advance::DraftComplete)
        }
    }

    /// Leaves `RoundComplete(r)` for `AwaitingPick(r+1, 0)`.
    pub fn open_next_round(&mut self) -> Result<TurnKey, RoomError> {
        let DraftPhase::RoundComplete { round } = self.phase else {
            return Err(RoomError::InvalidPhase(format!("round not complete ({})", self.phase)));
        };
        self.phase = DraftPhase::AwaitingPick {
            round: round + 1,
            turn_index: 0,
        };
        Ok(TurnKey::new(round + 1, 0))
    }

    /// Swaps an identity in the base order in place. Returns whether
    /// `old` was found.
    pub fn replace_participant(&mut self, old: ParticipantId, new: ParticipantId) -> bool {
        match self.base_order.iter_mut().find(|p| **p == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    pub fn phase(&self) -> DraftPhase {
        self.phase
    }

    pub fn base_order(&self) -> &[ParticipantId] {
        &self.base_order
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ParticipantId = ParticipantId(1);
    const B: ParticipantId = ParticipantId(2);
    const C: ParticipantId = ParticipantId(3);

    fn started(max_rounds: u32) -> TurnSequencer {
        let mut seq = TurnSequencer::new(max_rounds);
        seq.start(vec![A, B, C]).unwrap();
        seq
    }

    /// Drives the whole draft, collecting who picked each turn.
    fn run_to_completion(seq: &mut TurnSequencer) -> Vec<ParticipantId> {
        let mut order = Vec::new();
        loop {
            order.push(seq.current_participant().unwrap());
            match seq.advance().unwrap() {
                Advance::NextTurn(_) => {}
                Advance::RoundComplete { .. } => {
                    seq.open_next_round().unwrap();
                }
                Advance::DraftComplete => return order,
            }
        }
    }

    // =====================================================================
    // start()
    // =====================================================================

    #[test]
    fn test_start_opens_round_one_turn_zero() {
        let seq = started(2);
        assert_eq!(seq.phase(), DraftPhase::AwaitingPick { round: 1, turn_index: 0 });
        assert_eq!(seq.current_participant(), Some(A));
    }

    #[test]
    fn test_start_with_one_participant_is_rejected() {
        let mut seq = TurnSequencer::new(2);
        assert!(matches!(
            seq.start(vec![A]),
            Err(RoomError::NotEnoughParticipants { have: 1, need: 2 })
        ));
        assert_eq!(seq.phase(), DraftPhase::NotStarted);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut seq = started(2);
        assert!(matches!(seq.start(vec![A, B]), Err(RoomError::InvalidPhase(_))));
    }

    // =====================================================================
    // snake order
    // =====================================================================

    #[test]
    fn test_direction_alternates_by_round_parity() {
        let mut seq = started(3);
        assert_eq!(run_to_completion(&mut seq), vec![A, B, C, C, B, A, A, B, C]);
        assert!(seq.phase().is_complete());
    }

    #[test]
    fn test_participant_at_out_of_range_is_none() {
        let seq = started(2);
        assert_eq!(seq.participant_at(0, 0), None);
        assert_eq!(seq.participant_at(1, 3), None);
        assert_eq!(seq.participant_at(2, 0), Some(C));
    }

    #[test]
    fn test_advance_at_round_end_enters_round_complete() {
        let mut seq = started(2);
        seq.advance().unwrap();
        seq.advance().unwrap();
        assert_eq!(seq.advance().unwrap(), Advance::RoundComplete { round: 1 });
        assert_eq!(seq.current_participant(), None);
        assert_eq!(seq.open_next_round().unwrap(), TurnKey::new(2, 0));
        assert_eq!(seq.current_participant(), Some(C));
    }

    #[test]
    fn test_two_participants_one_round_completes_after_two_picks() {
        let mut seq = TurnSequencer::new(1);
        seq.start(vec![A, B]).unwrap();
        assert_eq!(seq.advance().unwrap(), Advance::NextTurn(TurnKey::new(1, 1)));
        assert_eq!(seq.advance().unwrap(), Advance::DraftComplete);
        assert!(matches!(seq.advance(), Err(RoomError::InvalidPhase(_))));
    }

    // =====================================================================
    // next_turn() / replace_participant()
    // =====================================================================

    #[test]
    fn test_next_turn_crosses_round_boundary() {
        let mut seq = started(2);
        assert_eq!(seq.next_turn(), Some((TurnKey::new(1, 1), B)));
        seq.advance().unwrap();
        seq.advance().unwrap();
        assert_eq!(seq.next_turn(), Some((TurnKey::new(2, 0), C)));
    }

    #[test]
    fn test_next_turn_on_final_turn_is_none() {
        let mut seq = TurnSequencer::new(1);
        seq.start(vec![A, B]).unwrap();
        seq.advance().unwrap();
        assert_eq!(seq.next_turn(), None);
    }

    #[test]
    fn test_replace_participant_keeps_position() {
        let mut seq = started(2);
        let d = ParticipantId(9);
        assert!(seq.replace_participant(B, d));
        assert_eq!(seq.base_order(), &[A, d, C]);
        assert_eq!(seq.participant_at(2, 1), Some(d));
        assert!(!seq.replace_participant(B, d));
    }
}
