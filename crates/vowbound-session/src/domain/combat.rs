//! Combat initiative state machine.
//!
//! Two states: idle (no participants, round 1) and active (at least one
//! participant, exactly one of whom holds the current turn). Transitions are
//! pure functions returning the next state; the aggregate records their
//! results as events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::rng::DeterministicRng;
use vowbound_rules::domain::dice::DieType;

/// Someone entering combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub id: Uuid,
    pub name: String,
    pub dexterity: i32,
    pub is_player: bool,
    pub character_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatParticipant {
    pub id: Uuid,
    pub name: String,
    pub initiative: i32,
    pub is_player: bool,
    pub character_id: Option<Uuid>,
    pub is_current_turn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub active: bool,
    /// Turn order, highest initiative first.
    pub participants: Vec<CombatParticipant>,
    pub current_turn_index: usize,
    pub round: u32,
}

impl Default for CombatState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Rolls `d20 + dexterity` for each combatant, in roster order, and sorts
/// the result by initiative, highest first. Ties keep roster order. The
/// first participant holds the turn.
///
/// # Errors
///
/// Returns `DomainError::EmptyRoster` if `roster` is empty.
#[allow(clippy::cast_possible_wrap)]
pub fn roll_initiative(
    roster: &[Combatant],
    rng: &mut dyn DeterministicRng,
) -> Result<Vec<CombatParticipant>, DomainError> {
    if roster.is_empty() {
        return Err(DomainError::EmptyRoster);
    }

    let mut participants: Vec<CombatParticipant> = roster
        .iter()
        .map(|combatant| CombatParticipant {
            id: combatant.id,
            name: combatant.name.clone(),
            initiative: (DieType::D20.roll(rng) as i32).saturating_add(combatant.dexterity),
            is_player: combatant.is_player,
            character_id: combatant.character_id,
            is_current_turn: false,
        })
        .collect();
    // `sort_by` is stable.
    participants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    participants[0].is_current_turn = true;
    Ok(participants)
}

impl CombatState {
    /// No combat running.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            active: false,
            participants: Vec::new(),
            current_turn_index: 0,
            round: 1,
        }
    }

    /// Combat in round 1 with the first participant holding the turn. An
    /// empty list yields the idle state.
    #[must_use]
    pub fn started(participants: Vec<CombatParticipant>) -> Self {
        if participants.is_empty() {
            return Self::idle();
        }
        Self {
            active: true,
            participants,
            current_turn_index: 0,
            round: 1,
        }
        .with_turn(0, 1)
    }

    /// The state after the current participant's turn ends. Wrapping back
    /// to the first participant starts a new round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CombatNotActive` when idle.
    pub fn advanced(&self) -> Result<Self, DomainError> {
        if !self.active || self.participants.is_empty() {
            return Err(DomainError::CombatNotActive);
        }
        let next = (self.current_turn_index + 1) % self.participants.len();
        let round = if next == 0 {
            self.round.saturating_add(1)
        } else {
            self.round
        };
        Ok(self.clone().with_turn(next, round))
    }

    /// Moves the turn marker to `index`. Out-of-range indices leave the
    /// state unchanged.
    #[must_use]
    pub fn with_turn(mut self, index: usize, round: u32) -> Self {
        if !self.active || index >= self.participants.len() {
            return self;
        }
        for (i, participant) in self.participants.iter_mut().enumerate() {
            participant.is_current_turn = i == index;
        }
        self.current_turn_index = index;
        self.round = round.max(1);
        self
    }

    /// Whoever holds the turn, if combat is active.
    #[must_use]
    pub fn current(&self) -> Option<&CombatParticipant> {
        if self.active {
            self.participants.get(self.current_turn_index)
        } else {
            None
        }
    }
}
