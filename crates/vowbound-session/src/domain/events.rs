//! Domain events for the Game Sessions context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::event::{DomainEvent, EventMetadata};
use vowbound_core::repository::StoredEvent;
use vowbound_rules::domain::resolution::DiceRoll;

use super::combat::CombatParticipant;

pub const SESSION_CREATED: &str = "session.created";
pub const CHARACTER_ENROLLED: &str = "session.character_enrolled";
pub const COMBAT_STARTED: &str = "session.combat_started";
pub const TURN_ADVANCED: &str = "session.turn_advanced";
pub const COMBAT_ENDED: &str = "session.combat_ended";
pub const DICE_ROLLED: &str = "session.dice_rolled";

/// Emitted when a game session is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    /// The session identifier.
    pub session_id: Uuid,
    pub name: String,
    /// The game master running the session.
    pub master_id: Uuid,
}

/// Emitted when a character joins the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEnrolled {
    /// The session identifier.
    pub session_id: Uuid,
    pub character_id: Uuid,
}

/// Emitted when combat begins; carries the rolled, sorted turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStarted {
    /// The session identifier.
    pub session_id: Uuid,
    pub participants: Vec<CombatParticipant>,
}

/// Emitted when the turn passes to the next participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAdvanced {
    /// The session identifier.
    pub session_id: Uuid,
    pub current_turn_index: usize,
    pub round: u32,
}

/// Emitted when combat ends. The turn order is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEnded {
    /// The session identifier.
    pub session_id: Uuid,
    /// Round reached before the reset.
    pub final_round: u32,
    /// Who fought, kept for audit.
    pub participant_ids: Vec<Uuid>,
}

/// Emitted for every roll made in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRolled {
    /// The session identifier.
    pub session_id: Uuid,
    pub roll: DiceRoll,
}

/// Event payload variants for the Game Sessions context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// A session has been created.
    SessionCreated(SessionCreated),
    /// A character joined.
    CharacterEnrolled(CharacterEnrolled),
    /// Combat started.
    CombatStarted(CombatStarted),
    /// The turn advanced.
    TurnAdvanced(TurnAdvanced),
    /// Combat ended.
    CombatEnded(CombatEnded),
    /// A die was rolled.
    DiceRolled(DiceRolled),
}

/// Domain event envelope for the Game Sessions context.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            SessionEventKind::SessionCreated(_) => SESSION_CREATED,
            SessionEventKind::CharacterEnrolled(_) => CHARACTER_ENROLLED,
            SessionEventKind::CombatStarted(_) => COMBAT_STARTED,
            SessionEventKind::TurnAdvanced(_) => TURN_ADVANCED,
            SessionEventKind::CombatEnded(_) => COMBAT_ENDED,
            SessionEventKind::DiceRolled(_) => DICE_ROLLED,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("SessionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

impl TryFrom<&StoredEvent> for SessionEvent {
    type Error = DomainError;

    fn try_from(stored: &StoredEvent) -> Result<Self, Self::Error> {
        let kind: SessionEventKind = serde_json::from_value(stored.payload.clone())
            .map_err(|e| {
                DomainError::Collaborator(format!("event deserialization failed: {e}"))
            })?;
        Ok(Self {
            metadata: EventMetadata::from(stored),
            kind,
        })
    }
}
