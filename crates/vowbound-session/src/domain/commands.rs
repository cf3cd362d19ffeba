//! Commands for the Game Sessions context.

use uuid::Uuid;
use vowbound_core::command::Command;
use vowbound_rules::domain::resolution::{RollActor, RollRequest};

use super::combat::Combatant;

/// Command to open a new game session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier the new session will have.
    pub session_id: Uuid,
    pub name: String,
    pub master_id: Uuid,
}

impl Command for CreateSession {
    fn command_type(&self) -> &'static str {
        "session.create_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}

/// Command to add a character to the session. Enrolling twice is a no-op.
#[derive(Debug, Clone)]
pub struct EnrollCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
    pub character_id: Uuid,
}

impl Command for EnrollCharacter {
    fn command_type(&self) -> &'static str {
        "session.enroll_character"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}

/// Command to start combat with the given roster.
#[derive(Debug, Clone)]
pub struct StartCombat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
    pub roster: Vec<Combatant>,
}

impl Command for StartCombat {
    fn command_type(&self) -> &'static str {
        "session.start_combat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}

/// Command to pass the turn to the next participant.
#[derive(Debug, Clone)]
pub struct AdvanceTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
}

impl Command for AdvanceTurn {
    fn command_type(&self) -> &'static str {
        "session.advance_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}

/// Command to end combat.
#[derive(Debug, Clone)]
pub struct EndCombat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
}

impl Command for EndCombat {
    fn command_type(&self) -> &'static str {
        "session.end_combat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}

/// Command to roll a die in the session.
#[derive(Debug, Clone)]
pub struct RollDice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
    pub actor: RollActor,
    pub request: RollRequest,
}

impl Command for RollDice {
    fn command_type(&self) -> &'static str {
        "session.roll_dice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }
}
