//! Aggregate roots for the Game Sessions context.

use tracing::info;
use uuid::Uuid;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::event::EventMetadata;
use vowbound_core::rng::DeterministicRng;
use vowbound_rules::domain::resolution::{DiceResolver, DiceRoll, RollActor, RollRequest};

use super::combat::{self, CombatState, Combatant};
use super::events::{
    CHARACTER_ENROLLED, COMBAT_ENDED, COMBAT_STARTED, CharacterEnrolled, CombatEnded,
    CombatStarted, DICE_ROLLED, DiceRolled, SESSION_CREATED, SessionCreated, SessionEvent,
    SessionEventKind, TURN_ADVANCED, TurnAdvanced,
};

/// The aggregate root for a game session.
#[derive(Debug)]
pub struct GameSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) created: bool,
    pub(crate) name: String,
    pub(crate) master_id: Uuid,
    /// Enrolled characters, in enrolment order.
    pub(crate) characters: Vec<Uuid>,
    pub(crate) combat: CombatState,
    /// Every roll, oldest first. Never truncated.
    pub(crate) rolls: Vec<DiceRoll>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<SessionEvent>,
}

impl GameSession {
    /// Creates an empty, not-yet-opened session.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            created: false,
            name: String::new(),
            master_id: Uuid::nil(),
            characters: Vec::new(),
            combat: CombatState::idle(),
            rolls: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn master_id(&self) -> Uuid {
        self.master_id
    }

    #[must_use]
    pub fn characters(&self) -> &[Uuid] {
        &self.characters
    }

    #[must_use]
    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    #[must_use]
    pub fn rolls(&self) -> &[DiceRoll] {
        &self.rolls
    }

    /// The last `limit` rolls, most recent first.
    #[must_use]
    pub fn recent_rolls(&self, limit: usize) -> Vec<DiceRoll> {
        self.rolls.iter().rev().take(limit).cloned().collect()
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(
        &mut self,
        event_type: &str,
        kind: SessionEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let metadata = EventMetadata::caused_by_command(
            event_type,
            self.id,
            self.next_sequence_number(),
            correlation_id,
            clock,
        );
        self.uncommitted_events.push(SessionEvent { metadata, kind });
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if self.created {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(self.id))
        }
    }

    /// Opens the session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the session already exists, or
    /// `DomainError::Validation` for a blank name.
    pub fn create(
        &mut self,
        name: &str,
        master_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.created {
            return Err(DomainError::InvalidState(format!(
                "session {} already exists",
                self.id
            )));
        }
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "session name must not be empty".into(),
            ));
        }
        self.record(
            SESSION_CREATED,
            SessionEventKind::SessionCreated(SessionCreated {
                session_id: self.id,
                name: name.trim().to_owned(),
                master_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Enrols a character. Already-enrolled characters produce no event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the session was never
    /// created.
    pub fn enroll_character(
        &mut self,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        if self.characters.contains(&character_id) {
            return Ok(());
        }
        self.record(
            CHARACTER_ENROLLED,
            SessionEventKind::CharacterEnrolled(CharacterEnrolled {
                session_id: self.id,
                character_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls initiative for `roster` and starts combat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the session was never
    /// created, `DomainError::InvalidState` if combat is already running, or
    /// `DomainError::EmptyRoster` for an empty roster.
    pub fn start_combat(
        &mut self,
        roster: &[Combatant],
        rng: &mut dyn DeterministicRng,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        if self.combat.active {
            return Err(DomainError::InvalidState(
                "combat is already active".into(),
            ));
        }
        let participants = combat::roll_initiative(roster, rng)?;
        info!(
            session_id = %self.id,
            participants = participants.len(),
            first = %participants[0].name,
            "combat started"
        );
        self.record(
            COMBAT_STARTED,
            SessionEventKind::CombatStarted(CombatStarted {
                session_id: self.id,
                participants,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Passes the turn to the next participant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the session was never
    /// created, or `DomainError::CombatNotActive` when no combat is running.
    pub fn advance_turn(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_created()?;
        let next = self.combat.advanced()?;
        self.record(
            TURN_ADVANCED,
            SessionEventKind::TurnAdvanced(TurnAdvanced {
                session_id: self.id,
                current_turn_index: next.current_turn_index,
                round: next.round,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Ends combat, discarding the turn order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the session was never
    /// created, or `DomainError::CombatNotActive` when no combat is running.
    pub fn end_combat(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_created()?;
        if !self.combat.active {
            return Err(DomainError::CombatNotActive);
        }
        info!(session_id = %self.id, round = self.combat.round, "combat ended");
        self.record(
            COMBAT_ENDED,
            SessionEventKind::CombatEnded(CombatEnded {
                session_id: self.id,
                final_round: self.combat.round,
                participant_ids: self.combat.participants.iter().map(|p| p.id).collect(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Resolves a roll and appends it to the history. Returns the roll so
    /// the caller can act on a Black Flash.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the session was never created.
    pub fn roll_dice(
        &mut self,
        request: &RollRequest,
        actor: &RollActor,
        resolver: &DiceResolver,
        rng: &mut dyn DeterministicRng,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<DiceRoll, DomainError> {
        if !self.created {
            return Err(DomainError::InvalidState(
                "no session is established".into(),
            ));
        }
        let roll = resolver.resolve(request, actor, rng, clock);
        if roll.black_flash {
            info!(
                session_id = %self.id,
                actor = %roll.actor_name,
                total = roll.total,
                "black flash"
            );
        }
        self.record(
            DICE_ROLLED,
            SessionEventKind::DiceRolled(DiceRolled {
                session_id: self.id,
                roll: roll.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(roll)
    }
}

impl AggregateRoot for GameSession {
    type Event = SessionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            SessionEventKind::SessionCreated(payload) => {
                self.created = true;
                self.name.clone_from(&payload.name);
                self.master_id = payload.master_id;
            }
            SessionEventKind::CharacterEnrolled(payload) => {
                if !self.characters.contains(&payload.character_id) {
                    self.characters.push(payload.character_id);
                }
            }
            SessionEventKind::CombatStarted(payload) => {
                self.combat = CombatState::started(payload.participants.clone());
            }
            SessionEventKind::TurnAdvanced(payload) => {
                self.combat = std::mem::take(&mut self.combat)
                    .with_turn(payload.current_turn_index, payload.round);
            }
            SessionEventKind::CombatEnded(_) => {
                self.combat = CombatState::idle();
            }
            SessionEventKind::DiceRolled(payload) => {
                self.rolls.push(payload.roll.clone());
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
