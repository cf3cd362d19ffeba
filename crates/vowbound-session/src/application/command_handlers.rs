//! Command handlers for the Game Sessions context.
//!
//! Each handler loads the aggregate, executes the domain method, and
//! persists the resulting events with the pre-command version as the
//! expected stream head.

use tracing::{info, instrument};
use uuid::Uuid;
use vowbound_character::application::command_handlers::handle_restore_from_black_flash;
use vowbound_character::application::query_handlers::get_character_by_id;
use vowbound_character::domain::commands::RestoreFromBlackFlash;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};
use vowbound_core::rng::DeterministicRng;
use vowbound_rules::domain::resolution::{DiceResolver, DiceRoll};

use crate::domain::aggregates::GameSession;
use crate::domain::combat::Combatant;
use crate::domain::commands::{
    AdvanceTurn, CreateSession, EndCombat, EnrollCharacter, RollDice, StartCombat,
};
use crate::domain::events::SessionEvent;

/// Reconstitutes a `GameSession` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Collaborator` if event deserialization fails.
pub fn reconstitute(
    session_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<GameSession, DomainError> {
    let mut session = GameSession::new(session_id);
    for stored in existing_events {
        let event = SessionEvent::try_from(stored)?;
        session.apply(&event);
    }
    Ok(session)
}

async fn load(session_id: Uuid, repo: &dyn EventRepository) -> Result<GameSession, DomainError> {
    let existing_events = repo.load_events(session_id).await?;
    reconstitute(session_id, &existing_events)
}

async fn persist(
    session: &GameSession,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = session
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain_event)
        .collect();

    if stored_events.is_empty() {
        return Ok(stored_events);
    }
    repo.append_events(session.id, session.version(), &stored_events)
        .await?;

    Ok(stored_events)
}

/// Result of a roll: the roll itself plus every event it persisted.
#[derive(Debug, Clone)]
pub struct RollOutcome {
    pub roll: DiceRoll,
    /// The `session.dice_rolled` event.
    pub session_events: Vec<StoredEvent>,
    /// The character's restoration events, when the roll was a Black Flash
    /// made by a character.
    pub character_events: Vec<StoredEvent>,
}

/// Handles the `CreateSession` command.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` if the id is taken,
/// `DomainError::Validation` for a blank name, or the repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_create_session(
    command: &CreateSession,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    session.create(&command.name, command.master_id, command.correlation_id, clock)?;
    persist(&session, repo).await
}

/// Handles the `EnrollCharacter` command. Returns no events when the
/// character is already enrolled.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown session, or the
/// repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id, character_id = %command.character_id))]
pub async fn handle_enroll_character(
    command: &EnrollCharacter,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    session.enroll_character(command.character_id, command.correlation_id, clock)?;
    persist(&session, repo).await
}

/// Handles the `StartCombat` command.
///
/// # Errors
///
/// Returns `DomainError::EmptyRoster`, `DomainError::InvalidState` if combat
/// is already running, or the repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id, roster = command.roster.len()))]
pub async fn handle_start_combat(
    command: &StartCombat,
    clock: &dyn Clock,
    rng: &mut dyn DeterministicRng,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    session.start_combat(&command.roster, rng, command.correlation_id, clock)?;
    persist(&session, repo).await
}

/// Handles the `AdvanceTurn` command.
///
/// # Errors
///
/// Returns `DomainError::CombatNotActive` when no combat is running, or the
/// repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_advance_turn(
    command: &AdvanceTurn,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    session.advance_turn(command.correlation_id, clock)?;
    persist(&session, repo).await
}

/// Handles the `EndCombat` command.
///
/// # Errors
///
/// Returns `DomainError::CombatNotActive` when no combat is running, or the
/// repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_end_combat(
    command: &EndCombat,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    session.end_combat(command.correlation_id, clock)?;
    persist(&session, repo).await
}

/// Handles the `RollDice` command.
///
/// A Black Flash made by an actor bound to a character also restores that
/// character's pools. The two streams are written one after the other; a
/// failed restoration does not undo the recorded roll.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` when the session does not exist, or
/// the repository's error.
#[instrument(skip_all, fields(session_id = %command.session_id, die = %command.request.die))]
pub async fn handle_roll_dice(
    command: &RollDice,
    resolver: &DiceResolver,
    clock: &dyn Clock,
    rng: &mut dyn DeterministicRng,
    repo: &dyn EventRepository,
) -> Result<RollOutcome, DomainError> {
    let mut session = load(command.session_id, repo).await?;
    let roll = session.roll_dice(
        &command.request,
        &command.actor,
        resolver,
        rng,
        command.correlation_id,
        clock,
    )?;
    let session_events = persist(&session, repo).await?;

    let character_events = match (roll.black_flash, roll.character_id) {
        (true, Some(character_id)) => {
            info!(%character_id, roll_id = %roll.id, "restoring pools after black flash");
            handle_restore_from_black_flash(
                &RestoreFromBlackFlash {
                    correlation_id: command.correlation_id,
                    character_id,
                    roll_id: roll.id,
                },
                clock,
                repo,
            )
            .await?
        }
        _ => Vec::new(),
    };

    Ok(RollOutcome {
        roll,
        session_events,
        character_events,
    })
}

/// Builds a combat roster from every character enrolled in the session,
/// using each character's current dexterity.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown session or
/// enrolled character, or the repository's error.
pub async fn enrolled_roster(
    session_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Vec<Combatant>, DomainError> {
    let session = load(session_id, repo).await?;
    if !session.is_created() {
        return Err(DomainError::AggregateNotFound(session_id));
    }
    let mut roster = Vec::with_capacity(session.characters().len());
    for character_id in session.characters() {
        let view = get_character_by_id(*character_id, repo).await?;
        roster.push(Combatant {
            id: view.character_id,
            name: view.name,
            dexterity: view.attributes.dexterity,
            is_player: true,
            character_id: Some(view.character_id),
        });
    }
    Ok(roster)
}
