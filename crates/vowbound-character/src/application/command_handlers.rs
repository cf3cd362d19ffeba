//! Command handlers for the Characters context.
//!
//! Each handler loads the aggregate, executes the domain method, and
//! persists the resulting events with the pre-command version as the
//! expected stream head.

use tracing::instrument;
use uuid::Uuid;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::repository::{EventRepository, StoredEvent};

use crate::domain::aggregates::Character;
use crate::domain::commands::{
    ApplyState, BindVow, ClearState, CreateCharacter, ForgetSpell, LearnSpell,
    RestoreFromBlackFlash, SetPersonalityTrait, SetResource, ToggleVow,
};
use crate::domain::events::CharacterEvent;

/// Reconstitutes a `Character` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Collaborator` if event deserialization fails.
pub fn reconstitute(
    character_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Character, DomainError> {
    let mut character = Character::new(character_id);
    for stored in existing_events {
        let event = CharacterEvent::try_from(stored)?;
        character.apply(&event);
    }
    Ok(character)
}

async fn load(character_id: Uuid, repo: &dyn EventRepository) -> Result<Character, DomainError> {
    let existing_events = repo.load_events(character_id).await?;
    reconstitute(character_id, &existing_events)
}

async fn persist(
    character: &Character,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = character
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain_event)
        .collect();

    repo.append_events(character.id, character.version(), &stored_events)
        .await?;

    Ok(stored_events)
}

/// Handles the `CreateCharacter` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid creation input,
/// `DomainError::InvalidState` if the id is taken, or the repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id))]
pub async fn handle_create_character(
    command: &CreateCharacter,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.create(command, clock)?;
    persist(&character, repo).await
}

/// Handles the `SetResource` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown character, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, resource = %command.resource))]
pub async fn handle_set_resource(
    command: &SetResource,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.set_resource(command.resource, command.value, command.correlation_id, clock)?;
    persist(&character, repo).await
}

/// Handles the `RestoreFromBlackFlash` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` for an unknown character, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, roll_id = %command.roll_id))]
pub async fn handle_restore_from_black_flash(
    command: &RestoreFromBlackFlash,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.restore_from_black_flash(command.roll_id, command.correlation_id, clock)?;
    persist(&character, repo).await
}

/// Handles the `SetPersonalityTrait` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an intensity above 3, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id))]
pub async fn handle_set_personality_trait(
    command: &SetPersonalityTrait,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.set_personality_trait(
        command.category,
        command.intensity,
        command.correlation_id,
        clock,
    )?;
    persist(&character, repo).await
}

/// Handles the `BindVow` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the game master or
/// the owner, `DomainError::Validation` for an invalid vow, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, vow = %command.vow.name))]
pub async fn handle_bind_vow(
    command: &BindVow,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.bind_vow(
        command.vow.clone(),
        &command.actor,
        command.correlation_id,
        clock,
    )?;
    persist(&character, repo).await
}

/// Handles the `ToggleVow` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor owns the character,
/// `DomainError::Validation` for an unknown vow, or the repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, vow_id = %command.vow_id))]
pub async fn handle_toggle_vow(
    command: &ToggleVow,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.toggle_vow(command.vow_id, &command.actor, command.correlation_id, clock)?;
    persist(&character, repo).await
}

/// Handles the `LearnSpell` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the game master or
/// the owner, `DomainError::Validation` for an invalid or duplicate spell,
/// or the repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, spell = %command.spell.name))]
pub async fn handle_learn_spell(
    command: &LearnSpell,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.learn_spell(
        command.spell.clone(),
        &command.actor,
        command.correlation_id,
        clock,
    )?;
    persist(&character, repo).await
}

/// Handles the `ForgetSpell` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the game master or
/// the owner, `DomainError::Validation` for an unknown spell, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, spell_id = %command.spell_id))]
pub async fn handle_forget_spell(
    command: &ForgetSpell,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.forget_spell(command.spell_id, &command.actor, command.correlation_id, clock)?;
    persist(&character, repo).await
}

/// Handles the `ApplyState` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the game master or
/// the owner, `DomainError::Validation` for an invalid or duplicate state,
/// or the repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, state = %command.state.name))]
pub async fn handle_apply_state(
    command: &ApplyState,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.apply_state(
        command.state.clone(),
        &command.actor,
        command.correlation_id,
        clock,
    )?;
    persist(&character, repo).await
}

/// Handles the `ClearState` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the actor is the game master or
/// the owner, `DomainError::Validation` for an unknown state, or the
/// repository's error.
#[instrument(skip_all, fields(character_id = %command.character_id, state_id = %command.state_id))]
pub async fn handle_clear_state(
    command: &ClearState,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut character = load(command.character_id, repo).await?;
    character.clear_state(command.state_id, &command.actor, command.correlation_id, clock)?;
    persist(&character, repo).await
}
