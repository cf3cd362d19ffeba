//! Query handlers for the Characters context.
//!
//! This module contains query handlers that reconstitute aggregates
//! from stored events and return read-only view DTOs.

use serde::Serialize;
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::repository::EventRepository;
use vowbound_rules::domain::attributes::Attributes;
use vowbound_rules::domain::resources::ResourcePools;

use crate::application::command_handlers;
use crate::domain::abilities::{InnateAbility, MagicProficiency, PersonalityTrait};
use crate::domain::aggregates::Character;
use crate::domain::spells::Spell;
use crate::domain::states::CharacterState;
use crate::domain::vows::BindingVow;

/// Read-only view of a character sheet.
#[derive(Debug, Serialize)]
pub struct CharacterView {
    /// The character identifier.
    pub character_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub level: u32,
    pub background: String,
    pub attributes: Attributes,
    pub resources: ResourcePools,
    pub innate_ability: Option<InnateAbility>,
    pub magic_proficiency: Option<MagicProficiency>,
    pub personality: Vec<PersonalityTrait>,
    pub binding_vows: Vec<BindingVow>,
    pub spells: Vec<Spell>,
    /// Active buffs, debuffs and conditions.
    pub states: Vec<CharacterState>,
    /// Current version (event count).
    pub version: i64,
}

impl From<Character> for CharacterView {
    fn from(character: Character) -> Self {
        Self {
            character_id: character.id,
            owner_id: character.owner_id,
            name: character.name,
            level: character.level,
            background: character.background,
            attributes: character.attributes,
            resources: character.resources,
            innate_ability: character.innate_ability,
            magic_proficiency: character.magic_proficiency,
            personality: character.personality,
            binding_vows: character.vows,
            spells: character.spells,
            states: character.states,
            version: character.version,
        }
    }
}

/// Retrieves a character by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Collaborator` if loading or deserialization fails.
pub async fn get_character_by_id(
    character_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<CharacterView, DomainError> {
    let stored_events = repo.load_events(character_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(character_id));
    }
    let character = command_handlers::reconstitute(character_id, &stored_events)?;
    Ok(CharacterView::from(character))
}

/// Retrieves the vows currently switched on for a character.
///
/// # Errors
///
/// Same as [`get_character_by_id`].
pub async fn get_active_vows(
    character_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Vec<BindingVow>, DomainError> {
    let view = get_character_by_id(character_id, repo).await?;
    Ok(view.binding_vows.into_iter().filter(|v| v.active).collect())
}
