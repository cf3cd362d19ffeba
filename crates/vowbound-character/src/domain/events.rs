//! Domain events for the Characters context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::event::{DomainEvent, EventMetadata};
use vowbound_core::repository::StoredEvent;
use vowbound_rules::domain::attributes::Attributes;
use vowbound_rules::domain::resources::{ResourceKind, ResourcePools};

use super::abilities::{InnateAbility, MagicProficiency, PersonalityCategory, PersonalityTrait};
use super::spells::Spell;
use super::states::CharacterState;
use super::vows::BindingVow;

pub const CHARACTER_CREATED: &str = "character.created";
pub const RESOURCE_SET: &str = "character.resource_set";
pub const BLACK_FLASH_RESTORED: &str = "character.black_flash_restored";
pub const PERSONALITY_TRAIT_SET: &str = "character.personality_trait_set";
pub const VOW_BOUND: &str = "character.vow_bound";
pub const VOW_TOGGLED: &str = "character.vow_toggled";
pub const SPELL_LEARNED: &str = "character.spell_learned";
pub const SPELL_FORGOTTEN: &str = "character.spell_forgotten";
pub const STATE_APPLIED: &str = "character.state_applied";
pub const STATE_CLEARED: &str = "character.state_cleared";

/// Emitted when a character is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterCreated {
    /// The character identifier.
    pub character_id: Uuid,
    /// The player who owns the character.
    pub owner_id: Uuid,
    /// The character's name.
    pub name: String,
    pub background: String,
    pub attributes: Attributes,
    /// Starting pools, full and sized from `attributes`.
    pub resources: ResourcePools,
    pub innate_ability: Option<InnateAbility>,
    pub magic_proficiency: Option<MagicProficiency>,
    pub personality: Vec<PersonalityTrait>,
}

/// Emitted when a pool's current value is edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    /// The character identifier.
    pub character_id: Uuid,
    pub resource: ResourceKind,
    /// New current value, already clamped.
    pub current: i32,
}

/// Emitted when a Black Flash roll refills the character.
///
/// Carries the resulting current values rather than the deltas so replaying
/// the event on any replica converges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackFlashRestored {
    /// The character identifier.
    pub character_id: Uuid,
    /// The triggering roll.
    pub roll_id: Uuid,
    pub pe: i32,
    pub ether: i32,
    pub vigor: i32,
}

/// Emitted when a personality trait is set; intensity 0 removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityTraitSet {
    /// The character identifier.
    pub character_id: Uuid,
    pub category: PersonalityCategory,
    pub intensity: u8,
}

/// Emitted when a binding vow is attached to a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VowBound {
    /// The character identifier.
    pub character_id: Uuid,
    pub vow: BindingVow,
    /// The user who created the vow.
    pub bound_by: Uuid,
}

/// Emitted when a vow is switched on or off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VowToggled {
    /// The character identifier.
    pub character_id: Uuid,
    pub vow_id: Uuid,
    pub active: bool,
}

/// Emitted when a spell is added to the character's repertoire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellLearned {
    /// The character identifier.
    pub character_id: Uuid,
    pub spell: Spell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellForgotten {
    /// The character identifier.
    pub character_id: Uuid,
    pub spell_id: Uuid,
}

/// Emitted when a buff, debuff or condition is placed on the character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateApplied {
    /// The character identifier.
    pub character_id: Uuid,
    pub state: CharacterState,
    /// The user who applied the state.
    pub applied_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCleared {
    /// The character identifier.
    pub character_id: Uuid,
    pub state_id: Uuid,
}

/// Event payload variants for the Characters context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharacterEventKind {
    /// A character has been created.
    CharacterCreated(CharacterCreated),
    /// A resource pool was edited.
    ResourceSet(ResourceSet),
    /// A Black Flash refilled pe, ether and vigor.
    BlackFlashRestored(BlackFlashRestored),
    /// A personality trait changed.
    PersonalityTraitSet(PersonalityTraitSet),
    /// A binding vow was created.
    VowBound(VowBound),
    /// A binding vow was toggled.
    VowToggled(VowToggled),
    SpellLearned(SpellLearned),
    SpellForgotten(SpellForgotten),
    StateApplied(StateApplied),
    StateCleared(StateCleared),
}

/// Domain event envelope for the Characters context.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CharacterEventKind,
}

impl DomainEvent for CharacterEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            CharacterEventKind::CharacterCreated(_) => CHARACTER_CREATED,
            CharacterEventKind::ResourceSet(_) => RESOURCE_SET,
            CharacterEventKind::BlackFlashRestored(_) => BLACK_FLASH_RESTORED,
            CharacterEventKind::PersonalityTraitSet(_) => PERSONALITY_TRAIT_SET,
            CharacterEventKind::VowBound(_) => VOW_BOUND,
            CharacterEventKind::VowToggled(_) => VOW_TOGGLED,
            CharacterEventKind::SpellLearned(_) => SPELL_LEARNED,
            CharacterEventKind::SpellForgotten(_) => SPELL_FORGOTTEN,
            CharacterEventKind::StateApplied(_) => STATE_APPLIED,
            CharacterEventKind::StateCleared(_) => STATE_CLEARED,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("CharacterEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

impl TryFrom<&StoredEvent> for CharacterEvent {
    type Error = DomainError;

    fn try_from(stored: &StoredEvent) -> Result<Self, Self::Error> {
        let kind: CharacterEventKind = serde_json::from_value(stored.payload.clone())
            .map_err(|e| {
                DomainError::Collaborator(format!("event deserialization failed: {e}"))
            })?;
        Ok(Self {
            metadata: EventMetadata::from(stored),
            kind,
        })
    }
}
