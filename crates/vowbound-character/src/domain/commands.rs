//! Commands for the Characters context.

use uuid::Uuid;
use vowbound_core::actor::Actor;
use vowbound_core::command::Command;
use vowbound_rules::domain::attributes::Attributes;
use vowbound_rules::domain::resources::ResourceKind;

use super::abilities::{MagicSchool, PersonalityCategory, PersonalityTrait};
use super::spells::Spell;
use super::states::CharacterState;
use super::vows::BindingVow;

/// Command to create a new character.
#[derive(Debug, Clone)]
pub struct CreateCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier the new character will have.
    pub character_id: Uuid,
    /// The owning player.
    pub owner_id: Uuid,
    /// The character's name.
    pub name: String,
    pub background: String,
    /// Point-buy result; validated against the creation rules.
    pub attributes: Attributes,
    /// Innate ability catalogue key.
    pub innate_ability: Option<String>,
    pub magic_school: Option<MagicSchool>,
    pub personality: Vec<PersonalityTrait>,
}

impl Command for CreateCharacter {
    fn command_type(&self) -> &'static str {
        "character.create_character"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to set a resource pool's current value.
#[derive(Debug, Clone)]
pub struct SetResource {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub resource: ResourceKind,
    /// Requested value; clamped into the pool.
    pub value: i32,
}

impl Command for SetResource {
    fn command_type(&self) -> &'static str {
        "character.set_resource"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to apply a Black Flash restoration.
#[derive(Debug, Clone)]
pub struct RestoreFromBlackFlash {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    /// The roll that triggered the Black Flash.
    pub roll_id: Uuid,
}

impl Command for RestoreFromBlackFlash {
    fn command_type(&self) -> &'static str {
        "character.restore_from_black_flash"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to set a personality trait's intensity.
#[derive(Debug, Clone)]
pub struct SetPersonalityTrait {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub category: PersonalityCategory,
    /// 0 removes the trait.
    pub intensity: u8,
}

impl Command for SetPersonalityTrait {
    fn command_type(&self) -> &'static str {
        "character.set_personality_trait"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to attach a binding vow to a character.
#[derive(Debug, Clone)]
pub struct BindVow {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub vow: BindingVow,
    /// Must be the game master or the owning player.
    pub actor: Actor,
}

impl Command for BindVow {
    fn command_type(&self) -> &'static str {
        "character.bind_vow"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to switch a binding vow on or off.
#[derive(Debug, Clone)]
pub struct ToggleVow {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub vow_id: Uuid,
    /// Must be the owning player.
    pub actor: Actor,
}

impl Command for ToggleVow {
    fn command_type(&self) -> &'static str {
        "character.toggle_vow"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to add a spell to a character's repertoire.
#[derive(Debug, Clone)]
pub struct LearnSpell {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub spell: Spell,
    /// Must be the game master or the owning player.
    pub actor: Actor,
}

impl Command for LearnSpell {
    fn command_type(&self) -> &'static str {
        "character.learn_spell"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to remove a learned spell.
#[derive(Debug, Clone)]
pub struct ForgetSpell {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub spell_id: Uuid,
    /// Must be the game master or the owning player.
    pub actor: Actor,
}

impl Command for ForgetSpell {
    fn command_type(&self) -> &'static str {
        "character.forget_spell"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to place a buff, debuff or condition on a character.
#[derive(Debug, Clone)]
pub struct ApplyState {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub state: CharacterState,
    /// Must be the game master or the owning player.
    pub actor: Actor,
}

impl Command for ApplyState {
    fn command_type(&self) -> &'static str {
        "character.apply_state"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}

/// Command to remove an active state.
#[derive(Debug, Clone)]
pub struct ClearState {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The character identifier.
    pub character_id: Uuid,
    pub state_id: Uuid,
    /// Must be the game master or the owning player.
    pub actor: Actor,
}

impl Command for ClearState {
    fn command_type(&self) -> &'static str {
        "character.clear_state"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id
    }
}
