//! Spells a character has learned.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;

use super::abilities::MagicSchool;

/// Highest spell level.
pub const MAX_SPELL_LEVEL: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    Buff,
    Debuff,
    Utility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    #[serde(rename = "self")]
    Caster,
    Ally,
    Enemy,
    Area,
}

/// What casting does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityEffect {
    pub kind: EffectKind,
    pub value: i32,
    /// Rounds the effect lasts; `None` is instantaneous.
    pub duration: Option<u32>,
    pub target: EffectTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub id: Uuid,
    pub name: String,
    pub school: MagicSchool,
    pub level: u8,
    /// Ether spent per cast.
    pub cost: i32,
    pub description: String,
    pub effects: Vec<AbilityEffect>,
    pub proficient: bool,
}

impl Spell {
    #[must_use]
    pub fn new(name: impl Into<String>, school: MagicSchool, level: u8, cost: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            school,
            level,
            cost,
            description: String::new(),
            effects: Vec::new(),
            proficient: false,
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: AbilityEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Checks the fields a spell must have before it is learned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name, a level outside
    /// `1..=9`, a negative cost, or a zero-round effect.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation("spell name must not be empty".into()));
        }
        if !(1..=MAX_SPELL_LEVEL).contains(&self.level) {
            return Err(DomainError::Validation(format!(
                "spell level must be between 1 and {MAX_SPELL_LEVEL}, got {}",
                self.level
            )));
        }
        if self.cost < 0 {
            return Err(DomainError::Validation(
                "spell cost must not be negative".into(),
            ));
        }
        if self.effects.iter().any(|e| e.duration == Some(0)) {
            return Err(DomainError::Validation(
                "spell effect duration must be at least one round".into(),
            ));
        }
        Ok(())
    }
}
