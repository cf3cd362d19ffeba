//! Buffs, debuffs and conditions active on a character.
//!
//! Like vows, states are recorded on the sheet but never folded into rolls
//! or pools automatically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_rules::domain::attributes::Attribute;
use vowbound_rules::domain::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Buff,
    Debuff,
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOperation {
    Add,
    Multiply,
    Set,
}

/// What a state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTarget {
    Attribute(Attribute),
    Resource(ResourceKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateEffect {
    pub target: StateTarget,
    pub operation: StateOperation,
    pub modifier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub id: Uuid,
    pub name: String,
    pub kind: StateKind,
    pub description: String,
    /// Rounds remaining; 0 is permanent.
    pub duration: u32,
    pub effects: Vec<StateEffect>,
}

impl CharacterState {
    /// A permanent state with no effects.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StateKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            description: String::new(),
            duration: 0,
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn lasting(mut self, rounds: u32) -> Self {
        self.duration = rounds;
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: StateEffect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.duration == 0
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name or a non-finite
    /// modifier.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation("state name must not be empty".into()));
        }
        if self.effects.iter().any(|e| !e.modifier.is_finite()) {
            return Err(DomainError::Validation(
                "state modifier must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_permanent_until_given_a_duration() {
        let stunned = CharacterState::new("Stunned", StateKind::Condition);

        assert!(stunned.is_permanent());
        assert!(!stunned.lasting(2).is_permanent());
    }

    #[test]
    fn test_non_finite_modifier_is_rejected() {
        let state = CharacterState::new("Cursed Energy Surge", StateKind::Buff).with_effect(
            StateEffect {
                target: StateTarget::Resource(ResourceKind::Pe),
                operation: StateOperation::Multiply,
                modifier: f64::NAN,
            },
        );

        assert!(matches!(state.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_effect_target_is_tagged_by_kind() {
        let json = serde_json::to_value(StateTarget::Attribute(Attribute::Strength)).unwrap();

        assert_eq!(json, serde_json::json!({ "attribute": "strength" }));
    }
}
