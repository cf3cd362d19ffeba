//! Modifier contributors consulted when a roll is resolved.
//!
//! The resolver adds every registered contributor's bonus to the caller's
//! base modifier. Binding vows live on the character and are not a
//! contributor; nothing applies their effects to rolls.

use std::fmt::Debug;

use uuid::Uuid;

use super::attributes::Attribute;
use super::dice::DieType;

/// What a contributor can see about the roll being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollContext {
    pub actor_id: Uuid,
    pub character_id: Option<Uuid>,
    pub die: DieType,
    pub attribute: Option<Attribute>,
    pub difficulty_class: Option<i32>,
}

/// A source of additional roll modifier.
pub trait ModifierContributor: Send + Sync + Debug {
    /// Short label for logs.
    fn label(&self) -> &str;

    /// Bonus (or penalty, if negative) for this roll.
    fn contribute(&self, context: &RollContext) -> i32;
}

/// A fixed situational bonus, optionally limited to one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatModifier {
    pub label: String,
    pub amount: i32,
    pub attribute: Option<Attribute>,
}

impl FlatModifier {
    #[must_use]
    pub fn new(label: impl Into<String>, amount: i32) -> Self {
        Self {
            label: label.into(),
            amount,
            attribute: None,
        }
    }

    /// Restricts the bonus to rolls made with `attribute`.
    #[must_use]
    pub fn for_attribute(mut self, attribute: Attribute) -> Self {
        self.attribute = Some(attribute);
        self
    }
}

impl ModifierContributor for FlatModifier {
    fn label(&self) -> &str {
        &self.label
    }

    fn contribute(&self, context: &RollContext) -> i32 {
        match self.attribute {
            Some(required) if context.attribute != Some(required) => 0,
            _ => self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(attribute: Option<Attribute>) -> RollContext {
        RollContext {
            actor_id: Uuid::new_v4(),
            character_id: None,
            die: DieType::D20,
            attribute,
            difficulty_class: Some(15),
        }
    }

    #[test]
    fn test_flat_modifier_applies_to_every_roll() {
        let bonus = FlatModifier::new("high ground", 2);
        assert_eq!(bonus.contribute(&context(None)), 2);
        assert_eq!(bonus.contribute(&context(Some(Attribute::Magic))), 2);
    }

    #[test]
    fn test_attribute_bound_modifier_ignores_other_attributes() {
        let bonus = FlatModifier::new("focus", 3).for_attribute(Attribute::Wisdom);

        assert_eq!(bonus.contribute(&context(Some(Attribute::Wisdom))), 3);
        assert_eq!(bonus.contribute(&context(Some(Attribute::Strength))), 0);
        assert_eq!(bonus.contribute(&context(None)), 0);
    }
}
