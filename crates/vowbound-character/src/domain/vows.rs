//! Binding vows: self-imposed restrictions traded for a benefit.
//!
//! Vows are stored and toggled but never applied to rolls automatically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vowbound_core::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VowKind {
    Momentary,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VowSubtype {
    Inhibitor,
    Subjugated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VowEffectKind {
    CostReduction,
    DamageMultiplier,
    AttributeModifier,
    Special,
}

/// A benefit or penalty attached to a vow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VowEffect {
    pub kind: VowEffectKind,
    pub value: f64,
    /// What the effect applies to, e.g. an attribute or ability name.
    pub target: Option<String>,
}

impl VowEffect {
    #[must_use]
    pub fn new(kind: VowEffectKind, value: f64) -> Self {
        Self {
            kind,
            value,
            target: None,
        }
    }

    #[must_use]
    pub fn targeting(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingVow {
    pub id: Uuid,
    pub name: String,
    pub kind: VowKind,
    pub subtype: Option<VowSubtype>,
    pub description: String,
    pub activation_condition: String,
    pub benefit: VowEffect,
    pub penalty: Option<VowEffect>,
    pub active: bool,
    /// Rounds a momentary vow lasts.
    pub duration: Option<u32>,
}

impl BindingVow {
    /// A new, inactive vow.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: VowKind, benefit: VowEffect) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            subtype: None,
            description: String::new(),
            activation_condition: String::new(),
            benefit,
            penalty: None,
            active: false,
            duration: None,
        }
    }

    #[must_use]
    pub fn with_penalty(mut self, penalty: VowEffect) -> Self {
        self.penalty = Some(penalty);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.activation_condition = condition.into();
        self
    }

    /// Checks the fields a vow must have before it is bound.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name, a non-finite
    /// effect value, or a zero duration.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation("vow name must not be empty".into()));
        }
        let mut effects = std::iter::once(&self.benefit).chain(self.penalty.as_ref());
        if effects.any(|e| !e.value.is_finite()) {
            return Err(DomainError::Validation(
                "vow effect value must be finite".into(),
            ));
        }
        if self.duration == Some(0) {
            return Err(DomainError::Validation(
                "vow duration must be at least one round".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vow() -> BindingVow {
        BindingVow::new(
            "Reveal the Technique",
            VowKind::Momentary,
            VowEffect::new(VowEffectKind::DamageMultiplier, 1.5),
        )
    }

    #[test]
    fn test_new_vow_starts_inactive() {
        assert!(!vow().active);
        assert!(vow().validate().is_ok());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut blank = vow();
        blank.name = "   ".into();

        match blank.validate() {
            Err(DomainError::Validation(msg)) => assert_eq!(msg, "vow name must not be empty"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_nan_penalty_is_rejected() {
        let bad = vow().with_penalty(VowEffect::new(VowEffectKind::Special, f64::NAN));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_effect_kind_serializes_snake_case() {
        let json = serde_json::to_value(VowEffectKind::CostReduction).unwrap();
        assert_eq!(json, serde_json::json!("cost_reduction"));
    }
}
