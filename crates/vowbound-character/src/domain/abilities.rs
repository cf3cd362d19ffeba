//! Innate abilities, magic proficiency and personality traits chosen at
//! character creation.

use serde::{Deserialize, Serialize};
use vowbound_core::error::DomainError;
use vowbound_rules::domain::resources::ResourceKind;

/// Highest personality trait intensity.
pub const MAX_TRAIT_INTENSITY: u8 = 3;

/// A signature power drawn from the innate ability catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnateAbility {
    /// Catalogue key, e.g. `"shadow-step"`.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Resource spent per use.
    pub cost: i32,
    pub resource: ResourceKind,
    pub level: u8,
    pub max_level: u8,
}

impl InnateAbility {
    fn entry(
        id: &str,
        name: &str,
        description: &str,
        cost: i32,
        resource: ResourceKind,
    ) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            description: description.to_owned(),
            cost,
            resource,
            level: 1,
            max_level: 5,
        }
    }

    /// Every ability a new character can pick, at level 1.
    #[must_use]
    pub fn catalogue() -> Vec<InnateAbility> {
        vec![
            Self::entry(
                "fire-manipulation",
                "Fire Manipulation",
                "Control and create flames with your will",
                15,
                ResourceKind::Pe,
            ),
            Self::entry(
                "shadow-step",
                "Shadow Step",
                "Teleport through shadows instantly",
                20,
                ResourceKind::Pe,
            ),
            Self::entry(
                "mind-read",
                "Mind Reading",
                "Peer into the thoughts of others",
                25,
                ResourceKind::Ether,
            ),
            Self::entry(
                "time-dilation",
                "Time Dilation",
                "Slow down time around you",
                30,
                ResourceKind::Vigor,
            ),
        ]
    }

    /// Looks up a catalogue entry by key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown key.
    pub fn from_catalogue(id: &str) -> Result<Self, DomainError> {
        Self::catalogue()
            .into_iter()
            .find(|ability| ability.id == id)
            .ok_or_else(|| DomainError::Validation(format!("unknown innate ability: {id}")))
    }
}

/// School of magic a character is trained in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagicSchool {
    Invocation,
    Conjuration,
    Manipulation,
    Enchantment,
    Divination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicProficiency {
    pub school: MagicSchool,
    pub level: u8,
}

impl MagicProficiency {
    /// A starting proficiency (level 1).
    #[must_use]
    pub fn novice(school: MagicSchool) -> Self {
        Self { school, level: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityCategory {
    Heroic,
    Impulsive,
    Cautious,
    Aggressive,
    Diplomatic,
    Mysterious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityTrait {
    pub category: PersonalityCategory,
    /// 1 to [`MAX_TRAIT_INTENSITY`].
    pub intensity: u8,
}

/// Checks a trait intensity. Zero is allowed and means "remove".
///
/// # Errors
///
/// Returns `DomainError::Validation` above [`MAX_TRAIT_INTENSITY`].
pub fn validate_intensity(intensity: u8) -> Result<(), DomainError> {
    if intensity > MAX_TRAIT_INTENSITY {
        return Err(DomainError::Validation(format!(
            "trait intensity {intensity} exceeds {MAX_TRAIT_INTENSITY}"
        )));
    }
    Ok(())
}

/// Sets `category` to `intensity` in `traits`, keeping at most one entry
/// per category. Intensity 0 removes the category.
pub fn set_trait(traits: &mut Vec<PersonalityTrait>, category: PersonalityCategory, intensity: u8) {
    if intensity == 0 {
        traits.retain(|t| t.category != category);
        return;
    }
    match traits.iter_mut().find(|t| t.category == category) {
        Some(existing) => existing.intensity = intensity,
        None => traits.push(PersonalityTrait {
            category,
            intensity,
        }),
    }
}
