//! The nine character attributes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vowbound_core::error::DomainError;

/// A named character stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Charisma,
    Wisdom,
    Innate,
    Spiritual,
    Magic,
}

impl Attribute {
    /// Every attribute, in character-sheet order.
    pub const ALL: [Attribute; 9] = [
        Attribute::Strength,
        Attribute::Dexterity,
        Attribute::Constitution,
        Attribute::Intelligence,
        Attribute::Charisma,
        Attribute::Wisdom,
        Attribute::Innate,
        Attribute::Spiritual,
        Attribute::Magic,
    ];

    /// The snake-case name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Strength => "strength",
            Attribute::Dexterity => "dexterity",
            Attribute::Constitution => "constitution",
            Attribute::Intelligence => "intelligence",
            Attribute::Charisma => "charisma",
            Attribute::Wisdom => "wisdom",
            Attribute::Innate => "innate",
            Attribute::Spiritual => "spiritual",
            Attribute::Magic => "magic",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown attribute: {s}")))
    }
}

/// A full attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub charisma: i32,
    pub wisdom: i32,
    pub innate: i32,
    pub spiritual: i32,
    pub magic: i32,
}

impl Attributes {
    /// Every attribute set to `value`.
    #[must_use]
    pub fn uniform(value: i32) -> Self {
        Self {
            strength: value,
            dexterity: value,
            constitution: value,
            intelligence: value,
            charisma: value,
            wisdom: value,
            innate: value,
            spiritual: value,
            magic: value,
        }
    }

    #[must_use]
    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Charisma => self.charisma,
            Attribute::Wisdom => self.wisdom,
            Attribute::Innate => self.innate,
            Attribute::Spiritual => self.spiritual,
            Attribute::Magic => self.magic,
        }
    }

    /// Returns a copy with `attribute` replaced by `value`.
    #[must_use]
    pub fn with(mut self, attribute: Attribute, value: i32) -> Self {
        let slot = match attribute {
            Attribute::Strength => &mut self.strength,
            Attribute::Dexterity => &mut self.dexterity,
            Attribute::Constitution => &mut self.constitution,
            Attribute::Intelligence => &mut self.intelligence,
            Attribute::Charisma => &mut self.charisma,
            Attribute::Wisdom => &mut self.wisdom,
            Attribute::Innate => &mut self.innate,
            Attribute::Spiritual => &mut self.spiritual,
            Attribute::Magic => &mut self.magic,
        };
        *slot = value;
        self
    }

    /// Iterates `(attribute, value)` pairs in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, i32)> + '_ {
        Attribute::ALL.into_iter().map(|a| (a, self.get(a)))
    }
}

impl Default for Attributes {
    /// The character builder's starting spread: 10 everywhere.
    fn default() -> Self {
        Self::uniform(10)
    }
}
