//! Clamped resource pools.
//!
//! Invariant: `0 <= current <= max` for every pool after every operation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vowbound_core::error::DomainError;

use super::attributes::Attributes;

/// Which of a character's four pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Health,
    /// Energy.
    Pe,
    Ether,
    Vigor,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Health,
        ResourceKind::Pe,
        ResourceKind::Ether,
        ResourceKind::Vigor,
    ];

    /// The pools a Black Flash refills. Health is deliberately absent.
    pub const BLACK_FLASH: [ResourceKind; 3] =
        [ResourceKind::Pe, ResourceKind::Ether, ResourceKind::Vigor];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Health => "health",
            ResourceKind::Pe => "pe",
            ResourceKind::Ether => "ether",
            ResourceKind::Vigor => "vigor",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown resource: {s}")))
    }
}

/// A current/max pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PoolRepr")]
pub struct ResourcePool {
    current: i32,
    max: i32,
}

// Deserialization goes through `ResourcePool::new` so remote data is clamped.
#[derive(Deserialize)]
struct PoolRepr {
    current: i32,
    max: i32,
}

impl From<PoolRepr> for ResourcePool {
    fn from(repr: PoolRepr) -> Self {
        Self::new(repr.current, repr.max)
    }
}

impl ResourcePool {
    /// A pool holding `current`, clamped into `[0, max]`. A negative `max` is
    /// treated as 0.
    #[must_use]
    pub fn new(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// A pool at its maximum.
    #[must_use]
    pub fn full(max: i32) -> Self {
        Self::new(max, max)
    }

    #[must_use]
    pub fn current(&self) -> i32 {
        self.current
    }

    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Sets the current value, clamped into `[0, max]`. Total for any input.
    #[must_use]
    pub fn set_current(self, value: i32) -> Self {
        Self::new(value, self.max)
    }

    /// Adds `amount` (saturating), clamped into `[0, max]`.
    #[must_use]
    pub fn restore(self, amount: i32) -> Self {
        self.set_current(self.current.saturating_add(amount))
    }

    /// Half the maximum, rounded down: what a Black Flash gives back.
    #[must_use]
    pub fn black_flash_amount(&self) -> i32 {
        self.max / 2
    }
}

/// A character's four pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePools {
    pub health: ResourcePool,
    pub pe: ResourcePool,
    pub ether: ResourcePool,
    pub vigor: ResourcePool,
}

impl ResourcePools {
    /// Full pools sized from creation attributes:
    /// health `80 + 4·con`, pe `30 + 3·innate`, ether `20 + 2·spiritual`,
    /// vigor `25 + 2·magic`.
    #[must_use]
    pub fn derived_from(attributes: &Attributes) -> Self {
        Self {
            health: ResourcePool::full(80 + attributes.constitution * 4),
            pe: ResourcePool::full(30 + attributes.innate * 3),
            ether: ResourcePool::full(20 + attributes.spiritual * 2),
            vigor: ResourcePool::full(25 + attributes.magic * 2),
        }
    }

    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> ResourcePool {
        match kind {
            ResourceKind::Health => self.health,
            ResourceKind::Pe => self.pe,
            ResourceKind::Ether => self.ether,
            ResourceKind::Vigor => self.vigor,
        }
    }

    /// Returns a copy with the `kind` pool replaced.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, pool: ResourcePool) -> Self {
        match kind {
            ResourceKind::Health => self.health = pool,
            ResourceKind::Pe => self.pe = pool,
            ResourceKind::Ether => self.ether = pool,
            ResourceKind::Vigor => self.vigor = pool,
        }
        self
    }

    /// Returns a copy with the `kind` pool's current value set (clamped).
    #[must_use]
    pub fn set_current(self, kind: ResourceKind, value: i32) -> Self {
        let pool = self.get(kind).set_current(value);
        self.with(kind, pool)
    }

    /// Pools after a Black Flash: pe, ether and vigor each gain half their
    /// maximum, clamped. Health is unchanged.
    #[must_use]
    pub fn after_black_flash(self) -> Self {
        ResourceKind::BLACK_FLASH.into_iter().fold(self, |pools, kind| {
            let pool = pools.get(kind);
            pools.with(kind, pool.restore(pool.black_flash_amount()))
        })
    }
}
