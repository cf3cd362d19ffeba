//! Domain layer for the Rules & Resolution context.

pub mod attributes;
pub mod dice;
pub mod modifiers;
pub mod point_buy;
pub mod resolution;
pub mod resources;
