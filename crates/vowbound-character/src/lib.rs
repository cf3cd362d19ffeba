//! Vowbound — Characters.
//!
//! The `Character` aggregate owns a character's attribute set, resource
//! pools, innate ability, magic proficiency, personality and binding vows.

pub mod application;
pub mod domain;
