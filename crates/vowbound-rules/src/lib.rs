//! Vowbound — Rules & Resolution.
//!
//! Pure game rules shared by the character and session contexts: the
//! attribute set and its point-buy editor, clamped resource pools, die types,
//! roll resolution with the Black Flash critical, and the modifier
//! contributor extension point.

pub mod domain;
