//! Vowbound Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the character,
//! session and rules crates depend on. It contains no infrastructure code
//! beyond the production RNG.

pub mod actor;
pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
pub mod rng;
pub mod stream;
