//! # Keepsake Common
//!
//! Shared types, traits, and utilities used across Keepsake components.
//!
//! ## Modules
//! - `types` - Core data structures (Capsule, Puzzle, UserProfile, etc.)
//! - `error` - Common error taxonomy
//! - `constants` - Shared configuration constants
//! - `progression` - Skill tier advancement rules

pub mod constants;
pub mod error;
pub mod progression;
pub mod types;

pub use error::KeepsakeError;
pub use progression::{ProgressionOutcome, advance};
pub use types::*;

/// Result alias used across Keepsake crates
pub type Result<T> = std::result::Result<T, KeepsakeError>;
