//! Placeholder substitution.
//!
//! - `replacements`: the per-record token map and matching
//! - `engine`: rewrites one text container in collapse or segment mode
//! - `traverse`: walks a whole document applying the engine

pub mod engine;
pub mod replacements;
pub mod traverse;

pub use engine::{substitute, SubstitutionMode};
pub use replacements::{Match, Replacement, ReplacementMap};
pub use traverse::{substitute_document, TraversalReport};
