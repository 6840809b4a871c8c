//! Placeholder interpolation.
//!
//! # Data Flow
//! ```text
//! template "http://${host}:${port}"
//!     → interpolator.rs (scan for ${...}, detect cycles)
//!     → lookup.rs (caller-supplied key source: config tree, map, closure)
//!     → looked-up value interpolated recursively
//!     → resolved string
//! ```
//!
//! # Design Decisions
//! - One engine serves both value substitution and cascade name generation
//! - Cycles fail with the full key chain instead of recursing forever
//! - Missing keys fail or pass through depending on `MissingPolicy`

pub mod interpolator;
pub mod lookup;

pub use interpolator::{InterpolationError, Interpolator, MissingPolicy};
pub use lookup::{ConfigLookup, Lookup};
