//! Name cascading.
//!
//! # Data Flow
//! ```text
//! base name "app" + parameters ["${env}", "${region}"]
//!     → strategy.rs (interpolate parameters, concatenate)
//!     → ["app", "app-prod", "app-prod-us-east"]
//!     → loader.rs (load each candidate, skip missing)
//!     → CompositeConfig with the most specific candidate first
//! ```
//!
//! # Design Decisions
//! - Candidate lists are recomputed on every load, never stored
//! - Parameters resolve at generation time, not construction time
//! - A missing candidate is normal; a failing loader is an error

pub mod loader;
pub mod strategy;

pub use loader::{CascadeError, CascadingLoader, ConfigLoader, LoadError};
pub use strategy::{CascadeStrategy, ConcatCascadeStrategy, NoCascadeStrategy};
