//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → broadcast to polling loops → loops exit after any
//!     in-flight poll completes
//! ```
//!
//! # Design Decisions
//! - One signal may be shared by any number of schedulers
//! - The trigger is sticky: late subscribers still observe it

pub mod shutdown;

pub use shutdown::Shutdown;
