//! Typed, cached, observable properties over a config tree.
//!
//! # Data Flow
//! ```text
//! registry.get_property("db.port").as_integer(5432)
//!     → registry.rs (one handle per key and type)
//!     → handle.rs (cached value tagged with the tree version)
//!         fast path: cached version is current → return clone
//!         slow path: shard.rs lock → get_raw → interpolate → decoder.rs
//!
//! tree mutation
//!     → invalidation listener → notifier.rs thread
//!     → re-resolve handles with listeners → on_change / on_parse_error
//! ```
//!
//! # Design Decisions
//! - Any mutation invalidates every handle; staleness is a version compare
//! - Recomputation for one key is serialized on a striped lock
//! - Listeners never run while a tree or registry lock is held
//! - A decode failure keeps the last good value and is reported once

pub mod decoder;
pub mod error;
pub mod handle;
mod notifier;
pub mod registry;
pub mod shard;

pub use decoder::{Decode, DecodeContext, DecodeError, DecodeFn, DecoderRegistry};
pub use error::PropertyError;
pub use handle::{Property, PropertyListener};
pub use registry::{PropertyContainer, PropertyRegistry};
pub use shard::ShardedLocks;
