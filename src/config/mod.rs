//! Configuration tree.
//!
//! # Data Flow
//! ```text
//! application code / pollers
//!     → SettableConfig (leaf mutation, version bump)
//!     → ConfigListener chain (child → parent composites)
//!     → CompositeConfig version bump at every level up to the root
//!     → root listeners (property registry invalidation)
//!
//! get(key):
//!     root CompositeConfig
//!     → children in priority order (snapshot of the child list)
//!     → first child holding the key answers
//! ```
//!
//! # Design Decisions
//! - Duplicate child names are legal; resolution is by position, not name
//! - No caching at this layer; structural changes are visible immediately
//! - Children are shared by `Arc`, so a leaf may sit in several trees and
//!   still be mutated directly by its owner

pub mod composite;
pub mod error;
pub mod listeners;
pub mod map;
pub mod node;
pub mod settable;
pub mod visitor;

pub use composite::CompositeConfig;
pub use error::ConfigError;
pub use listeners::ListenerSet;
pub use map::MapConfig;
pub use node::{Config, ConfigListener, Resolution};
pub use settable::SettableConfig;
pub use visitor::{TreeDump, Visitor};
