//! Layered, dynamic configuration.
//!
//! # Architecture Overview
//!
//! ```text
//!   ConfigSource ──poll──▶ SourcePoller ──apply──▶ SettableConfig ─┐
//!   (remote, file)        (polling/)               (leaf)          │ version bump
//!                                                                  ▼
//!   MapConfig / SettableConfig ──add_first/add_last──▶ CompositeConfig (root)
//!                                                          │
//!                        get_raw ◀─────────────────────────┤ listeners
//!                           │                              ▼
//!                     Interpolator ◀── PropertyRegistry ── notifier thread
//!                     ${key:default}        │                   │
//!                                           ▼                   ▼
//!                                   Property<T>::get()    on_change / on_parse_error
//! ```
//!
//! Subsystems:
//! - `config`: leaves, composites, listeners, diagnostics
//! - `interpolation`: cycle-safe `${}` substitution
//! - `cascade`: candidate resource names and the cascading loader
//! - `property`: typed, cached, observable handles
//! - `polling`: sources, fixed-rate and manual schedulers, file watching
//! - `settings`, `observability`, `lifecycle`: ambient concerns

pub mod cascade;
pub mod config;
pub mod interpolation;
pub mod lifecycle;
pub mod observability;
pub mod polling;
pub mod property;
pub mod settings;

pub use cascade::{CascadingLoader, ConcatCascadeStrategy, NoCascadeStrategy};
pub use config::{CompositeConfig, Config, ConfigError, MapConfig, SettableConfig};
pub use interpolation::{Interpolator, MissingPolicy};
pub use lifecycle::Shutdown;
pub use polling::{FixedRatePollingStrategy, ManualPollingStrategy, SourcePoller};
pub use property::{Property, PropertyError, PropertyListener, PropertyRegistry};
pub use settings::EngineSettings;
