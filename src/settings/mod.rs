//! Engine settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineSettings (validated, immutable)
//!     → sections handed to the interpolator, registry, scheduler, logging
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; they tune the engine, not the data it serves
//! - All fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, parse_settings, SettingsError};
pub use schema::{
    CascadeSettings, EngineSettings, InitialMode, InterpolationSettings, LogFormat,
    LoggingSettings, NotificationMode, PollingSettings, RegistrySettings,
};
pub use validation::{validate_settings, ValidationError};
