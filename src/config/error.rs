//! Errors raised by the config tree.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Key absent from every layer. Callers normally fall back to a default.
    #[error("property '{key}' not found in config '{config}'")]
    NotFound { key: String, config: String },

    /// A child with this name is already registered where names must be unique.
    #[error("config '{name}' already exists in '{parent}'")]
    AlreadyExists { name: String, parent: String },
}
