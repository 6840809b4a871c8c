//! Errors surfaced by property handles.

use thiserror::Error;

use crate::interpolation::InterpolationError;
use crate::property::decoder::DecodeError;

#[derive(Debug, Error)]
pub enum PropertyError {
    /// No built-in or registered decoder for the requested type.
    #[error("no decoder registered for type {type_name}")]
    ConverterNotFound { type_name: &'static str },

    /// The raw value could not be converted. The handle keeps its last good value.
    #[error("property '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    /// The raw value contained a broken placeholder.
    #[error("property '{key}': {source}")]
    Interpolation {
        key: String,
        #[source]
        source: InterpolationError,
    },

    #[error("failed to start property notifier: {0}")]
    Notifier(#[from] std::io::Error),
}

impl PropertyError {
    /// Which resolution step failed, for low-cardinality reporting.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::ConverterNotFound { .. } => "converter",
            Self::Decode { .. } => "decode",
            Self::Interpolation { .. } => "interpolation",
            Self::Notifier(_) => "notifier",
        }
    }
}
