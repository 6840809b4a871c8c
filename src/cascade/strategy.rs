//! Candidate resource name generation.

use crate::interpolation::{InterpolationError, Interpolator, Lookup};
use crate::settings::CascadeSettings;

/// Produces the ordered list of resource names to try for a base name.
///
/// Names run from least to most specific.
pub trait CascadeStrategy: Send + Sync {
    fn generate(
        &self,
        resource: &str,
        interpolator: &Interpolator,
        lookup: &dyn Lookup,
    ) -> Result<Vec<String>, InterpolationError>;
}

/// Only ever yields the base name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCascadeStrategy;

impl CascadeStrategy for NoCascadeStrategy {
    fn generate(
        &self,
        resource: &str,
        _interpolator: &Interpolator,
        _lookup: &dyn Lookup,
    ) -> Result<Vec<String>, InterpolationError> {
        Ok(vec![resource.to_string()])
    }
}

/// Appends each parameter in turn: `app`, `app-prod`, `app-prod-us-east`.
///
/// Parameters are templates resolved at generation time, so one instance
/// follows `env`/`region` changes between calls. A parameter that resolves
/// to the empty string still contributes a separator.
#[derive(Debug, Clone)]
pub struct ConcatCascadeStrategy {
    parameters: Vec<String>,
    separator: String,
}

impl ConcatCascadeStrategy {
    pub const DEFAULT_SEPARATOR: &'static str = "-";

    pub fn new<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_separator(parameters, Self::DEFAULT_SEPARATOR)
    }

    pub fn with_separator<I, S>(parameters: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            separator: separator.into(),
        }
    }

    pub fn from_settings(settings: &CascadeSettings) -> Self {
        Self::with_separator(settings.parameters.iter().cloned(), settings.separator.clone())
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl CascadeStrategy for ConcatCascadeStrategy {
    fn generate(
        &self,
        resource: &str,
        interpolator: &Interpolator,
        lookup: &dyn Lookup,
    ) -> Result<Vec<String>, InterpolationError> {
        let mut names = Vec::with_capacity(self.parameters.len() + 1);
        let mut current = resource.to_string();
        names.push(current.clone());

        for parameter in &self.parameters {
            let value = interpolator.resolve(parameter, lookup)?;
            current = format!("{}{}{}", current, self.separator, value);
            names.push(current.clone());
        }
        Ok(names)
    }
}
