//! Recursive `${...}` substitution.
//!
//! ## Syntax
//!
//! - `${key}` - replaced by the looked-up value, itself interpolated
//! - `${key:default}` - falls back to `default` (also interpolated) when absent
//! - `${${env}.host}` - placeholder keys may contain placeholders
//! - `$${` - escape producing a literal `${`
//!
//! An unterminated `${` is copied through verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interpolation::lookup::Lookup;
use crate::settings::InterpolationSettings;

/// What to do with a placeholder whose key is absent and has no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Fail with `InterpolationError::MissingProperty`.
    #[default]
    Fail,
    /// Leave the `${key}` text in place.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// The chain starts and ends with the same key.
    #[error("circular reference: {}", .chain.join(" -> "))]
    CircularReference { chain: Vec<String> },

    #[error("unresolved placeholder '${{{key}}}'")]
    MissingProperty { key: String },
}

/// String interpolation engine shared by value resolution and cascading.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpolator {
    missing: MissingPolicy,
}

impl Interpolator {
    pub fn new(missing: MissingPolicy) -> Self {
        Self { missing }
    }

    pub fn from_settings(settings: &InterpolationSettings) -> Self {
        Self::new(settings.missing)
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing
    }

    /// Expand every placeholder in `template` against `lookup`.
    pub fn resolve(&self, template: &str, lookup: &dyn Lookup) -> Result<String, InterpolationError> {
        if !template.contains('$') {
            return Ok(template.to_string());
        }
        let mut stack = Vec::new();
        self.expand(template, lookup, &mut stack)
    }

    fn expand(
        &self,
        template: &str,
        lookup: &dyn Lookup,
        stack: &mut Vec<String>,
    ) -> Result<String, InterpolationError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("$${") {
                out.push_str("${");
                rest = after;
                continue;
            }

            let Some(body_and_rest) = tail.strip_prefix("${") else {
                out.push('$');
                rest = &tail[1..];
                continue;
            };

            match find_closing(body_and_rest) {
                Some(end) => {
                    let body = &body_and_rest[..end];
                    out.push_str(&self.substitute(body, lookup, stack)?);
                    rest = &body_and_rest[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Resolve the inside of one `${...}`.
    fn substitute(
        &self,
        body: &str,
        lookup: &dyn Lookup,
        stack: &mut Vec<String>,
    ) -> Result<String, InterpolationError> {
        let (raw_key, default) = match find_default_separator(body) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };

        let key = if raw_key.contains("${") {
            self.expand(raw_key, lookup, stack)?
        } else {
            raw_key.to_string()
        };

        if let Some(start) = stack.iter().position(|k| *k == key) {
            let mut chain = stack[start..].to_vec();
            chain.push(key);
            return Err(InterpolationError::CircularReference { chain });
        }

        if let Some(value) = lookup.lookup(&key) {
            stack.push(key);
            let resolved = self.expand(&value, lookup, stack);
            stack.pop();
            return resolved;
        }

        match default {
            Some(default) => self.expand(default, lookup, stack),
            None => match self.missing {
                MissingPolicy::Fail => Err(InterpolationError::MissingProperty { key }),
                MissingPolicy::Passthrough => Ok(format!("${{{}}}", body)),
            },
        }
    }
}

/// Index of the `}` closing a placeholder whose `${` has been consumed.
fn find_closing(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the first `:` outside nested placeholders.
fn find_default_separator(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
