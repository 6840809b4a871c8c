//! Key lookup capability handed to the interpolator.

use std::collections::HashMap;

use crate::config::node::Config;

/// Resolves a placeholder key to its raw (possibly templated) value.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

impl Lookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Looks keys up in a config tree.
#[derive(Clone, Copy)]
pub struct ConfigLookup<'a>(pub &'a dyn Config);

impl Lookup for ConfigLookup<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.0.get_raw(key)
    }
}
