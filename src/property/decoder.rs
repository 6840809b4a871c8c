//! String-to-type conversion for property values.
//!
//! Built-in types implement [`Decode`] and are always available. Other types
//! are registered at runtime in a [`DecoderRegistry`] and looked up by
//! `TypeId`.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode '{raw}' as {type_name}: {reason}")]
pub struct DecodeError {
    pub raw: String,
    pub type_name: &'static str,
    pub reason: String,
}

impl DecodeError {
    pub fn new<T>(raw: &str, reason: impl ToString) -> Self {
        Self {
            raw: raw.to_string(),
            type_name: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }
}

/// Settings that influence decoding.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Separator for list and set values.
    pub list_delimiter: &'a str,
}

impl Default for DecodeContext<'_> {
    fn default() -> Self {
        Self { list_delimiter: "," }
    }
}

/// Types with a built-in decoder.
pub trait Decode: Sized + Clone + PartialEq + Send + Sync + 'static {
    fn decode(raw: &str, ctx: &DecodeContext<'_>) -> Result<Self, DecodeError>;
}

/// Type-erased decode function held by a property handle.
pub type DecodeFn<T> = Arc<dyn Fn(&str) -> Result<T, DecodeError> + Send + Sync>;

impl Decode for String {
    fn decode(raw: &str, _ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        Ok(raw.to_string())
    }
}

impl Decode for bool {
    fn decode(raw: &str, _ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(DecodeError::new::<bool>(raw, "expected true/false, yes/no or on/off")),
        }
    }
}

macro_rules! decode_from_str {
    ($($ty:ty),*) => {
        $(
            impl Decode for $ty {
                fn decode(raw: &str, _ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
                    raw.trim().parse::<$ty>().map_err(|e| DecodeError::new::<$ty>(raw, e))
                }
            }
        )*
    };
}

decode_from_str!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

/// Accepts `250ms`, `5s`, `2m`, `1h`, or a bare number of milliseconds.
impl Decode for Duration {
    fn decode(raw: &str, _ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let amount: u64 = digits
            .parse()
            .map_err(|e| DecodeError::new::<Duration>(raw, e))?;
        match unit.trim() {
            "" | "ms" => Ok(Duration::from_millis(amount)),
            "s" => Ok(Duration::from_secs(amount)),
            "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
            "h" => Ok(Duration::from_secs(amount.saturating_mul(3600))),
            other => Err(DecodeError::new::<Duration>(raw, format!("unknown unit '{}'", other))),
        }
    }
}

fn split_items<'a>(raw: &'a str, ctx: &DecodeContext<'_>) -> Vec<&'a str> {
    let delimiter = if ctx.list_delimiter.is_empty() { "," } else { ctx.list_delimiter };
    raw.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(raw: &str, ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        split_items(raw, ctx).into_iter().map(|item| T::decode(item, ctx)).collect()
    }
}

impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn decode(raw: &str, ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        split_items(raw, ctx).into_iter().map(|item| T::decode(item, ctx)).collect()
    }
}

impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn decode(raw: &str, ctx: &DecodeContext<'_>) -> Result<Self, DecodeError> {
        split_items(raw, ctx).into_iter().map(|item| T::decode(item, ctx)).collect()
    }
}

/// Runtime decoders for types without a [`Decode`] impl.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the decoder for `T`.
    pub fn register<T, F>(&self, decoder: F)
    where
        T: 'static,
        F: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        let decode: DecodeFn<T> = Arc::new(decoder);
        self.decoders.insert(TypeId::of::<T>(), Arc::new(decode));
    }

    pub fn get<T: 'static>(&self) -> Option<DecodeFn<T>> {
        let entry = self.decoders.get(&TypeId::of::<T>())?;
        let erased = entry.value().clone();
        drop(entry);
        erased.downcast::<DecodeFn<T>>().ok().map(|decode| DecodeFn::clone(&decode))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.decoders.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: Decode>(raw: &str) -> Result<T, DecodeError> {
        T::decode(raw, &DecodeContext::default())
    }

    #[test]
    fn test_primitives() {
        assert_eq!(decode::<i32>(" 42 ").unwrap(), 42);
        assert_eq!(decode::<i8>("-7").unwrap(), -7);
        assert_eq!(decode::<u64>("18446744073709551615").unwrap(), u64::MAX);
        assert_eq!(decode::<f64>("2.5").unwrap(), 2.5);
        assert_eq!(decode::<String>(" keep spaces ").unwrap(), " keep spaces ");
        assert!(decode::<u8>("256").is_err());
        assert!(decode::<i32>("abc").is_err());
    }

    #[test]
    fn test_booleans() {
        for raw in ["true", "TRUE", "yes", "On"] {
            assert!(decode::<bool>(raw).unwrap(), "{}", raw);
        }
        for raw in ["false", "No", "off"] {
            assert!(!decode::<bool>(raw).unwrap(), "{}", raw);
        }
        let err = decode::<bool>("maybe").unwrap_err();
        assert_eq!(err.type_name, "bool");
    }

    #[test]
    fn test_lists_and_sets() {
        assert_eq!(decode::<Vec<String>>("a, b,,c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(decode::<Vec<i64>>("1,2,3").unwrap(), vec![1, 2, 3]);
        assert!(decode::<Vec<i64>>("1,x").is_err());
        assert!(decode::<Vec<String>>("").unwrap().is_empty());

        let set = decode::<BTreeSet<String>>("b,a,b").unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);

        let piped = Vec::<String>::decode("x|y", &DecodeContext { list_delimiter: "|" }).unwrap();
        assert_eq!(piped, vec!["x", "y"]);
    }

    #[test]
    fn test_durations() {
        assert_eq!(decode::<Duration>("250").unwrap(), Duration::from_millis(250));
        assert_eq!(decode::<Duration>("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(decode::<Duration>("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(decode::<Duration>("2m").unwrap(), Duration::from_secs(120));
        assert!(decode::<Duration>("5 fortnights").is_err());
        assert!(decode::<Duration>("s").is_err());
    }

    #[test]
    fn test_registry_lookup() {
        #[derive(Debug, Clone, PartialEq)]
        struct Port(u16);

        let registry = DecoderRegistry::new();
        assert!(registry.get::<Port>().is_none());

        registry.register(|raw: &str| {
            raw.parse::<u16>()
                .map(Port)
                .map_err(|e| DecodeError::new::<Port>(raw, e))
        });
        assert!(registry.contains::<Port>());
        let decode = registry.get::<Port>().unwrap();
        assert_eq!(decode("8080").unwrap(), Port(8080));
        assert!(decode("http").is_err());
    }
}
