//! Option bags for toolchains and invocations
//!
//! Build definitions configure engines with loosely typed key/value options
//! (`debug: true`, `lint: ["all"]`, `properties: {...}`). Every consumer declares the
//! keys it understands and rejects anything else through [`Options::check`], so a
//! misspelled option fails at configuration time instead of being ignored.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<OptionValue>),
    Map(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendering used on command lines (`-source 11`, `-Dkey=value`)
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(OptionValue::render)
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.render()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Flattens scalars and lists into strings; a lone scalar becomes a one-item list
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().flat_map(OptionValue::to_strings).collect(),
            Self::Map(_) => vec![self.render()],
            other => vec![other.render()],
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Insertion-ordered option bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Options::set`]
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key`, replacing an existing value in place
    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Sets `key` only if it has no value yet
    pub fn set_default(&mut self, key: &str, value: impl Into<OptionValue>) {
        if !self.contains(key) {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(OptionValue::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    /// Value of `key` as a list of strings (a scalar counts as one item)
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(OptionValue::to_strings).unwrap_or_default()
    }

    /// Key/value pairs of a map-valued option, in key order
    pub fn get_map(&self, key: &str) -> Vec<(String, String)> {
        match self.get(key) {
            Some(OptionValue::Map(map)) => map.iter().map(|(k, v)| (k.clone(), v.render())).collect(),
            _ => Vec::new(),
        }
    }

    /// Appends items to a list-valued option, converting a scalar to a list first
    pub fn append(&mut self, key: &str, items: Vec<OptionValue>) {
        let mut list = match self.remove(key) {
            Some(OptionValue::List(existing)) => existing,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        list.extend(items);
        self.set(key, OptionValue::List(list));
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every entry of `other` over this bag
    pub fn merge(&mut self, other: &Options) {
        for (key, value) in other.iter() {
            self.set(key, value.clone());
        }
    }

    /// Rejects keys outside `allowed`
    pub fn check(&self, context: &str, allowed: &[&str]) -> Result<(), ConfigError> {
        match self.entries.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
            Some((key, _)) => Err(ConfigError::UnknownOption {
                context: context.to_string(),
                key: key.clone(),
                allowed: allowed.iter().map(|k| k.to_string()).collect(),
            }),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.set(&key.into(), value);
        }
        options
    }
}
