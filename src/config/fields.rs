//! Typed field extraction from decoded config maps
//!
//! Every value object is built from a plain JSON map through `Fields`, which
//! tracks the dotted path of the object for error messages and rejects keys
//! the object does not know about.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Result, SandockError};

/// Ordered key/value pairs, declaration order preserved
pub type Pairs = Vec<(String, String)>;

/// Name -> definition collection in declaration (and merge) order
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T> {
    entries: Vec<(String, T)>,
}

impl<T> Named<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add `value`, replacing an entry of the same name where it stands
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Named<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for Named<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut named = Self::new();
        for (name, value) in iter {
            named.insert(name, value);
        }
        named
    }
}

impl<T, const N: usize> From<[(String, T); N]> for Named<T> {
    fn from(entries: [(String, T); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a, T> IntoIterator for &'a Named<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = std::iter::Map<std::slice::Iter<'a, (String, T)>, fn(&'a (String, T)) -> (&'a String, &'a T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(entry_refs as fn(&'a (String, T)) -> (&'a String, &'a T))
    }
}

fn entry_refs<T>((name, value): &(String, T)) -> (&String, &T) {
    (name, value)
}

impl<T> std::ops::Index<&str> for Named<T> {
    type Output = T;

    fn index(&self, name: &str) -> &T {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no entry named `{}`", name),
        }
    }
}

pub struct Fields<'a> {
    path: String,
    map: &'a Map<String, Value>,
    seen: HashSet<&'static str>,
}

impl<'a> Fields<'a> {
    /// Wrap `value`, which must be a map (null is treated as an empty map)
    pub fn new(path: impl Into<String>, value: &'a Value) -> Result<Self> {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        let path = path.into();

        let map = match value {
            Value::Object(map) => map,
            Value::Null => EMPTY.get_or_init(Map::new),
            _ => {
                return Err(SandockError::config(format!(
                    "`{}` must be a mapping",
                    display_path(&path)
                )))
            }
        };

        Ok(Self {
            path,
            map,
            seen: HashSet::new(),
        })
    }

    /// Dotted path of a child field
    pub fn child(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn take(&mut self, key: &'static str) -> Option<&'a Value> {
        self.seen.insert(key);
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn invalid(&self, key: &str, expected: &str) -> SandockError {
        SandockError::config(format!("`{}` must be {}", self.child(key), expected))
    }

    pub fn raw(&mut self, key: &'static str) -> Option<&'a Value> {
        self.take(key)
    }

    pub fn string(&mut self, key: &'static str) -> Result<String> {
        self.opt_string(key)?
            .ok_or_else(|| SandockError::config(format!("`{}` is required", self.child(key))))
    }

    pub fn opt_string(&mut self, key: &'static str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(v) => scalar_string(v)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a string")),
        }
    }

    pub fn string_or(&mut self, key: &'static str, default: &str) -> Result<String> {
        Ok(self.opt_string(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn bool_or(&mut self, key: &'static str, default: bool) -> Result<bool> {
        match self.take(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    pub fn u32_or(&mut self, key: &'static str, default: u32) -> Result<u32> {
        match self.take(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| self.invalid(key, "a non-negative integer")),
        }
    }

    pub fn string_list(&mut self, key: &'static str) -> Result<Vec<String>> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| scalar_string(item).ok_or_else(|| self.invalid(key, "a list of strings")))
                .collect(),
            Some(_) => Err(self.invalid(key, "a list of strings")),
        }
    }

    pub fn pairs(&mut self, key: &'static str) -> Result<Pairs> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| {
                    scalar_string(v)
                        .map(|v| (k.clone(), v))
                        .ok_or_else(|| self.invalid(key, "a mapping of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(key, "a mapping of strings")),
        }
    }

    /// Parse a nested object; absent keys parse from an empty map
    pub fn object<T>(
        &mut self,
        key: &'static str,
        parse: impl FnOnce(&str, &Value) -> Result<T>,
    ) -> Result<T> {
        let path = self.child(key);
        match self.take(key) {
            Some(v) => parse(&path, v),
            None => parse(&path, &Value::Null),
        }
    }

    pub fn opt_object<T>(
        &mut self,
        key: &'static str,
        parse: impl FnOnce(&str, &Value) -> Result<T>,
    ) -> Result<Option<T>> {
        let path = self.child(key);
        self.take(key).map(|v| parse(&path, v)).transpose()
    }

    /// Parse a name -> object collection, keeping declaration order
    pub fn named<T>(
        &mut self,
        key: &'static str,
        parse: impl Fn(&str, &Value) -> Result<T>,
    ) -> Result<Named<T>> {
        let path = self.child(key);
        match self.take(key) {
            None => Ok(Named::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, v)| Ok((name.clone(), parse(&format!("{}.{}", path, name), v)?)))
                .collect(),
            Some(_) => Err(self.invalid(key, "a mapping")),
        }
    }

    /// Fail on any key that was never asked for
    pub fn finish(self) -> Result<()> {
        let mut unknown: Vec<&String> = self
            .map
            .keys()
            .filter(|k| !self.seen.contains(k.as_str()))
            .collect();
        unknown.sort();

        match unknown.first() {
            None => Ok(()),
            Some(key) => Err(SandockError::config(format!(
                "unknown field `{}`",
                self.child(key)
            ))),
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Strings pass through; numbers and booleans are rendered the way YAML users write them
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
