//! Environment variable schema and values.
//!
//! Both keep insertion order: the catalog lists variables in the order the
//! form should present them, and the environment file is written in that
//! same order.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvVarKind {
    #[default]
    String,
    Password,
    Boolean,
}

/// Description of one variable the installer must collect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSpec {
    #[serde(rename = "type", default)]
    pub kind: EnvVarKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Pre-filled value offered before anything has been saved.
    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl EnvVarSpec {
    pub fn of_kind(kind: EnvVarKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

/// Ordered mapping of variable name to [`EnvVarSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSchema {
    entries: Vec<(String, EnvVarSpec)>,
}

impl EnvSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, spec: EnvVarSpec) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = spec,
            None => self.entries.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EnvVarSpec> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvVarSpec)> {
        self.entries.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schema defaults as values, in schema order; missing defaults are empty.
    pub fn default_values(&self) -> EnvValues {
        self.entries
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    spec.default_value.clone().unwrap_or_default(),
                )
            })
            .collect()
    }
}

impl Serialize for EnvSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, spec) in &self.entries {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = EnvSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of environment variable names to descriptions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EnvSchema, A::Error> {
                let mut schema = EnvSchema::new();
                while let Some((name, spec)) = access.next_entry::<String, EnvVarSpec>()? {
                    schema.insert(name, spec);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// Ordered `KEY -> VALUE` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvValues {
    entries: Vec<(String, String)>,
}

impl EnvValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = EnvValues::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}
