// Configuration management for the Lintel framework

pub mod env;
pub mod error;
pub mod loader;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Config key holding the filesystem root substituted for `~`
pub const ROOT_PATH: &str = "app.root_path";

/// Application configuration
///
/// Values come from the loaded files (later files override earlier ones),
/// but an environment variable named exactly like a key always wins. String
/// values have their `{{VAR}}` placeholders replaced by environment values.
/// Resolved values are cached per key.
#[derive(Clone, Default)]
pub struct Config {
    values: Arc<RwLock<HashMap<String, Value>>>,
    cached: Arc<RwLock<HashMap<String, Value>>>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file, detecting the format from its extension
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        self.merge(loader.load_file(path)?);
        debug!(path = %path.display(), "Configuration file loaded");
        Ok(())
    }

    /// Load a configuration file with an explicit format
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let loader = ConfigLoader::new(format);
        self.merge(loader.load_file(path)?);
        Ok(())
    }

    /// Load configuration from a string
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let loader = ConfigLoader::new(format);
        self.merge(loader.parse(content)?);
        Ok(())
    }

    fn merge(&self, data: Map<String, Value>) {
        let mut values = self.values.write();
        let mut cached = self.cached.write();
        for (key, value) in data {
            cached.remove(&key);
            values.insert(key, value);
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| ConfigError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        self.cached.write().remove(key);
        self.values.write().insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value, caching the resolved result
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.cached.read().get(name) {
            return Some(value.clone());
        }
        let value = self.get_uncached(name)?;
        self.cached.write().insert(name.to_string(), value.clone());
        Some(value)
    }

    /// Get a configuration value without touching the cache
    pub fn get_uncached(&self, name: &str) -> Option<Value> {
        if let Some(value) = EnvLoader::lookup(name) {
            return Some(Value::String(value));
        }
        let value = self.values.read().get(name).cloned()?;
        Some(match value {
            Value::String(s) => Value::String(EnvLoader::substitute(&s)),
            other => other,
        })
    }

    /// Get a configuration value deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::Deserialization {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Get a scalar value rendered as a string
    ///
    /// Numbers are formatted, `true` becomes `"1"`, `false` and null become
    /// the empty string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| scalar_to_string(&value))
    }

    /// Get a string value or `default`
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// Loose truthiness of a value; missing keys are false
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
        }
    }

    /// Get an integer value
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Split a comma separated value into trimmed items
    ///
    /// `"hu, en"` becomes `["hu", "en"]`. A missing key yields an empty list.
    pub fn get_comma_separated_values(&self, name: &str) -> Vec<String> {
        let Some(raw) = self.get_string(name) else {
            return Vec::new();
        };
        raw.split(',')
            .map(|item| EnvLoader::substitute(item.trim()))
            .collect()
    }

    /// Collect every key below `prefix` into a nested object
    ///
    /// With `persons.0.name = "a"` and `persons.1.name = "b"`,
    /// `get_array("persons")` returns `{"0": {"name": "a"}, "1": {"name": "b"}}`.
    pub fn get_array(&self, prefix: &str) -> Value {
        if let Some(value) = self.cached.read().get(prefix) {
            if value.is_object() {
                return value.clone();
            }
        }

        let dotted = format!("{}.", prefix);
        let mut keys: Vec<String> = self
            .values
            .read()
            .keys()
            .filter(|key| key.starts_with(&dotted))
            .cloned()
            .collect();
        keys.extend(
            EnvLoader::keys()
                .into_iter()
                .filter(|key| key.starts_with(&dotted)),
        );
        keys.sort();
        keys.dedup();

        let mut result = Map::new();
        for key in keys {
            let Some(value) = self.get_uncached(&key) else {
                continue;
            };
            let mut current = &mut result;
            let parts: Vec<&str> = key[dotted.len()..].split('.').collect();
            let (last, parents) = match parts.split_last() {
                Some(split) => split,
                None => continue,
            };
            for part in parents {
                let entry = current
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                current = match entry {
                    Value::Object(map) => map,
                    _ => unreachable!("entry was just made an object"),
                };
            }
            current.insert(last.to_string(), value);
        }

        let result = Value::Object(result);
        self.cached.write().insert(prefix.to_string(), result.clone());
        result
    }

    /// Whether a resolved value for `name` is in the cache
    pub fn is_cached(&self, name: &str) -> bool {
        self.cached.read().contains_key(name)
    }

    /// Replace `~` in `path` with the `app.root_path` value
    pub fn get_full_path(&self, path: &str) -> String {
        let root = self.get_string(ROOT_PATH).unwrap_or_default();
        path.replace('~', &root)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        EnvLoader::lookup(key).is_some() || self.values.read().contains_key(key)
    }

    /// Get all loaded configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
