// In-memory session store

use crate::{Error, Service};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Per-request session values
///
/// Lives as long as the container that owns it. Persisting sessions across
/// requests is left to the serving front.
#[derive(Debug, Default)]
pub struct Session {
    data: RwLock<HashMap<String, Value>>,
}

impl Service for Session {
    const KEY: &'static str = "lintel::Session";
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of `name`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.data.read().get(name).cloned()
    }

    /// Value of `name` deserialized into `T`; `None` when missing or mistyped
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set<T: Serialize>(&self, name: &str, value: T) -> Result<(), Error> {
        let value = serde_json::to_value(value)?;
        self.data.write().insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.data.write().remove(name)
    }

    /// Drop every value
    pub fn destroy(&self) {
        self.data.write().clear();
    }
}
