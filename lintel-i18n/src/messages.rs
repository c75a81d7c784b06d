//! Message files
//!
//! One namespace folder holds one `<locale>.ini` file per locale, each a
//! flat list of `id = "text"` lines.

use crate::Result;
use lintel_config::{ConfigLoader, FileFormat};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// The messages of one namespace in one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBundle {
    messages: HashMap<String, String>,
}

impl MessageBundle {
    /// Create a new empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an INI message file; a missing file is an empty bundle.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let values = ConfigLoader::new(FileFormat::Ini).load_file(path)?;
        Ok(Self::from_values(values))
    }

    /// Parse INI message content.
    pub fn parse(content: &str) -> Result<Self> {
        let values = ConfigLoader::new(FileFormat::Ini).parse(content)?;
        Ok(Self::from_values(values))
    }

    fn from_values(values: serde_json::Map<String, Value>) -> Self {
        let messages = values
            .into_iter()
            .map(|(id, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Bool(true) => "1".to_string(),
                    Value::Bool(false) | Value::Null => String::new(),
                    other => other.to_string(),
                };
                (id, text)
            })
            .collect();
        Self { messages }
    }

    /// Add a message.
    pub fn add(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(id.into(), message.into());
    }

    /// Get a message.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.messages.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Replace every `{name}` in `text` with its value.
pub fn interpolate(text: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(text.to_string(), |result, (name, value)| {
            result.replace(&format!("{{{}}}", name), value)
        })
}
