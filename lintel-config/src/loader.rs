// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Ini,
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            // `config.ini.php` keeps the file unreadable when served by mistake
            "ini" | "php" => Some(FileFormat::Ini),
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Ini => "INI",
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
            FileFormat::Env => "env",
        }
    }
}

/// Configuration file loader
///
/// Every format is flattened into a single level map keyed by dotted names,
/// so `[app] base_url = "x"` in TOML and `app.base_url = "x"` in INI end up
/// under the same key.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Map<String, Value>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let value = match self.format {
            FileFormat::Ini => return Ok(parse_ini(content)),
            FileFormat::Env => return parse_env(content),
            FileFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| syntax("JSON", e))?,
            FileFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(content)
                    .map_err(|e| syntax("TOML", e))?;
                serde_json::to_value(toml_value).map_err(|e| syntax("TOML", e))?
            }
        };

        let mut flat = Map::new();
        match value {
            Value::Object(map) => flatten_into(&mut flat, None, map),
            other => {
                return Err(syntax(
                    self.format.name(),
                    format!("top level value must be a table, got: {}", other),
                ));
            }
        }
        Ok(flat)
    }
}

fn syntax(format: &'static str, message: impl ToString) -> ConfigError {
    ConfigError::Syntax {
        format,
        message: message.to_string(),
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let full_key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(&full_key), inner),
            other => {
                out.insert(full_key, other);
            }
        }
    }
}

fn parse_env(content: &str) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item.map_err(|e| syntax("env", e))?;
        map.insert(key, Value::String(value));
    }
    Ok(map)
}

/// Sectionless INI with typed scanning.
///
/// Unquoted `true/on/yes` and `false/off/no/none` become booleans, unquoted
/// integers and floats become numbers and `null` becomes null. Quoted values
/// are always strings. Section headers are ignored.
fn parse_ini(content: &str) -> Map<String, Value> {
    let mut map = Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }

        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        map.insert(key.to_string(), ini_value(raw.trim()));
    }

    map
}

fn ini_value(raw: &str) -> Value {
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            let inner = match rest.find(quote) {
                Some(end) => &rest[..end],
                None => rest,
            };
            return Value::String(inner.to_string());
        }
    }

    let raw = match raw.find(';') {
        Some(pos) => raw[..pos].trim_end(),
        None => raw,
    };

    match raw.to_lowercase().as_str() {
        "true" | "on" | "yes" => return Value::Bool(true),
        "false" | "off" | "no" | "none" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }

    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ini_typed_values() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let ini = r#"
;<?php /*
; Router
router.use_rewrite = false
router.index_file = "index.php"
mailer.debug_level = 0
mailer.smtp_auth = on
app.ratio = 0.5 ; trailing comment
log.level = "error"
;*/
"#;

        let map = loader.parse(ini).unwrap();
        assert_eq!(map.get("router.use_rewrite"), Some(&Value::Bool(false)));
        assert_eq!(map.get("router.index_file"), Some(&Value::from("index.php")));
        assert_eq!(map.get("mailer.debug_level"), Some(&Value::from(0)));
        assert_eq!(map.get("mailer.smtp_auth"), Some(&Value::Bool(true)));
        assert_eq!(map.get("app.ratio"), Some(&Value::from(0.5)));
        assert_eq!(map.get("log.level"), Some(&Value::from("error")));
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn test_quoted_booleans_stay_strings() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let map = loader.parse("flag = \"true\"").unwrap();
        assert_eq!(map.get("flag"), Some(&Value::from("true")));
    }

    #[test]
    fn test_parse_toml_is_flattened() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [app]
            base_url = "http://localhost"

            [router]
            use_rewrite = true
        "#;

        let map = loader.parse(toml).unwrap();
        assert_eq!(map.get("app.base_url"), Some(&Value::from("http://localhost")));
        assert_eq!(map.get("router.use_rewrite"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_parse_json_is_flattened() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let map = loader
            .parse(r#"{"app": {"environment": "dev"}, "port": 8080}"#)
            .unwrap();
        assert_eq!(map.get("app.environment"), Some(&Value::from("dev")));
        assert_eq!(map.get("port"), Some(&Value::from(8080)));
    }

    #[test]
    fn test_parse_json_rejects_scalar_root() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(loader.parse("42").is_err());
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let map = loader.parse("# comment\nAPP_NAME=lintel\n").unwrap();
        assert_eq!(map.get("APP_NAME"), Some(&Value::from("lintel")));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("ini"), Some(FileFormat::Ini));
        assert_eq!(FileFormat::from_extension("PHP"), Some(FileFormat::Ini));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_auto_detects_compound_extension() {
        let loader = ConfigLoader::auto("example/config.ini.php").unwrap();
        assert_eq!(loader.format(), FileFormat::Ini);
        assert!(ConfigLoader::auto("Makefile").is_err());
    }
}
