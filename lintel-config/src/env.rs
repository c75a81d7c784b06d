// Environment variable lookups and `{{VAR}}` substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::env;

static ENV_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder regex"));

/// Environment variable loader
pub struct EnvLoader;

impl EnvLoader {
    /// Value of an environment variable named exactly like the config key
    pub fn lookup(key: &str) -> Option<String> {
        env::var(key).ok()
    }

    /// Names of all environment variables
    pub fn keys() -> Vec<String> {
        env::vars().map(|(key, _)| key).collect()
    }

    /// Replaces every `{{NAME}}` in `value` with the value of the `NAME`
    /// environment variable; unset variables become empty strings.
    pub fn substitute(value: &str) -> String {
        if !value.contains("{{") {
            return value.to_string();
        }
        ENV_PLACEHOLDER
            .replace_all(value, |caps: &Captures<'_>| {
                env::var(&caps[1]).unwrap_or_default()
            })
            .into_owned()
    }
}
