//! The translation service

use crate::messages::{MessageBundle, interpolate};
use crate::{I18nError, Result};
use lintel_config::{Config, ROOT_PATH};
use lintel_core::{Class, Service};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Static text translations for the current locale
///
/// Related configuration values:
///
/// - `app.root_path` replaces `~` in the folder paths
/// - `translation.all` lists the known locales, like `"hu, en"`
/// - `translation.default` is the locale used until one is set
///
/// ```
/// use lintel_config::Config;
/// use lintel_i18n::Translation;
///
/// let translation = Translation::new(&Config::new());
/// assert_eq!(translation.locale(), "en");
/// assert_eq!(translation.get("app:welcome", &[]), "#app:welcome#");
/// ```
pub struct Translation {
    root_path: String,
    all_locales: Vec<String>,
    locale: RwLock<String>,
    folders: RwLock<HashMap<String, String>>,
    bundles: RwLock<HashMap<(String, String), Arc<MessageBundle>>>,
}

impl Service for Translation {
    const KEY: &'static str = "lintel::Translation";
}

impl Translation {
    pub const CONFIG_ALL: &'static str = "translation.all";
    pub const CONFIG_DEFAULT: &'static str = "translation.default";
    pub const DEFAULT_LOCALE: &'static str = "en";

    pub fn new(config: &Config) -> Self {
        let all_locales: Vec<String> = config
            .get_comma_separated_values(Self::CONFIG_ALL)
            .into_iter()
            .filter(|locale| !locale.is_empty())
            .collect();
        Self {
            root_path: config.get_string(ROOT_PATH).unwrap_or_default(),
            all_locales,
            locale: RwLock::new(config.get_string_or(Self::CONFIG_DEFAULT, Self::DEFAULT_LOCALE)),
            folders: RwLock::new(HashMap::new()),
            bundles: RwLock::new(HashMap::new()),
        }
    }

    /// Container descriptor: built from `Config`
    pub fn class() -> Class<Translation> {
        Class::new(Self::KEY)
            .inject(Config::KEY)
            .construct(|args| Ok(Translation::new(&*args.service::<Config>()?)))
    }

    /// Add the message folder of a namespace; `~` stands for `app.root_path`
    pub fn add(&self, namespace: impl Into<String>, folder: impl Into<String>) {
        let namespace = namespace.into();
        self.bundles
            .write()
            .retain(|(loaded, _), _| *loaded != namespace);
        self.folders.write().insert(namespace, folder.into());
    }

    pub fn all_locales(&self) -> &[String] {
        &self.all_locales
    }

    pub fn has_multi_locales(&self) -> bool {
        self.all_locales.len() > 1
    }

    pub fn locale(&self) -> String {
        self.locale.read().clone()
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        let locale = locale.into();
        debug!(locale = %locale, "Locale set");
        *self.locale.write() = locale;
    }

    /// Text for `namespace:id` in the current locale with `{name}`
    /// placeholders replaced
    ///
    /// Unknown namespaces and ids give `#namespace:id#`.
    pub fn get(&self, id: &str, params: &[(&str, &str)]) -> String {
        let text = match self.lookup(id) {
            Ok(Some(text)) => text,
            Ok(None) => format!("#{}#", id),
            Err(err) => {
                warn!(id, error = %err, "Translation lookup failed");
                format!("#{}#", id)
            }
        };
        interpolate(&text, params)
    }

    /// Text for `namespace:id` in the current locale, without substitution
    pub fn lookup(&self, id: &str) -> Result<Option<String>> {
        let (namespace, name) = id
            .split_once(':')
            .ok_or_else(|| I18nError::InvalidId(id.to_string()))?;
        if !self.folders.read().contains_key(namespace) {
            return Ok(None);
        }
        let bundle = self.bundle(namespace, &self.locale())?;
        Ok(bundle.get(name).map(str::to_string))
    }

    /// Messages of `namespace` in `locale`, loaded on first use
    pub fn bundle(&self, namespace: &str, locale: &str) -> Result<Arc<MessageBundle>> {
        let key = (namespace.to_string(), locale.to_string());
        if let Some(bundle) = self.bundles.read().get(&key) {
            return Ok(bundle.clone());
        }

        let folder = self
            .folders
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| I18nError::UnknownNamespace(namespace.to_string()))?;
        let path = format!("{}/{}.ini", folder, locale).replace('~', &self.root_path);
        let bundle = Arc::new(MessageBundle::load(&path)?);
        debug!(namespace, locale, path = %path, messages = bundle.len(), "Translations loaded");

        self.bundles.write().insert(key, bundle.clone());
        Ok(bundle)
    }
}
