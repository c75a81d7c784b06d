//! Translations for Lintel applications
//!
//! - [`Translation`]: per-namespace INI message files, one per locale, with
//!   `{name}` placeholders.
//! - [`LocaleResolver`]: middleware choosing the request locale from the
//!   `Accept-Language` header and a locale route prefix.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lintel_i18n::{LocaleResolver, Translation, register};
//!
//! // in Application::init
//! register(app)?;
//! app.container().service::<Translation>()?.add("app", "~/translations");
//!
//! // later, with `~/translations/en.ini` containing `welcome = "Hello {name}!"`
//! translation.get("app:welcome", &[("name", "Joe")]);  // "Hello Joe!"
//! ```

mod error;
mod messages;
mod resolver;
mod translation;

pub use error::I18nError;
pub use messages::{MessageBundle, interpolate};
pub use resolver::LocaleResolver;
pub use translation::Translation;

use lintel_core::{Service, WebApp};

/// Result type for translation loading
pub type Result<T> = std::result::Result<T, I18nError>;

/// Provide the translation service and add the locale resolver middleware
pub fn register(app: &WebApp) -> std::result::Result<(), lintel_core::Error> {
    app.provide(Translation::class().build())?;
    app.provide(LocaleResolver::class().build())?;
    app.add_middleware(LocaleResolver::KEY)
}
