//! Locale selection middleware

use crate::Translation;
use lintel_core::{Class, Container, Error, Middleware, Request, Router, Service};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Picks the request locale when more than one locale is configured
///
/// Installs a router prefix variable producing the current locale, then
/// takes the locale from the `Accept-Language` header (its first two
/// letters) and finally from the locale segment of the route.
pub struct LocaleResolver {
    request: Arc<Request>,
    router: Arc<Router>,
    translation: Arc<Translation>,
    segment: Mutex<Option<usize>>,
}

impl Service for LocaleResolver {
    const KEY: &'static str = "lintel::LocaleResolver";
}

impl LocaleResolver {
    pub fn new(request: Arc<Request>, router: Arc<Router>, translation: Arc<Translation>) -> Self {
        Self {
            request,
            router,
            translation,
            segment: Mutex::new(None),
        }
    }

    pub fn class() -> Class<LocaleResolver> {
        Class::new(Self::KEY)
            .inject(Request::KEY)
            .inject(Router::KEY)
            .inject(Translation::KEY)
            .implements(<dyn Middleware>::KEY, |resolver| resolver as Arc<dyn Middleware>)
            .construct(|args| {
                Ok(LocaleResolver::new(
                    args.service::<Request>()?,
                    args.service::<Router>()?,
                    args.service::<Translation>()?,
                ))
            })
    }

    /// Index of the locale segment, once installed
    pub fn segment(&self) -> Option<usize> {
        *self.segment.lock()
    }

    fn is_known(&self, locale: &str) -> bool {
        self.translation.all_locales().iter().any(|known| known == locale)
    }

    pub fn set_locale_via_accept_language(&self) {
        let header = self
            .request
            .header("accept-language")
            .or_else(|| self.request.server("HTTP_ACCEPT_LANGUAGE"));
        let Some(header) = header else {
            return;
        };
        let locale: String = header.chars().take(2).collect::<String>().to_lowercase();
        if self.is_known(&locale) {
            debug!(locale = %locale, "Locale from Accept-Language");
            self.translation.set_locale(locale);
        }
    }

    pub fn set_locale_via_parameter(&self) {
        let Some(index) = self.segment() else {
            return;
        };
        if let Some(locale) = self.router.current_segment(index) {
            if self.is_known(locale) {
                debug!(locale, "Locale from route");
                self.translation.set_locale(locale);
            }
        }
    }
}

impl Middleware for LocaleResolver {
    fn run(&self, _container: &Container) -> Result<(), Error> {
        if !self.translation.has_multi_locales() {
            return Ok(());
        }
        let translation = self.translation.clone();
        let index = self
            .router
            .add_prefix_variable(move || translation.locale())?;
        *self.segment.lock() = Some(index);

        self.set_locale_via_accept_language();
        self.set_locale_via_parameter();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::{Config, Handler, HttpMethod};

    fn resolver(locales: &str, request: Request) -> (LocaleResolver, Arc<Router>) {
        let config = Config::new();
        config.set(Router::CONFIG_ROUTE_PARAMETER, "route").unwrap();
        config.set(Router::CONFIG_USE_REWRITE, true).unwrap();
        config.set(Translation::CONFIG_ALL, locales).unwrap();
        let config = Arc::new(config);
        let request = Arc::new(request);
        let router = Arc::new(Router::new(config.clone(), request.clone()));
        let translation = Arc::new(Translation::new(&config));
        (LocaleResolver::new(request, router.clone(), translation), router)
    }

    #[test]
    fn test_single_locale_is_a_no_op() {
        let (resolver, router) = resolver("en", Request::default());
        resolver.run(&Container::new()).unwrap();
        assert_eq!(resolver.segment(), None);
        assert_eq!(router.url(Some("/books"), &[], "&"), "/books");
    }

    #[test]
    fn test_accept_language() {
        let request = Request::default().with_header("Accept-Language", "HU-hu,en;q=0.8");
        let (resolver, router) = resolver("en, hu", request);
        resolver.run(&Container::new()).unwrap();

        assert_eq!(resolver.translation.locale(), "hu");
        assert_eq!(router.url(Some("/books"), &[], "&"), "/hu/books");
    }

    #[test]
    fn test_route_segment_wins() {
        let request = Request::new("GET")
            .with_header("Accept-Language", "hu")
            .with_param("route", "/en/books");
        let (resolver, router) = resolver("en, hu", request);
        router
            .add("/books", Handler::direct(|_| Ok("books")), HttpMethod::GET)
            .unwrap();
        resolver.run(&Container::new()).unwrap();

        assert_eq!(resolver.segment(), Some(0));
        assert_eq!(resolver.translation.locale(), "en");
        assert!(router.match_current_route().is_some());
    }

    #[test]
    fn test_unknown_locales_are_ignored() {
        let request = Request::new("GET")
            .with_header("Accept-Language", "de-DE")
            .with_param("route", "/fr/books");
        let (resolver, _) = resolver("en, hu", request);
        resolver.run(&Container::new()).unwrap();
        assert_eq!(resolver.translation.locale(), "en");
    }
}
