// Routing system for HTTP requests

use crate::class::Class;
use crate::handler::Handler;
use crate::http::Request;
use crate::logging::{debug, trace};
use crate::{Error, HttpMethod, RouteMethod, Service};
use lintel_config::Config;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Config key of the base URL every generated link starts with
pub const BASE_URL: &str = "app.base_url";

/// Produces the value of one leading route segment, such as the locale
pub type PrefixVariable = Arc<dyn Fn() -> String + Send + Sync>;

/// Routes per method, in insertion order
pub type RouteTable = BTreeMap<HttpMethod, Vec<(String, Handler)>>;

/// Result of matching the current request
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub handler: Handler,
    /// Values captured by `?` segments, left to right
    pub params: Vec<String>,
}

/// Maps the current request onto a registered handler
///
/// The route comes from a request parameter (`router.route_parameter`), so
/// `/index.php?route=/books/12` and a rewritten `/books/12` both dispatch to
/// the route `/books/?`. Prefix variables (usually the locale) occupy the
/// first segments of every route and are skipped while matching.
pub struct Router {
    config: Arc<Config>,
    request: Arc<Request>,
    segments: OnceCell<Vec<String>>,
    routes: RwLock<RouteTable>,
    prefix_variables: RwLock<Vec<PrefixVariable>>,
    sealed: AtomicBool,
}

impl Service for Router {
    const KEY: &'static str = "lintel::Router";
}

impl Router {
    pub const CONFIG_INDEX_FILE: &'static str = "router.index_file";
    pub const CONFIG_ROUTE_PARAMETER: &'static str = "router.route_parameter";
    pub const CONFIG_USE_REWRITE: &'static str = "router.use_rewrite";

    pub fn new(config: Arc<Config>, request: Arc<Request>) -> Self {
        Self {
            config,
            request,
            segments: OnceCell::new(),
            routes: RwLock::new(BTreeMap::new()),
            prefix_variables: RwLock::new(Vec::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Container descriptor: built from `Config` and `Request`
    pub fn class() -> Class<Router> {
        Class::new(Self::KEY)
            .inject(Config::KEY)
            .inject(Request::KEY)
            .construct(|args| {
                let config = args.service::<Config>()?;
                let request = args.service::<Request>()?;
                Ok(Router::new(config, request))
            })
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(Error::Sealed("router".to_string()));
        }
        Ok(())
    }

    /// Register a route; `BOTH` adds it under GET and POST
    ///
    /// A path may contain `?` segments that capture any value. Adding an
    /// existing path again replaces its handler in place.
    pub fn add(&self, path: &str, handler: Handler, method: impl Into<RouteMethod>) -> Result<(), Error> {
        self.ensure_open()?;
        let mut routes = self.routes.write();
        for method in method.into().methods() {
            let table = routes.entry(method).or_default();
            match table.iter_mut().find(|(existing, _)| existing == path) {
                Some(route) => route.1 = handler.clone(),
                None => table.push((path.to_string(), handler.clone())),
            }
            debug!(method = %method, path, handler = ?handler, "Route registered");
        }
        Ok(())
    }

    /// Append a prefix variable, returning its segment index
    pub fn add_prefix_variable<F>(&self, provider: F) -> Result<usize, Error>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let mut prefixes = self.prefix_variables.write();
        prefixes.push(Arc::new(provider));
        Ok(prefixes.len() - 1)
    }

    /// The route requested, `/` when the route parameter is absent
    pub fn current_route(&self) -> String {
        let parameter = self
            .config
            .get_string(Self::CONFIG_ROUTE_PARAMETER)
            .unwrap_or_default();
        self.request.get_or(&parameter, "/").to_string()
    }

    // Split on first use so configuration set during init is honoured
    fn segments(&self) -> &[String] {
        self.segments
            .get_or_init(|| split_segments(&self.current_route()))
    }

    /// Segment `index` of the current route, prefix segments included
    pub fn current_segment(&self, index: usize) -> Option<&str> {
        self.segments().get(index).map(String::as_str)
    }

    pub fn current_segment_or<'a>(&'a self, index: usize, default: &'a str) -> &'a str {
        self.current_segment(index).unwrap_or(default)
    }

    /// Find the handler for the current request
    pub fn match_current_route(&self) -> Option<RouteMatch> {
        let method = HttpMethod::from_str(self.request.method())?;
        let prefix_count = self.prefix_variables.read().len();
        let segments = self.segments().get(prefix_count..).unwrap_or(&[]);

        let routes = self.routes.read();
        let table = routes.get(&method)?;

        if segments.is_empty() {
            if let Some((_, handler)) = table.iter().find(|(path, _)| path == "/") {
                trace!("Matched home route");
                return Some(RouteMatch {
                    handler: handler.clone(),
                    params: Vec::new(),
                });
            }
        }

        for (path, handler) in table {
            if let Some(params) = match_segments(path, segments) {
                trace!(method = %method, path, params = ?params, "Route matched");
                return Some(RouteMatch {
                    handler: handler.clone(),
                    params,
                });
            }
        }

        trace!(method = %method, route = %self.current_route(), "No route matched");
        None
    }

    /// Build a URL for `path`
    ///
    /// With `router.use_rewrite` the result is `base_url + /prefixes + path`,
    /// otherwise `base_url + /index_file` with the prefixed path in the
    /// route parameter. `params` become the query string joined with `amp`.
    pub fn url(&self, path: Option<&str>, params: &[(&str, &str)], amp: &str) -> String {
        let prefix: String = self
            .prefix_variables
            .read()
            .iter()
            .map(|provider| format!("/{}", provider()))
            .collect();
        let path = path.filter(|path| !path.is_empty());

        let mut result = self.config.get_string(BASE_URL).unwrap_or_default();
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if self.config.get_bool(Self::CONFIG_USE_REWRITE) {
            if let Some(path) = path {
                result.push_str(&prefix);
                result.push_str(path);
            }
        } else {
            result.push('/');
            result.push_str(&self.config.get_string(Self::CONFIG_INDEX_FILE).unwrap_or_default());
            let parameter = self
                .config
                .get_string(Self::CONFIG_ROUTE_PARAMETER)
                .filter(|parameter| !parameter.is_empty());
            // Without a route parameter the path has nowhere to go
            if let (Some(path), Some(parameter)) = (path.filter(|path| *path != "/"), parameter) {
                let value = format!("{}{}", prefix, path);
                match query.iter_mut().find(|(key, _)| *key == parameter) {
                    Some(existing) => existing.1 = value,
                    None => query.push((parameter, value)),
                }
            }
        }

        if !query.is_empty() {
            let encoded: Vec<String> = query
                .iter()
                .map(|pair| serde_urlencoded::to_string([pair]).unwrap_or_default())
                .collect();
            result.push('?');
            result.push_str(&encoded.join(amp));
        }

        result.replace("%2F", "/")
    }

    /// Snapshot of the registered routes
    pub fn routes(&self) -> RouteTable {
        self.routes.read().clone()
    }

    /// Reject further route and prefix registration
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }
}

/// Split a path on `/` dropping the first element, the empty string before
/// the leading slash
fn split_segments(path: &str) -> Vec<String> {
    path.split('/').skip(1).map(str::to_string).collect()
}

fn match_segments(route: &str, current: &[String]) -> Option<Vec<String>> {
    let parts = split_segments(route);
    if parts.len() != current.len() {
        return None;
    }

    let mut params = Vec::new();
    for (part, value) in parts.iter().zip(current) {
        if part == value {
            continue;
        }
        if part == "?" {
            params.push(value.clone());
            continue;
        }
        return None;
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(route: &str, method: &str) -> Router {
        let config = Config::new();
        config.set(Router::CONFIG_ROUTE_PARAMETER, "route").unwrap();
        let request = Request::new(method).with_param("route", route);
        Router::new(Arc::new(config), Arc::new(request))
    }

    #[test]
    fn test_split_segments() {
        assert_eq!(split_segments("/books/12"), vec!["books", "12"]);
        assert_eq!(split_segments("/"), vec![""]);
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_match_segments_static() {
        let current = split_segments("/books");
        assert_eq!(match_segments("/books", &current), Some(vec![]));
        assert_eq!(match_segments("/authors", &current), None);
    }

    #[test]
    fn test_match_segments_wildcards() {
        let current = split_segments("/books/123/comments/45");
        assert_eq!(
            match_segments("/books/?/comments/?", &current),
            Some(vec!["123".to_string(), "45".to_string()])
        );
        assert_eq!(match_segments("/books/?", &current), None);
    }

    #[test]
    fn test_current_route_defaults_to_home() {
        let config = Config::new();
        let router = Router::new(Arc::new(config), Arc::new(Request::default()));
        assert_eq!(router.current_route(), "/");
    }

    #[test]
    fn test_current_segment() {
        let router = router("/en/books/12", "GET");
        assert_eq!(router.current_segment(0), Some("en"));
        assert_eq!(router.current_segment(2), Some("12"));
        assert_eq!(router.current_segment(3), None);
        assert_eq!(router.current_segment_or(3, "none"), "none");
    }

    #[test]
    fn test_first_match_in_insertion_order() {
        let router = router("/books/new", "GET");
        let wildcard = Handler::direct(|_| Ok("show"));
        let literal = Handler::direct(|_| Ok("new"));
        router.add("/books/?", wildcard.clone(), HttpMethod::GET).unwrap();
        router.add("/books/new", literal, HttpMethod::GET).unwrap();

        let found = router.match_current_route().unwrap();
        assert_eq!(found.handler, wildcard);
        assert_eq!(found.params, vec!["new"]);
    }

    #[test]
    fn test_method_mismatch() {
        let router = router("/books", "POST");
        router
            .add("/books", Handler::direct(|_| Ok("list")), HttpMethod::GET)
            .unwrap();
        assert!(router.match_current_route().is_none());
    }

    #[test]
    fn test_readd_replaces_in_place() {
        let router = router("/", "GET");
        let first = Handler::direct(|_| Ok("a"));
        let second = Handler::direct(|_| Ok("b"));
        router.add("/a", first, HttpMethod::GET).unwrap();
        router.add("/b", Handler::direct(|_| Ok("x")), HttpMethod::GET).unwrap();
        router.add("/a", second.clone(), HttpMethod::GET).unwrap();

        let routes = router.routes();
        let table = &routes[&HttpMethod::GET];
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].0, "/a");
        assert_eq!(table[0].1, second);
    }

    #[test]
    fn test_sealed_router() {
        let router = router("/", "GET");
        router.seal();
        assert!(matches!(
            router.add("/", Handler::direct(|_| Ok("")), HttpMethod::GET),
            Err(Error::Sealed(_))
        ));
        assert!(router.add_prefix_variable(|| "en".to_string()).is_err());
    }
}
