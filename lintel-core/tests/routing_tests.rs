use lintel_core::routing::BASE_URL;
use lintel_core::{Config, Handler, HttpMethod, Request, RouteMethod, Router};
use std::sync::Arc;

fn config(rewrite: bool) -> Config {
    let config = Config::new();
    config.set(Router::CONFIG_ROUTE_PARAMETER, "route").unwrap();
    config.set(Router::CONFIG_INDEX_FILE, "index.php").unwrap();
    config.set(Router::CONFIG_USE_REWRITE, rewrite).unwrap();
    config.set(BASE_URL, "http://example.com").unwrap();
    config
}

fn router_for(route: &str, method: &str, rewrite: bool) -> Router {
    let request = Request::new(method).with_param("route", route);
    Router::new(Arc::new(config(rewrite)), Arc::new(request))
}

#[test]
fn test_static_route() {
    let router = router_for("/hello", "GET", true);
    let handler = Handler::direct(|_| Ok("Hello, World!"));
    router.add("/hello", handler.clone(), HttpMethod::GET).unwrap();

    let found = router.match_current_route().unwrap();
    assert_eq!(found.handler, handler);
    assert!(found.params.is_empty());
}

#[test]
fn test_wildcard_captures_in_order() {
    let router = router_for("/books/12/comments/7", "GET", true);
    router
        .add("/books/?/comments/?", Handler::bound("app::Comments", "show"), HttpMethod::GET)
        .unwrap();

    let found = router.match_current_route().unwrap();
    assert_eq!(found.handler, Handler::bound("app::Comments", "show"));
    assert_eq!(found.params, vec!["12", "7"]);
}

#[test]
fn test_home_route_without_segments() {
    let router = router_for("/en", "GET", true);
    router.add_prefix_variable(|| "en".to_string()).unwrap();
    let home = Handler::direct(|_| Ok("home"));
    router.add("/", home.clone(), HttpMethod::GET).unwrap();

    let found = router.match_current_route().unwrap();
    assert_eq!(found.handler, home);
}

#[test]
fn test_prefix_segments_are_skipped() {
    let router = router_for("/fr/books/3", "GET", true);
    assert_eq!(router.add_prefix_variable(|| "fr".to_string()).unwrap(), 0);
    router
        .add("/books/?", Handler::bound("app::Books", "show"), HttpMethod::GET)
        .unwrap();

    let found = router.match_current_route().unwrap();
    assert_eq!(found.params, vec!["3"]);
    assert_eq!(router.current_segment(0), Some("fr"));
}

#[test]
fn test_both_registers_get_and_post() {
    let handler = Handler::direct(|_| Ok("form"));
    let router = router_for("/contact", "POST", true);
    router
        .add("/contact", handler.clone(), "BOTH".parse::<RouteMethod>().unwrap())
        .unwrap();

    let routes = router.routes();
    assert_eq!(routes[&HttpMethod::GET][0].1, handler);
    assert_eq!(routes[&HttpMethod::POST][0].1, handler);
    assert_eq!(router.match_current_route().unwrap().handler, handler);
}

#[test]
fn test_unknown_method_matches_nothing() {
    let router = router_for("/", "BREW", true);
    router
        .add("/", Handler::direct(|_| Ok("home")), RouteMethod::Both)
        .unwrap();
    assert!(router.match_current_route().is_none());
}

#[test]
fn test_url_with_rewrite() {
    let router = router_for("/", "GET", true);
    router.add_prefix_variable(|| "en".to_string()).unwrap();
    router.add_prefix_variable(|| "eu".to_string()).unwrap();

    assert_eq!(router.url(Some("/books"), &[], "&"), "http://example.com/en/eu/books");
    assert_eq!(
        router.url(Some("/books"), &[("page", "2"), ("sort", "title")], "&amp;"),
        "http://example.com/en/eu/books?page=2&amp;sort=title"
    );
    assert_eq!(router.url(None, &[], "&"), "http://example.com");
}

#[test]
fn test_url_without_rewrite() {
    let router = router_for("/", "GET", false);
    router.add_prefix_variable(|| "en".to_string()).unwrap();

    assert_eq!(
        router.url(Some("/books/12"), &[], "&"),
        "http://example.com/index.php?route=/en/books/12"
    );
    assert_eq!(
        router.url(Some("/books"), &[("q", "dune")], "&"),
        "http://example.com/index.php?q=dune&route=/en/books"
    );
    assert_eq!(router.url(Some("/"), &[], "&"), "http://example.com/index.php");
}

#[test]
fn test_url_with_empty_config() {
    let router = Router::new(Arc::new(Config::new()), Arc::new(Request::default()));
    assert_eq!(router.url(Some("/books"), &[], "&"), "/");
    assert_eq!(router.url(Some("/books"), &[("page", "2")], "&"), "/?page=2");
}
