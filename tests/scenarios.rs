//! End-to-end request scenarios through the public facade.

use lintel::prelude::*;
use lintel::routing::BASE_URL;
use lintel_testing::{
    TestApp, TestRequest, assert_body, assert_header, assert_json, assert_status,
};
use parking_lot::Mutex;
use serde_json::json;
use std::fs;
use std::sync::Arc;

#[test]
fn test_basic_dispatch() {
    let app = TestApp::new(|app: &WebApp| {
        app.router()?
            .add("/hello", Handler::direct(|_| Ok("Hello, World!")), HttpMethod::GET)
    });

    let response = app.get("/hello").unwrap();
    assert_status(&response, 200);
    assert_header(&response, "Content-Type", "text/html; charset=UTF-8");
    assert_body(&response, "Hello, World!");

    assert_status(&app.post("/hello").unwrap(), 404);
    assert!(app.logger().errors().is_empty());
}

#[test]
fn test_wildcard_capture() {
    let app = TestApp::new(|app: &WebApp| {
        app.router()?.add(
            "/books/?/comments/?",
            Handler::direct(|args| Content::json(&json!({ "book": args[0], "comment": args[1] }))),
            HttpMethod::GET,
        )
    });

    let response = app.get("/books/12/comments/7").unwrap();
    assert_status(&response, 200);
    assert_json(&response, &json!({ "book": "12", "comment": "7" }));
    assert_status(&app.get("/books/12/comments").unwrap(), 404);
}

#[test]
fn test_prefix_variable() {
    let links = Arc::new(Mutex::new(Vec::new()));
    let seen = links.clone();
    let app = TestApp::new(move |app: &WebApp| {
        let router = app.router()?;
        router.add_prefix_variable(|| "en".to_string())?;
        let url_router = router.clone();
        let seen = seen.clone();
        router.add(
            "/books/?",
            Handler::direct(move |args| {
                seen.lock().push(url_router.url(Some("/books/1"), &[], "&"));
                Ok(format!("book {}", args[0]))
            }),
            HttpMethod::GET,
        )
    })
    .config(BASE_URL, "http://example.com")
    .config(Router::CONFIG_USE_REWRITE, true);

    let response = app.get("/en/books/3").unwrap();
    assert_status(&response, 200);
    assert_body(&response, "book 3");
    assert_eq!(*links.lock(), vec!["http://example.com/en/books/1"]);
}

#[test]
fn test_cycle_detection_goes_through_the_error_funnel() {
    struct Node;

    let app = TestApp::new(|app: &WebApp| {
        for (key, dependency) in [("app::A", "app::B"), ("app::B", "app::A")] {
            app.provide(
                Class::<Node>::new(key)
                    .inject(dependency)
                    .construct(|_| Ok(Node))
                    .method("show", |_, _| Ok(Content::Empty))
                    .build(),
            )?;
        }
        app.router()?
            .add("/", Handler::bound("app::A", "show"), HttpMethod::GET)
    });

    let response = app.get("/").unwrap();
    assert_status(&response, 500);

    let errors = app.logger().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("`CycleError` in Bound(app::A::show)"));
    assert!(errors[0].contains("app::A"));
    assert!(errors[0].contains("app::B"));
}

#[test]
fn test_annotated_route_uses_the_container_instance() {
    struct Books;

    let dispatched = Arc::new(Mutex::new(None::<usize>));
    let record = dispatched.clone();
    let app = TestApp::new(move |app: &WebApp| {
        let record = record.clone();
        app.provide(
            Class::<Books>::new("app::Books")
                .construct(|_| Ok(Books))
                .method_doc(
                    "show",
                    "/**\n * Show one book\n * @route GET /books/?\n */",
                    move |books, args| {
                        *record.lock() = Some(books as *const Books as usize);
                        Content::json(&json!({ "id": args[0] }))
                    },
                )
                .build(),
        )?;
        app.add_annotation(lintel::RouteAnnotation::KEY)
    });

    let web_app = app.process(TestRequest::get("/books/42")).unwrap();
    let response = web_app.finished().unwrap();
    assert_status(&response, 200);
    assert_json(&response, &json!({ "id": "42" }));

    let books = web_app.container().get::<Books>("app::Books").unwrap();
    assert_eq!(*dispatched.lock(), Some(Arc::as_ptr(&books) as usize));
}

#[test]
fn test_error_envelope() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("errors")).unwrap();
    fs::write(
        dir.path().join("errors/500.html"),
        "<html><body><!-- content --></body></html>",
    )
    .unwrap();

    let app = TestApp::new(|app: &WebApp| {
        app.router()?.add(
            "/fail",
            Handler::direct(|_| Err::<Content, _>(Error::Internal("database is gone".to_string()))),
            HttpMethod::GET,
        )
    })
    .config("app.root_path", dir.path().to_str().unwrap())
    .config(WebApp::CONFIG_ERROR_PAGES_FOLDER, "~/errors")
    .config(WebApp::CONFIG_ENVIRONMENT, "prod");

    let response = app.get("/fail").unwrap();
    assert_status(&response, 500);
    assert_body(&response, "<html><body></body></html>");

    let errors = app.logger().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("database is gone"));
}
