//! Testing utilities for Lintel applications.
//!
//! - [`TestRequest`] builds requests for a route
//! - [`TestApp`] runs an application per request with configuration
//!   overrides and a [`RecordingLogger`]
//! - [`RecordingMiddleware`] records middleware runs
//! - `assert_*` helpers check finished responses
//!
//! ## Quick Start
//!
//! ```
//! use lintel_core::{Content, Handler, HttpMethod, WebApp};
//! use lintel_testing::*;
//! use serde_json::json;
//!
//! let app = TestApp::new(|app: &WebApp| {
//!     app.router()?.add(
//!         "/api/books/?",
//!         Handler::direct(|args| Content::json(&json!({ "id": args[0] }))),
//!         HttpMethod::GET,
//!     )
//! });
//!
//! let response = app.handle(TestRequest::get("/api/books/7")).unwrap();
//! assert_status(&response, 200);
//! assert_header(&response, "Content-Type", "application/json");
//! assert_json(&response, &json!({ "id": "7" }));
//! assert!(app.logger().errors().is_empty());
//! ```

mod assertions;
mod mock;
mod test_app;
mod test_request;

pub use assertions::{assert_body, assert_body_contains, assert_header, assert_json, assert_status};
pub use mock::{CallLog, RecordingLogger, RecordingMiddleware};
pub use test_app::TestApp;
pub use test_request::{ROUTE_PARAMETER, TestRequest};
