// Request builder for tests

use lintel_core::http::{APPLICATION_JSON, CONTENT_TYPE};
use lintel_core::{Error, Request};
use serde::Serialize;

/// Route parameter used by [`TestRequest`] and [`TestApp`](crate::TestApp)
pub const ROUTE_PARAMETER: &str = "route";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Builds a [`Request`] for a route
///
/// ```
/// use lintel_testing::TestRequest;
///
/// let request = TestRequest::post("/books")
///     .param("title", "Dune")
///     .header("Accept-Language", "hu")
///     .build();
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.get("route"), Some("/books"));
/// assert_eq!(request.header("accept-language"), Some("hu"));
/// ```
#[derive(Debug, Clone)]
pub struct TestRequest {
    request: Request,
}

impl TestRequest {
    pub fn new(method: &str, route: &str) -> Self {
        Self {
            request: Request::new(method).with_param(ROUTE_PARAMETER, route),
        }
    }

    pub fn get(route: &str) -> Self {
        Self::new("GET", route)
    }

    pub fn post(route: &str) -> Self {
        Self::new("POST", route)
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request = self.request.with_param(name, value);
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value);
        self
    }

    pub fn cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request = self.request.with_cookie(name, value);
        self
    }

    pub fn server(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request = self.request.with_server(name, value);
        self
    }

    /// JSON body with a matching `Content-Type`
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        self.request = self
            .request
            .with_header(CONTENT_TYPE, APPLICATION_JSON)
            .with_body(body);
        Ok(self)
    }

    /// Form-encoded body; the fields also become parameters
    pub fn form(mut self, fields: &[(&str, &str)]) -> Result<Self, Error> {
        let body = serde_urlencoded::to_string(fields)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let mut request = self
            .request
            .with_header(CONTENT_TYPE, FORM_URLENCODED)
            .with_body(body);
        for (name, value) in fields {
            request = request.with_param(*name, *value);
        }
        self.request = request;
        Ok(self)
    }

    pub fn build(self) -> Request {
        self.request
    }
}

impl From<TestRequest> for Request {
    fn from(request: TestRequest) -> Self {
        request.build()
    }
}
