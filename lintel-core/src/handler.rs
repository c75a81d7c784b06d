// Route handlers and the content they produce

use crate::Error;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A materialised handler: receives the captured wildcard segments
pub type HandlerFn = Arc<dyn Fn(&[String]) -> Result<Content, Error> + Send + Sync>;

/// What a handler returned
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Sent as `text/html; charset=UTF-8`
    Html(String),
    /// Sent as `application/json`; only objects and arrays are kept
    Json(Value),
    /// Redirect to a route path or an absolute `http` URL
    Redirect(String),
    /// Nothing to send
    Empty,
}

impl Content {
    /// Serialize `value` as JSON content
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(serde_json::to_value(value)?.into_content())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Content::Html(body.into())
    }
}

/// Conversion of handler return values into [`Content`]
pub trait IntoContent {
    fn into_content(self) -> Content;
}

impl IntoContent for Content {
    fn into_content(self) -> Content {
        self
    }
}

impl IntoContent for String {
    fn into_content(self) -> Content {
        Content::Html(self)
    }
}

impl IntoContent for &str {
    fn into_content(self) -> Content {
        Content::Html(self.to_string())
    }
}

impl IntoContent for () {
    fn into_content(self) -> Content {
        Content::Empty
    }
}

impl IntoContent for Value {
    fn into_content(self) -> Content {
        match self {
            Value::String(s) => Content::Html(s),
            value @ (Value::Object(_) | Value::Array(_)) => Content::Json(value),
            _ => Content::Empty,
        }
    }
}

impl IntoContent for Map<String, Value> {
    fn into_content(self) -> Content {
        Content::Json(Value::Object(self))
    }
}

impl IntoContent for Vec<Value> {
    fn into_content(self) -> Content {
        Content::Json(Value::Array(self))
    }
}

impl<T: IntoContent> IntoContent for Option<T> {
    fn into_content(self) -> Content {
        match self {
            Some(inner) => inner.into_content(),
            None => Content::Empty,
        }
    }
}

/// A route or event handler
///
/// `Direct` holds a ready closure. `Bound` names a service and one of its
/// described methods; it is materialised through the container only when
/// invoked, so the owning service is constructed lazily.
#[derive(Clone)]
pub enum Handler {
    Direct(HandlerFn),
    Bound { service: String, method: String },
}

impl Handler {
    /// Wrap a closure returning anything convertible into [`Content`]
    pub fn direct<F, C>(f: F) -> Self
    where
        F: Fn(&[String]) -> Result<C, Error> + Send + Sync + 'static,
        C: IntoContent,
    {
        Handler::Direct(Arc::new(move |args: &[String]| Ok(f(args)?.into_content())))
    }

    pub fn bound(service: impl Into<String>, method: impl Into<String>) -> Self {
        Handler::Bound {
            service: service.into(),
            method: method.into(),
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handler::Direct(a), Handler::Direct(b)) => Arc::ptr_eq(a, b),
            (
                Handler::Bound { service, method },
                Handler::Bound {
                    service: other_service,
                    method: other_method,
                },
            ) => service == other_service && method == other_method,
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Direct(func) => write!(f, "Direct({:p})", Arc::as_ptr(func)),
            Handler::Bound { service, method } => write!(f, "Bound({}::{})", service, method),
        }
    }
}
