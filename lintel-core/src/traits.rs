// Core traits and shared enums

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// A type with a well-known service key
///
/// Implemented for the framework's own services and interfaces so callers
/// can write `container.service::<Router>()` instead of spelling the key.
pub trait Service {
    const KEY: &'static str;
}

impl Service for lintel_config::Config {
    const KEY: &'static str = "lintel::Config";
}

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method a route is registered under
///
/// `Both` is registration shorthand for GET and POST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteMethod {
    One(HttpMethod),
    Both,
}

impl RouteMethod {
    /// The concrete methods this registration expands to
    pub fn methods(&self) -> Vec<HttpMethod> {
        match self {
            RouteMethod::One(method) => vec![*method],
            RouteMethod::Both => vec![HttpMethod::GET, HttpMethod::POST],
        }
    }
}

impl From<HttpMethod> for RouteMethod {
    fn from(method: HttpMethod) -> Self {
        RouteMethod::One(method)
    }
}

impl FromStr for RouteMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("BOTH") {
            return Ok(RouteMethod::Both);
        }
        HttpMethod::from_str(s)
            .map(RouteMethod::One)
            .ok_or_else(|| Error::BadRequest(format!("Unknown HTTP method: {}", s)))
    }
}
