// HTTP request and response types

use crate::{Error, Service};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const LOCATION: &str = "Location";
pub const HTML_UTF8: &str = "text/html; charset=UTF-8";
pub const APPLICATION_JSON: &str = "application/json";

/// A file received in a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub temp_path: String,
    pub size: u64,
    pub mime_type: String,
    pub error: u16,
}

/// The incoming request
///
/// Parameters merge the query string and any form-encoded body. Header
/// names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    params: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    server: HashMap<String, String>,
    body: Vec<u8>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl Service for Request {
    const KEY: &'static str = "lintel::Request";
}

impl Request {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            params: HashMap::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            server: HashMap::new(),
            body: Vec::new(),
            files: HashMap::new(),
        }
    }

    /// Parse a query string into parameters
    pub fn with_query(mut self, query: &str) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| Error::BadRequest(format!("Invalid query string: {}", e)))?;
        self.params.extend(pairs);
        Ok(self)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_server(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_file(mut self, field: impl Into<String>, file: UploadedFile) -> Self {
        self.files.entry(field.into()).or_default().push(file);
        self
    }

    /// Request parameter (query or form field)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Upper-case method name
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Server/CGI style variable such as `REMOTE_ADDR`
    pub fn server(&self, name: &str) -> Option<&str> {
        self.server.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parse the request body as JSON; `None` for an empty body
    pub fn body_as_json(&self) -> Result<Option<Value>, Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&self.body)
            .map(Some)
            .map_err(|e| Error::BadRequest(format!("Invalid JSON body: {}", e)))
    }

    /// Parse the request body as JSON into `T`
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::BadRequest(e.to_string()))
    }

    /// Uploaded files of a field; a single upload is a list of one
    pub fn uploaded_file(&self, name: &str) -> Option<&[UploadedFile]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Client address, honouring proxy headers first
    pub fn ip(&self) -> Option<&str> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            return forwarded.split(',').next().map(str::trim);
        }
        self.header("client-ip")
            .or_else(|| self.server("REMOTE_ADDR"))
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new("GET")
    }
}

/// The outgoing response, filled in during dispatch
#[derive(Debug, Default)]
pub struct Response {
    state: RwLock<ResponseState>,
}

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl Service for Response {
    const KEY: &'static str = "lintel::Response";
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_headers(&self) {
        self.state.write().headers.clear();
    }

    /// Set a header, replacing any previous value of the same name
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut state = self.state.write();
        match state
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value,
            None => state.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.state.read().headers.clone()
    }

    pub fn set_status(&self, status: u16) {
        self.state.write().status = Some(status);
    }

    /// Status code; 200 unless set
    pub fn status(&self) -> u16 {
        self.state.read().status.unwrap_or(200)
    }

    /// Record the body to send
    pub fn send(&self, body: impl Into<Vec<u8>>) {
        self.state.write().body = Some(body.into());
    }

    pub fn is_sent(&self) -> bool {
        self.state.read().body.is_some()
    }

    pub fn body(&self) -> Vec<u8> {
        self.state.read().body.clone().unwrap_or_default()
    }

    /// Snapshot of what would go on the wire
    pub fn to_http_response(&self) -> HttpResponse {
        let state = self.state.read();
        HttpResponse {
            status: state.status.unwrap_or(200),
            headers: state.headers.clone(),
            body: state.body.clone().unwrap_or_default(),
        }
    }
}

/// A finished response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.push((key, value));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as UTF-8 text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}
