// HTTP front: serves each request through a fresh application

use crate::application::{Application, WebApp};
use crate::http::{HttpResponse, Request};
use crate::logging::{debug, error, info};
use crate::Error;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Turns one request into its finished response
pub type RequestHandler = Arc<dyn Fn(Request) -> Result<HttpResponse, Error> + Send + Sync>;

/// A handler building one [`WebApp`] per request, the way a CGI front would
pub fn web_app_handler(config_paths: Vec<PathBuf>, application: Arc<dyn Application>) -> RequestHandler {
    Arc::new(move |request| {
        let app = WebApp::new(config_paths.iter().cloned(), request)?;
        app.run(application.as_ref())
    })
}

/// Serve `handler` on `addr`
pub async fn serve(addr: SocketAddr, handler: RequestHandler) -> Result<(), Error> {
    Server::new(handler).listen(addr).await
}

/// HTTP/1 server
pub struct Server {
    handler: RequestHandler,
}

impl Server {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }

    /// Bind `addr` and serve until the listener fails
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted on `listener`
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        info!(addr = %listener.local_addr()?, "Server listening");

        loop {
            let (stream, remote) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let handler = self.handler.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<IncomingBody>| {
                    let handler = handler.clone();
                    async move { handle_request(req, remote, handler).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(error = ?err, "Error serving connection");
                }
            });
        }
    }
}

async fn handle_request(
    req: hyper::Request<IncomingBody>,
    remote: SocketAddr,
    handler: RequestHandler,
) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let response = match build_request(&parts, body, Some(remote)) {
        Ok(request) => {
            debug!(method = %parts.method, uri = %parts.uri, "Dispatching request");
            // The application is synchronous; keep it off the reactor threads
            match tokio::task::spawn_blocking(move || handler(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    error!(error = %err, kind = err.kind(), "Request failed");
                    HttpResponse::new(err.status_code())
                }
                Err(err) => {
                    error!(error = %err, "Request task failed");
                    HttpResponse::internal_server_error()
                }
            }
        }
        Err(err) => {
            debug!(error = %err, "Malformed request");
            HttpResponse::new(err.status_code())
        }
    };

    Ok(into_hyper(response))
}

/// Build a [`Request`] from the wire form
///
/// The query string and a form-encoded body become parameters, cookies are
/// split out of the `Cookie` header and the CGI style server variables
/// `REQUEST_METHOD`, `REQUEST_URI`, `QUERY_STRING` and `REMOTE_ADDR` are set.
pub fn build_request(parts: &Parts, body: Bytes, remote: Option<SocketAddr>) -> Result<Request, Error> {
    let query = parts.uri.query().unwrap_or_default();
    let mut request = Request::new(parts.method.as_str())
        .with_query(query)?
        .with_server("REQUEST_METHOD", parts.method.as_str())
        .with_server(
            "REQUEST_URI",
            parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/"),
        )
        .with_server("QUERY_STRING", query);
    if let Some(remote) = remote {
        request = request.with_server("REMOTE_ADDR", remote.ip().to_string());
    }

    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        if *name == hyper::header::COOKIE {
            for (cookie, cookie_value) in parse_cookies(value) {
                request = request.with_cookie(cookie, cookie_value);
            }
        }
        request = request.with_header(name.as_str(), value);
    }

    let is_form = request
        .header("content-type")
        .is_some_and(|value| value.starts_with(FORM_URLENCODED));
    if is_form {
        let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
            .map_err(|e| Error::BadRequest(format!("Invalid form body: {}", e)))?;
        for (name, value) in fields {
            request = request.with_param(name, value);
        }
    }

    Ok(request.with_body(body.to_vec()))
}

fn parse_cookies(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        (!name.is_empty()).then(|| (name, value.trim()))
    })
}

fn into_hyper(response: HttpResponse) -> hyper::Response<Full<Bytes>> {
    let mut out = hyper::Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => debug!(header = %name, "Dropping invalid response header"),
        }
    }
    out
}
