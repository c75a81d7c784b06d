// Web application lifecycle

use crate::annotation::AnnotationProcessor;
use crate::class::{Class, ClassDescriptor, Instance, ServiceKey};
use crate::container::Container;
use crate::events::EventService;
use crate::handler::Content;
use crate::http::{APPLICATION_JSON, CONTENT_TYPE, HTML_UTF8, HttpResponse, LOCATION, Request, Response};
use crate::logging::{Log, TracingLogger, debug, info, warn};
use crate::middleware::Middleware;
use crate::route_annotation::RouteAnnotation;
use crate::routing::{RouteMatch, Router};
use crate::session::Session;
use crate::{Error, Service};
use lintel_config::Config;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The application's own setup, run once configuration and logger are ready
pub trait Application: Send + Sync {
    fn init(&self, app: &WebApp) -> Result<(), Error>;
}

impl<F> Application for F
where
    F: Fn(&WebApp) -> Result<(), Error> + Send + Sync,
{
    fn init(&self, app: &WebApp) -> Result<(), Error> {
        self(app)
    }
}

/// Where a request is in its lifecycle; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    New,
    Initialised,
    Processed,
    Finished,
}

/// One request's application: container, configuration, routing and the
/// error funnel
///
/// ```no_run
/// use lintel_core::{Handler, HttpMethod, Request, WebApp};
///
/// let app = WebApp::new(["config.ini.php"], Request::new("GET"))?;
/// let response = app.run(&|app: &WebApp| {
///     app.router()?.add("/", Handler::direct(|_| Ok("Hello")), HttpMethod::GET)
/// })?;
/// assert_eq!(response.status, 200);
/// # Ok::<(), lintel_core::Error>(())
/// ```
pub struct WebApp {
    container: Container,
    config_paths: Vec<PathBuf>,
    middlewares: RwLock<Vec<ServiceKey>>,
    config: OnceCell<Arc<Config>>,
    logger: OnceCell<Arc<dyn Log>>,
    router: OnceCell<Arc<Router>>,
    response: OnceCell<Arc<Response>>,
    state: Mutex<LifecycleState>,
    finished: Mutex<Option<HttpResponse>>,
    exit_on_finish: AtomicBool,
}

impl WebApp {
    pub const CONFIG_ENVIRONMENT: &'static str = "app.environment";
    pub const CONFIG_ERROR_PAGES_FOLDER: &'static str = "app.error_pages_folder";
    pub const PRODUCTION_ENVIRONMENT: &'static str = "prod";
    pub const ERROR_CONTENT_PLACEHOLDER: &'static str = "<!-- content -->";

    /// Create the application for `request`, registering the baseline services
    pub fn new<P>(config_paths: impl IntoIterator<Item = P>, request: Request) -> Result<Self, Error>
    where
        P: Into<PathBuf>,
    {
        let container = Container::new();

        container.provide(Class::<Config>::with_default(Config::KEY).build())?;
        container.define(TracingLogger::class().build())?;
        container.register(<dyn Log>::KEY, Some(TracingLogger::KEY))?;
        container.instance(Request::KEY, Instance::new(Request::KEY, Arc::new(request)))?;
        container.provide(Class::<Response>::with_default(Response::KEY).build())?;
        container.provide(Router::class().build())?;
        container.provide(Class::<Session>::with_default(Session::KEY).build())?;
        container.provide(Class::<EventService>::with_default(EventService::KEY).build())?;
        container.define(AnnotationProcessor::class().build())?;
        container.define(RouteAnnotation::class().build())?;

        Ok(Self {
            container,
            config_paths: config_paths.into_iter().map(Into::into).collect(),
            middlewares: RwLock::new(Vec::new()),
            config: OnceCell::new(),
            logger: OnceCell::new(),
            router: OnceCell::new(),
            response: OnceCell::new(),
            state: Mutex::new(LifecycleState::New),
            finished: Mutex::new(None),
            exit_on_finish: AtomicBool::new(false),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Register an interface, optionally bound to an implementation
    pub fn add(&self, interface: &str, implementation: Option<&str>) -> Result<(), Error> {
        self.container.register(interface, implementation)
    }

    /// Define a class and register it under its own key
    pub fn provide(&self, class: ClassDescriptor) -> Result<(), Error> {
        self.container.provide(class)
    }

    /// Register a middleware; adding the same key twice is a no-op
    pub fn add_middleware(&self, interface: &str) -> Result<(), Error> {
        let mut middlewares = self.middlewares.write();
        if middlewares.iter().any(|key| key == interface) {
            return Ok(());
        }
        if !self.container.has(interface) {
            self.container.register(interface, None)?;
        }
        middlewares.push(interface.to_string());
        debug!(middleware = interface, "Middleware added");
        Ok(())
    }

    /// Enable an annotation, adding the annotation processor if needed
    pub fn add_annotation(&self, interface: &str) -> Result<(), Error> {
        self.add_middleware(AnnotationProcessor::KEY)?;
        if !self.container.has(interface) {
            self.container.register(interface, None)?;
        }
        self.container
            .service::<AnnotationProcessor>()?
            .add(&self.container, interface)
    }

    /// With `true`, finishing writes the body to STDOUT and exits the process
    pub fn set_exit_on_finish(&self, exit: bool) {
        self.exit_on_finish.store(exit, Ordering::SeqCst);
    }

    pub fn config(&self) -> Result<Arc<Config>, Error> {
        self.config
            .get()
            .cloned()
            .ok_or_else(|| Error::Initialisation("Config is not initialised".to_string()))
    }

    pub fn logger(&self) -> Result<Arc<dyn Log>, Error> {
        self.logger
            .get()
            .cloned()
            .ok_or_else(|| Error::Initialisation("Logger is not initialised".to_string()))
    }

    pub fn router(&self) -> Result<Arc<Router>, Error> {
        match self.router.get() {
            Some(router) => Ok(router.clone()),
            None => self.container.service::<Router>(),
        }
    }

    pub fn response(&self) -> Result<Arc<Response>, Error> {
        match self.response.get() {
            Some(response) => Ok(response.clone()),
            None => self.container.service::<Response>(),
        }
    }

    pub fn request(&self) -> Result<Arc<Request>, Error> {
        self.container.service::<Request>()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn advance(&self, next: LifecycleState) {
        let mut state = self.state.lock();
        if next > *state {
            debug!(from = ?*state, to = ?next, "Lifecycle transition");
            *state = next;
        }
    }

    /// Load configuration, build the core services, let the application
    /// register itself and run the middlewares
    ///
    /// Failures go through the error funnel; only a missing `Config` or
    /// `Logger` is returned as an error.
    pub fn full_init(&self, application: &dyn Application) -> Result<(), Error> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.init_services(application)))
            .unwrap_or_else(|payload| {
                Err(Error::Initialisation(panic_message("Initialisation", payload.as_ref())))
            });
        match outcome {
            Ok(()) => {
                self.advance(LifecycleState::Initialised);
                info!("Application initialised");
                Ok(())
            }
            Err(err) => self.handle_error(err, "initialisation"),
        }
    }

    fn init_services(&self, application: &dyn Application) -> Result<(), Error> {
        let config = self.container.service::<Config>()?;
        let _ = self.config.set(config.clone());
        for path in &self.config_paths {
            config.load(path)?;
        }

        let _ = self.logger.set(self.container.service::<dyn Log>()?);
        let router = self.container.service::<Router>()?;
        let _ = self.router.set(router.clone());
        let _ = self.response.set(self.container.service::<Response>()?);

        application.init(self)?;
        self.run_middlewares()?;

        self.container.seal();
        router.seal();
        Ok(())
    }

    fn run_middlewares(&self) -> Result<(), Error> {
        let middlewares = self.middlewares.read().clone();
        for key in &middlewares {
            debug!(middleware = %key, "Running middleware");
            self.container.get::<dyn Middleware>(key)?.run(&self.container)?;
        }
        Ok(())
    }

    /// Dispatch the current request to its route
    pub fn full_process(&self) -> Result<(), Error> {
        match self.state() {
            LifecycleState::New => {
                return Err(Error::Initialisation(
                    "full_process called before full_init".to_string(),
                ));
            }
            LifecycleState::Finished => return Ok(()),
            _ => {}
        }

        let router = match self.router() {
            Ok(router) => router,
            Err(err) => return self.handle_error(err, "dispatch"),
        };
        let Some(found) = router.match_current_route() else {
            let err = Error::RouteNotFound(router.current_route());
            debug!(error = %err, "No route found");
            return self.send_error(err.status_code(), "");
        };

        let location = format!("{:?}", found.handler);
        match self.dispatch(&found).and_then(|content| self.send_content(content)) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_error(err, &location),
        }
    }

    fn dispatch(&self, found: &RouteMatch) -> Result<Content, Error> {
        let callable = self.container.callable(&found.handler)?;
        match panic::catch_unwind(AssertUnwindSafe(|| callable(&found.params))) {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(err)) => Err(Error::handler(err)),
            Err(payload) => Err(Error::Handler {
                message: panic_message("Handler", payload.as_ref()),
                source: None,
            }),
        }
    }

    /// Send handler content and finish the request
    pub fn send_content(&self, content: Content) -> Result<(), Error> {
        let response = self.response()?;
        match content {
            Content::Html(body) => {
                response.set_header(CONTENT_TYPE, HTML_UTF8);
                response.send(body);
            }
            Content::Json(value) => {
                let body = serde_json::to_vec(&value)?;
                response.set_header(CONTENT_TYPE, APPLICATION_JSON);
                response.send(body);
            }
            Content::Redirect(url) => return self.redirect(&url, &[]),
            Content::Empty => response.send(Vec::new()),
        }
        self.advance(LifecycleState::Processed);
        self.finish();
        Ok(())
    }

    /// Redirect to `url`: an absolute `http` URL as is, otherwise a route path
    pub fn redirect(&self, url: &str, params: &[(&str, &str)]) -> Result<(), Error> {
        let location = if url.starts_with("http") {
            url.to_string()
        } else {
            self.router()?.url(Some(url), params, "&")
        };
        let response = self.response()?;
        response.clear_headers();
        response.set_header(LOCATION, location);
        response.set_status(302);
        response.send(Vec::new());
        self.advance(LifecycleState::Processed);
        self.finish();
        Ok(())
    }

    /// Send the error page for `code` with `content` in its placeholder
    pub fn send_error(&self, code: u16, content: &str) -> Result<(), Error> {
        let page = self
            .load_error_page(code)
            .replace(Self::ERROR_CONTENT_PLACEHOLDER, content);
        let response = self.response()?;
        response.set_status(code);
        response.set_header(CONTENT_TYPE, HTML_UTF8);
        response.send(page);
        self.finish();
        Ok(())
    }

    fn load_error_page(&self, code: u16) -> String {
        let folder = self
            .config
            .get()
            .and_then(|config| config.get_string(Self::CONFIG_ERROR_PAGES_FOLDER).map(|dir| (config, dir)))
            .filter(|(_, dir)| !dir.is_empty());
        if let Some((config, dir)) = folder {
            let path = config.get_full_path(&format!("{}/{}.html", dir, code));
            if let Ok(page) = std::fs::read_to_string(&path) {
                return page;
            }
            debug!(path = %path, "No error page");
        }
        Self::ERROR_CONTENT_PLACEHOLDER.to_string()
    }

    /// Record the response as final
    ///
    /// Only the first call counts. With `exit_on_finish` the body is written
    /// to STDOUT and the process exits.
    pub fn finish(&self) {
        let mut finished = self.finished.lock();
        if finished.is_some() {
            warn!("Request already finished");
            return;
        }
        let payload = self
            .response()
            .map(|response| response.to_http_response())
            .unwrap_or_else(|_| HttpResponse::internal_server_error());
        info!(status = payload.status, "Request finished");
        *finished = Some(payload.clone());
        drop(finished);
        self.advance(LifecycleState::Finished);

        if self.exit_on_finish.load(Ordering::SeqCst) {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(&payload.body);
            let _ = stdout.flush();
            std::process::exit(0);
        }
    }

    /// The finished response, once there is one
    pub fn finished(&self) -> Option<HttpResponse> {
        self.finished.lock().clone()
    }

    /// Initialise, dispatch and return the finished response
    pub fn run(&self, application: &dyn Application) -> Result<HttpResponse, Error> {
        self.full_init(application)?;
        if self.state() < LifecycleState::Finished {
            self.full_process()?;
        }
        self.finished()
            .ok_or_else(|| Error::Internal("Request was not finished".to_string()))
    }

    /// The error funnel: log the error and answer with a 500 page
    fn handle_error(&self, err: Error, location: &str) -> Result<(), Error> {
        let Some(config) = self.config.get().cloned() else {
            return Err(Error::Initialisation(format!(
                "Couldn't instantiate Config: {}",
                err
            )));
        };
        let Some(logger) = self.logger.get().cloned() else {
            return Err(Error::Initialisation(format!(
                "Couldn't instantiate Logger: {}",
                err
            )));
        };

        let report = ErrorReport::new(&err, location);
        logger.error(&report.to_log_text());

        let environment = config
            .get_string(Self::CONFIG_ENVIRONMENT)
            .filter(|env| !env.is_empty())
            .unwrap_or_else(|| Self::PRODUCTION_ENVIRONMENT.to_string());
        let content = if environment == Self::PRODUCTION_ENVIRONMENT {
            String::new()
        } else {
            report.to_html()
        };
        self.send_error(500, &content)
    }
}

fn panic_message(stage: &str, payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("{} panicked: {}", stage, message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("{} panicked: {}", stage, message)
    } else {
        format!("{} panicked", stage)
    }
}

/// What the error funnel knows about a failure
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: String,
    pub location: String,
    pub message: String,
    /// Source chain followed by the captured backtrace, one frame per line
    pub trace: Vec<String>,
}

impl ErrorReport {
    pub fn new(err: &Error, location: &str) -> Self {
        let mut trace = Vec::new();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            trace.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            trace.extend(backtrace.to_string().lines().map(|line| line.trim().to_string()));
        }

        Self {
            kind: err.kind().to_string(),
            location: location.to_string(),
            message: err.to_string(),
            trace: trace
                .into_iter()
                .enumerate()
                .map(|(i, line)| format!("#{} {}", i, line))
                .collect(),
        }
    }

    /// `` `kind` in location with message: message `` followed by the trace
    pub fn to_log_text(&self) -> String {
        format!(
            "`{}` in {} with message: {}\n{}",
            self.kind,
            self.location,
            self.message,
            self.trace.join("\n")
        )
    }

    /// HTML block shown outside production
    pub fn to_html(&self) -> String {
        let trace: Vec<String> = self.trace.iter().map(|line| escape_html(line)).collect();
        format!(
            "<h2>{}</h2>\n<p>In <b>{}</b> with message: {}</p>\n<h3>Stacktrace:</h3>\n<p>{}</p>",
            escape_html(&self.kind),
            escape_html(&self.location),
            escape_html(&self.message),
            trace.join("<br>\n")
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}
