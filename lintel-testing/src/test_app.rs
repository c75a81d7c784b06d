// Test application harness

use crate::mock::RecordingLogger;
use crate::test_request::{ROUTE_PARAMETER, TestRequest};
use lintel_core::{Application, Config, Error, HttpResponse, Request, Router, WebApp};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs an [`Application`] against test requests
///
/// Every request gets a fresh [`WebApp`]. Configuration comes from the
/// added files, then from the values set on the harness; the route
/// parameter defaults to `route` when neither names one. All requests log
/// into one shared [`RecordingLogger`].
///
/// ```
/// use lintel_core::{Handler, HttpMethod, WebApp};
/// use lintel_testing::TestApp;
///
/// let app = TestApp::new(|app: &WebApp| {
///     app.router()?.add("/", Handler::direct(|_| Ok("Hello")), HttpMethod::GET)
/// })
/// .config("app.environment", "dev");
///
/// let response = app.get("/").unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(response.text(), "Hello");
/// ```
pub struct TestApp {
    application: Arc<dyn Application>,
    config_paths: Vec<PathBuf>,
    overrides: Vec<(String, Value)>,
    logger: Arc<RecordingLogger>,
}

impl TestApp {
    pub fn new(application: impl Application + 'static) -> Self {
        Self {
            application: Arc::new(application),
            config_paths: Vec::new(),
            overrides: Vec::new(),
            logger: Arc::new(RecordingLogger::new()),
        }
    }

    /// Load a configuration file before the overrides
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_paths.push(path.into());
        self
    }

    /// Set a configuration value after the files are loaded
    pub fn config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    pub fn logger(&self) -> Arc<RecordingLogger> {
        self.logger.clone()
    }

    /// A new, uninitialised application for `request` with the recording
    /// logger installed
    pub fn app(&self, request: impl Into<Request>) -> Result<WebApp, Error> {
        let app = WebApp::new(self.config_paths.clone(), request.into())?;
        RecordingLogger::install(&self.logger, app.container())?;
        Ok(app)
    }

    /// Run a full request and keep the finished application for inspection
    pub fn process(&self, request: impl Into<Request>) -> Result<WebApp, Error> {
        let app = self.app(request)?;
        app.run(&WithOverrides {
            overrides: &self.overrides,
            inner: self.application.as_ref(),
        })?;
        Ok(app)
    }

    /// Run a full request
    pub fn handle(&self, request: impl Into<Request>) -> Result<HttpResponse, Error> {
        self.process(request)?
            .finished()
            .ok_or_else(|| Error::Internal("Request was not finished".to_string()))
    }

    pub fn get(&self, route: &str) -> Result<HttpResponse, Error> {
        self.handle(TestRequest::get(route))
    }

    pub fn post(&self, route: &str) -> Result<HttpResponse, Error> {
        self.handle(TestRequest::post(route))
    }
}

struct WithOverrides<'a> {
    overrides: &'a [(String, Value)],
    inner: &'a dyn Application,
}

impl Application for WithOverrides<'_> {
    fn init(&self, app: &WebApp) -> Result<(), Error> {
        let config: Arc<Config> = app.config()?;
        if !config.has(Router::CONFIG_ROUTE_PARAMETER) {
            config.set(Router::CONFIG_ROUTE_PARAMETER, ROUTE_PARAMETER)?;
        }
        for (key, value) in self.overrides {
            config.set(key, value)?;
        }
        self.inner.init(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::{Handler, HttpMethod, LifecycleState};
    use std::fs;

    fn hello(app: &WebApp) -> Result<(), Error> {
        app.router()?
            .add("/hello/?", Handler::direct(|args| Ok(format!("Hello {}", args[0]))), HttpMethod::GET)
    }

    #[test]
    fn test_dispatch_with_default_route_parameter() {
        let app = TestApp::new(hello);
        let response = app.get("/hello/Joe").unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "Hello Joe");
        assert_eq!(app.get("/nope").unwrap().status, 404);
    }

    #[test]
    fn test_overrides_win_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ini");
        fs::write(&path, "router.route_parameter = r\napp.name = from-file\n").unwrap();

        let app = TestApp::new(|app: &WebApp| {
            let name = app.config()?.get_string("app.name").unwrap_or_default();
            app.router()?
                .add("/", Handler::direct(move |_| Ok(name.clone())), HttpMethod::GET)
        })
        .config_file(&path)
        .config("app.name", "override");

        let request = Request::new("GET").with_param("r", "/");
        let response = app.handle(request).unwrap();
        assert_eq!(response.text(), "override");
    }

    #[test]
    fn test_errors_are_recorded() {
        let app = TestApp::new(|app: &WebApp| {
            app.router()?.add(
                "/",
                Handler::direct(|_| Err::<String, _>(Error::Internal("boom".to_string()))),
                HttpMethod::GET,
            )
        });

        let response = app.get("/").unwrap();
        assert_eq!(response.status, 500);
        let errors = app.logger().errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("boom"));
    }

    #[test]
    fn test_processed_app_is_sealed() {
        let app = TestApp::new(hello).process(TestRequest::get("/hello/Ada")).unwrap();
        assert_eq!(app.state(), LifecycleState::Finished);
        assert!(app.container().is_sealed());
    }

    #[test]
    fn test_app_is_uninitialised() {
        let app = TestApp::new(hello);
        let web_app = app.app(TestRequest::get("/")).unwrap();
        assert_eq!(web_app.state(), LifecycleState::New);
    }
}
