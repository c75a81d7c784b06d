// Recording doubles for the logger and middleware services

use lintel_core::{Class, Container, Error, Instance, Log, LogLevel, Middleware, Service};
use parking_lot::Mutex;
use std::sync::Arc;

/// Logger that keeps every entry in memory
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl Service for RecordingLogger {
    const KEY: &'static str = "lintel::RecordingLogger";
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `logger` as the container's `lintel::Logger`
    pub fn install(logger: &Arc<RecordingLogger>, container: &Container) -> Result<(), Error> {
        container.instance(
            <dyn Log>::KEY,
            Instance::new(Self::KEY, logger.clone())
                .with_view(|logger: Arc<RecordingLogger>| logger as Arc<dyn Log>),
        )
    }

    /// All entries in logging order
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().clone()
    }

    /// Messages logged at `level`
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(LogLevel::Error)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Log for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}

/// Shared record of middleware runs
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Middleware that appends its own key to a [`CallLog`] when run
pub struct RecordingMiddleware {
    key: String,
    calls: CallLog,
}

impl RecordingMiddleware {
    /// Descriptor of a recording middleware registered under `key`
    pub fn class(key: &str, calls: CallLog) -> Class<RecordingMiddleware> {
        let name = key.to_string();
        Class::new(key)
            .implements(<dyn Middleware>::KEY, |m| m as Arc<dyn Middleware>)
            .construct(move |_| {
                Ok(RecordingMiddleware {
                    key: name.clone(),
                    calls: calls.clone(),
                })
            })
    }
}

impl Middleware for RecordingMiddleware {
    fn run(&self, _container: &Container) -> Result<(), Error> {
        self.calls.lock().push(self.key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger() {
        let logger = RecordingLogger::new();
        logger.info("started");
        logger.error("failed");
        logger.error("failed again");

        assert_eq!(logger.entries().len(), 3);
        assert_eq!(logger.errors(), vec!["failed", "failed again"]);
        assert_eq!(logger.messages(LogLevel::Info), vec!["started"]);

        logger.clear();
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_install_replaces_logger() {
        let container = Container::new();
        let logger = Arc::new(RecordingLogger::new());
        RecordingLogger::install(&logger, &container).unwrap();

        container.service::<dyn Log>().unwrap().warn("careful");
        assert_eq!(logger.messages(LogLevel::Warn), vec!["careful"]);
    }

    #[test]
    fn test_recording_middleware() {
        let calls = CallLog::default();
        let container = Container::new();
        container
            .provide(RecordingMiddleware::class("app::Audit", calls.clone()).build())
            .unwrap();

        container
            .get::<dyn Middleware>("app::Audit")
            .unwrap()
            .run(&container)
            .unwrap();
        assert_eq!(*calls.lock(), vec!["app::Audit"]);
    }
}
