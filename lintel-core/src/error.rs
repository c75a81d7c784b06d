// Error types for the Lintel framework

use lintel_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Unknown binding: {0} was not added")]
    UnknownBinding(String),

    #[error("Circular dependency: {0}")]
    Cycle(String),

    #[error("Reflection error: {0}")]
    Reflection(String),

    #[error("Non existing dependency `{dependency}` for `{class}`")]
    MissingDependency { class: String, dependency: String },

    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Handler error: {message}")]
    Handler {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("Initialisation error: {0}")]
    Initialisation(String),

    #[error("Sealed: {0} can't be modified after initialisation")]
    Sealed(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Name of the variant, used as the error type in logs and error pages
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Binding(_) => "BindingError",
            Error::UnknownBinding(_) => "UnknownBinding",
            Error::Cycle(_) => "CycleError",
            Error::Reflection(_) => "ReflectionError",
            Error::MissingDependency { .. } => "MissingDependency",
            Error::Construction(_) => "ConstructionError",
            Error::Annotation(_) => "AnnotationError",
            Error::RouteNotFound(_) => "RouteNotFound",
            Error::Handler { .. } => "HandlerError",
            Error::Initialisation(_) => "InitialisationError",
            Error::Sealed(_) => "SealedError",
            Error::BadRequest(_) => "BadRequest",
            Error::Serialization(_) => "SerializationError",
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "IoError",
            Error::Internal(_) => "InternalError",
        }
    }

    /// Wrap an error raised by a route handler
    pub fn handler(source: Error) -> Self {
        Error::Handler {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
