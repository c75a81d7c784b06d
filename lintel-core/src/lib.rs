// Core library for the Lintel web framework
// Service container, class descriptors, routing, annotations and the request lifecycle

pub mod annotation;
pub mod application;
pub mod class;
pub mod container;
pub mod error;
pub mod events;
pub mod handler;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod route_annotation;
pub mod routing;
pub mod server;
pub mod session;
pub mod traits;

// Re-export commonly used types
pub use annotation::{Annotation, AnnotationProcessor, AnnotationTarget, Subject};
pub use application::{Application, ErrorReport, LifecycleState, WebApp};
pub use class::{Args, Class, ClassDescriptor, Instance, MethodDescriptor, Param, PropertyDescriptor, ServiceKey};
pub use container::Container;
pub use error::Error;
pub use events::EventService;
pub use handler::{Content, Handler, HandlerFn, IntoContent};
pub use http::{HttpResponse, Request, Response, UploadedFile};
pub use logging::{Log, LogConfig, LogFormat, LogLevel, LogOutput, TracingLogger};
pub use middleware::Middleware;
pub use route_annotation::RouteAnnotation;
pub use routing::{RouteMatch, RouteTable, Router};
pub use server::{RequestHandler, Server, serve, web_app_handler};
pub use session::Session;
pub use traits::*;

pub use lintel_config::Config;
