// Lintel - a small web application framework for Rust
//
// Service container with class descriptors, a route table with wildcards and
// prefix variables, middleware, annotations and a request lifecycle with an
// error funnel.

// Re-export core functionality
pub use lintel_core::*;

pub use lintel_config;

#[cfg(feature = "i18n")]
pub use lintel_i18n;

#[cfg(feature = "testing")]
pub use lintel_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Annotation,
        AnnotationTarget,
        Application,
        Args,
        Class,
        Config,
        Container,
        Content,
        Error,
        Handler,
        HttpMethod,
        HttpResponse,
        Instance,
        LifecycleState,
        Log,
        Middleware,
        Request,
        RouteMethod,
        Router,
        Service,
        WebApp,
    };
}
