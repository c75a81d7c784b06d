// Middleware contract

use crate::container::Container;
use crate::{Error, Service};

/// Code that runs once during initialisation, after the application has
/// registered its services and before any request is dispatched
///
/// Middlewares are services themselves: they are registered by key, built
/// by the container with their declared dependencies and run in
/// registration order.
pub trait Middleware: Send + Sync {
    fn run(&self, container: &Container) -> Result<(), Error>;
}

impl Service for dyn Middleware {
    const KEY: &'static str = "lintel::Middleware";
}
