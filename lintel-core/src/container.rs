// Dependency injection container

use crate::class::{Args, ClassDescriptor, Instance, Param, ServiceKey};
use crate::handler::{Handler, HandlerFn};
use crate::logging::{debug, trace};
use crate::{Error, Service};
use parking_lot::{ReentrantMutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The dependency injection container
///
/// Services are registered under an interface key, optionally bound to an
/// implementation class. Resolving a key builds the class once through its
/// descriptor, injecting the declared dependencies, and caches the instance
/// under the interface key.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    classes: RwLock<HashMap<ServiceKey, Arc<ClassDescriptor>>>,
    bindings: RwLock<Vec<(ServiceKey, Option<ServiceKey>)>>,
    instances: RwLock<HashMap<ServiceKey, Instance>>,
    build_lock: ReentrantMutex<()>,
    sealed: AtomicBool,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self {
            inner: Arc::new(Inner {
                classes: RwLock::new(HashMap::new()),
                bindings: RwLock::new(Vec::new()),
                instances: RwLock::new(HashMap::new()),
                build_lock: ReentrantMutex::new(()),
                sealed: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_open(&self, what: &str) -> Result<(), Error> {
        if self.is_sealed() {
            return Err(Error::Sealed(format!("container ({})", what)));
        }
        Ok(())
    }

    /// Record a class descriptor
    pub fn define(&self, class: ClassDescriptor) -> Result<(), Error> {
        self.ensure_open(&class.key)?;
        debug!(class = %class.key, "Class defined");
        self.inner
            .classes
            .write()
            .insert(class.key.clone(), Arc::new(class));
        Ok(())
    }

    /// Define a class and register it under its own key
    pub fn provide(&self, class: ClassDescriptor) -> Result<(), Error> {
        let key = class.key.clone();
        self.define(class)?;
        self.register(&key, None)
    }

    /// Register an interface, optionally bound to an implementation class
    ///
    /// Re-registering replaces the implementation but keeps the interface's
    /// original position in [`Container::interfaces`].
    pub fn register(&self, interface: &str, implementation: Option<&str>) -> Result<(), Error> {
        self.ensure_open(interface)?;

        if let Some(implementation) = implementation {
            let is_subtype = self
                .descriptor(implementation)
                .is_some_and(|class| class.is_subtype_of(interface));
            if !is_subtype {
                return Err(Error::Binding(format!(
                    "{} is not a subclass of {}",
                    implementation, interface
                )));
            }
        }

        let mut bindings = self.inner.bindings.write();
        let binding = implementation.map(str::to_string);
        match bindings.iter_mut().find(|(key, _)| key == interface) {
            Some(existing) => existing.1 = binding,
            None => bindings.push((interface.to_string(), binding)),
        }

        debug!(interface, implementation = ?implementation, "Service registered");
        Ok(())
    }

    /// Register `interface` with a pre-built instance
    pub fn instance(&self, interface: &str, instance: Instance) -> Result<(), Error> {
        self.ensure_open(interface)?;

        if !self.inner.classes.read().contains_key(instance.class()) {
            self.inner.classes.write().insert(
                instance.class().to_string(),
                Arc::new(ClassDescriptor::opaque(instance.class())),
            );
        }
        let implementation = (instance.class() != interface).then(|| instance.class().to_string());
        {
            let mut bindings = self.inner.bindings.write();
            match bindings.iter_mut().find(|(key, _)| key == interface) {
                Some(existing) => existing.1 = implementation,
                None => bindings.push((interface.to_string(), implementation)),
            }
        }
        self.inner
            .instances
            .write()
            .insert(interface.to_string(), instance);

        debug!(interface, "Instance seeded");
        Ok(())
    }

    /// Check if an interface is registered
    pub fn has(&self, interface: &str) -> bool {
        let exists = self
            .inner
            .bindings
            .read()
            .iter()
            .any(|(key, _)| key == interface);
        trace!(interface, exists, "Checked service existence");
        exists
    }

    /// The class an interface resolves to
    pub fn class_for(&self, interface: &str) -> Result<ServiceKey, Error> {
        self.inner
            .bindings
            .read()
            .iter()
            .find(|(key, _)| key == interface)
            .map(|(key, implementation)| implementation.clone().unwrap_or_else(|| key.clone()))
            .ok_or_else(|| Error::UnknownBinding(interface.to_string()))
    }

    /// The descriptor recorded for a class
    pub fn descriptor(&self, class: &str) -> Option<Arc<ClassDescriptor>> {
        self.inner.classes.read().get(class).cloned()
    }

    /// Registered interfaces in registration order
    pub fn interfaces(&self) -> Vec<ServiceKey> {
        self.inner
            .bindings
            .read()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Resolve the singleton instance of `interface`
    pub fn resolve(&self, interface: &str) -> Result<Instance, Error> {
        self.resolve_with(interface, Vec::new(), &[])
    }

    /// Resolve with extra constructor arguments and the current dependency stack
    ///
    /// The extra arguments only matter on the first, constructing, resolve.
    pub fn resolve_with(
        &self,
        interface: &str,
        extra: Vec<Value>,
        stack: &[ServiceKey],
    ) -> Result<Instance, Error> {
        if let Some(instance) = self.cached(interface) {
            trace!(interface, "Resolved from cache");
            return Ok(instance);
        }

        let _guard = self.inner.build_lock.lock();
        if let Some(instance) = self.cached(interface) {
            return Ok(instance);
        }

        let class = self.class_for(interface)?;
        let instance = self.create(&class, extra, stack)?;
        self.inner
            .instances
            .write()
            .insert(interface.to_string(), instance.clone());

        debug!(interface, class = %class, "Service resolved");
        Ok(instance)
    }

    fn cached(&self, interface: &str) -> Option<Instance> {
        self.inner.instances.read().get(interface).cloned()
    }

    /// Build a fresh instance of `class`, bypassing the cache
    pub fn create(
        &self,
        class: &str,
        extra: Vec<Value>,
        stack: &[ServiceKey],
    ) -> Result<Instance, Error> {
        let _guard = self.inner.build_lock.lock();

        if stack.iter().any(|key| key == class) {
            let mut chain = stack.to_vec();
            chain.push(class.to_string());
            return Err(Error::Cycle(chain.join(" <- ")));
        }

        let descriptor = self
            .descriptor(class)
            .ok_or_else(|| Error::Reflection(format!("Class `{}` does not exist", class)))?;

        let mut stack = stack.to_vec();
        stack.push(class.to_string());

        let mut injected = Vec::new();
        for param in &descriptor.params {
            if let Param::Service(dependency) = param {
                if !self.has(dependency) {
                    return Err(Error::MissingDependency {
                        class: class.to_string(),
                        dependency: dependency.clone(),
                    });
                }
                injected.push(self.resolve_with(dependency, Vec::new(), &stack)?);
            }
        }

        trace!(class, injected = injected.len(), extra = extra.len(), "Constructing instance");
        descriptor.construct(&mut Args::new(class, injected, extra))
    }

    /// Resolve `interface` as `T`: the concrete type or a declared interface view
    pub fn get<T: ?Sized + 'static>(&self, interface: &str) -> Result<Arc<T>, Error> {
        let instance = self.resolve(interface)?;
        instance.get::<T>().ok_or_else(|| {
            Error::Reflection(format!(
                "`{}` can't be viewed as `{}`",
                instance.class(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Resolve a service through its well-known key
    pub fn service<T: Service + ?Sized + 'static>(&self) -> Result<Arc<T>, Error> {
        self.get::<T>(T::KEY)
    }

    /// Turn a handler into something callable
    ///
    /// Bound handlers resolve their owning service here, so the owner is
    /// built only when the handler is actually used.
    pub fn callable(&self, handler: &Handler) -> Result<HandlerFn, Error> {
        match handler {
            Handler::Direct(func) => Ok(func.clone()),
            Handler::Bound { service, method } => {
                let instance = self.resolve(service)?;
                let class = self.descriptor(instance.class()).ok_or_else(|| {
                    Error::Reflection(format!("Class `{}` does not exist", instance.class()))
                })?;
                let invoke = class
                    .method(method)
                    .ok_or_else(|| {
                        Error::Reflection(format!(
                            "Method `{}::{}` does not exist",
                            instance.class(),
                            method
                        ))
                    })?
                    .invoker();
                Ok(Arc::new(move |args: &[String]| invoke(&instance, args)))
            }
        }
    }

    /// Freeze the definitions and bindings
    pub fn seal(&self) {
        self.inner.sealed.store(true, Ordering::SeqCst);
        debug!("Container sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::SeqCst)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
