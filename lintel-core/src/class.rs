// Class descriptors, instances and constructor arguments
//
// Rust has no runtime reflection, so every class the container can build is
// described up front: its constructor parameters, the interfaces it can be
// viewed as, and the documented members the annotation processor scans.

use crate::{Content, Error};
use serde_json::Value;
use std::any::{Any, type_name};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Identifier of a service, usually a path like `lintel::Router`
pub type ServiceKey = String;

type AnyArc = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&mut Args) -> Result<Instance, Error> + Send + Sync>;
type Invoker = Arc<dyn Fn(&Instance, &[String]) -> Result<Content, Error> + Send + Sync>;

/// A constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Injected by resolving the named interface
    Service(ServiceKey),
    /// A builtin-typed value supplied through the extra arguments
    Builtin(String),
    /// An untyped value supplied through the extra arguments
    Untyped,
}

/// A documented property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub doc: Option<String>,
}

/// A documented method that can be bound as a handler
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub doc: Option<String>,
    invoke: Invoker,
}

impl MethodDescriptor {
    /// Call the method on `instance`
    pub fn invoke(&self, instance: &Instance, args: &[String]) -> Result<Content, Error> {
        (self.invoke)(instance, args)
    }

    pub(crate) fn invoker(&self) -> Invoker {
        self.invoke.clone()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish()
    }
}

/// Type-erased description of a class
#[derive(Clone)]
pub struct ClassDescriptor {
    pub key: ServiceKey,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    pub implements: Vec<ServiceKey>,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    factory: Option<Factory>,
}

impl ClassDescriptor {
    /// A descriptor for a value that is only ever seeded, never constructed
    pub fn opaque(key: impl Into<ServiceKey>) -> Self {
        Self {
            key: key.into(),
            doc: None,
            params: Vec::new(),
            implements: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            factory: None,
        }
    }

    /// Whether the class can be used where `interface` is expected
    pub fn is_subtype_of(&self, interface: &str) -> bool {
        self.key == interface || self.implements.iter().any(|key| key == interface)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub(crate) fn construct(&self, args: &mut Args) -> Result<Instance, Error> {
        let factory = self.factory.as_ref().ok_or_else(|| {
            Error::Construction(format!("`{}` has no constructor", self.key))
        })?;
        factory(args)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("key", &self.key)
            .field("params", &self.params)
            .field("implements", &self.implements)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Typed builder for a [`ClassDescriptor`]
///
/// ```
/// use lintel_core::{Class, Content};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let class = Class::<Greeter>::new("app::Greeter")
///     .arg("greeting")
///     .construct(|args| {
///         let greeting = args.string().unwrap_or_else(|| "Hello".to_string());
///         Ok(Greeter { greeting })
///     })
///     .method_doc("greet", "/** @route GET /hello/? */", |this, args| {
///         Ok(Content::Html(format!("{} {}", this.greeting, args[0])))
///     })
///     .build();
///
/// assert_eq!(class.methods.len(), 1);
/// ```
pub struct Class<T: Send + Sync + 'static> {
    key: ServiceKey,
    doc: Option<String>,
    params: Vec<Param>,
    views: Vec<(ServiceKey, Arc<dyn Fn(&Arc<T>) -> AnyArc + Send + Sync>)>,
    constructor: Option<Arc<dyn Fn(&mut Args) -> Result<T, Error> + Send + Sync>>,
    post_construct: Option<Arc<dyn Fn(&T) -> Result<(), Error> + Send + Sync>>,
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
}

impl<T: Send + Sync + 'static> Class<T> {
    pub fn new(key: impl Into<ServiceKey>) -> Self {
        Self {
            key: key.into(),
            doc: None,
            params: Vec::new(),
            views: Vec::new(),
            constructor: None,
            post_construct: None,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Class level doc comment
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare a constructor parameter injected from `interface`
    pub fn inject(mut self, interface: impl Into<ServiceKey>) -> Self {
        self.params.push(Param::Service(interface.into()));
        self
    }

    /// Declare a builtin-typed constructor parameter
    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::Builtin(name.into()));
        self
    }

    /// Declare an untyped constructor parameter
    pub fn untyped(mut self) -> Self {
        self.params.push(Param::Untyped);
        self
    }

    /// Declare that the class implements `interface`, with the cast that
    /// produces the interface view
    pub fn implements<I>(mut self, interface: impl Into<ServiceKey>, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let view: Arc<dyn Fn(&Arc<T>) -> AnyArc + Send + Sync> =
            Arc::new(move |object: &Arc<T>| -> AnyArc { Arc::new(cast(object.clone())) });
        self.views.push((interface.into(), view));
        self
    }

    pub fn construct<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    /// Hook run once on every new instance before anyone else sees it
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.post_construct = Some(Arc::new(hook));
        self
    }

    pub fn property(mut self, name: impl Into<String>, doc: Option<&str>) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.into(),
            doc: doc.map(str::to_string),
        });
        self
    }

    /// Describe an undocumented method
    pub fn method<F>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T, &[String]) -> Result<Content, Error> + Send + Sync + 'static,
    {
        self.push_method(name.into(), None, method)
    }

    /// Describe a method together with its doc comment
    pub fn method_doc<F>(self, name: impl Into<String>, doc: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T, &[String]) -> Result<Content, Error> + Send + Sync + 'static,
    {
        self.push_method(name.into(), Some(doc.into()), method)
    }

    fn push_method<F>(mut self, name: String, doc: Option<String>, method: F) -> Self
    where
        F: Fn(&T, &[String]) -> Result<Content, Error> + Send + Sync + 'static,
    {
        let class = self.key.clone();
        let method_name = name.clone();
        let invoke = move |instance: &Instance, args: &[String]| {
            let this = instance.get::<T>().ok_or_else(|| {
                Error::Reflection(format!(
                    "`{}::{}` called on an instance of `{}`",
                    class,
                    method_name,
                    instance.class()
                ))
            })?;
            method(&this, args)
        };
        self.methods.push(MethodDescriptor {
            name,
            doc,
            invoke: Arc::new(invoke),
        });
        self
    }

    pub fn build(self) -> ClassDescriptor {
        let implements = self.views.iter().map(|(key, _)| key.clone()).collect();
        let factory = self.constructor.map(|constructor| {
            let key = self.key.clone();
            let views = self.views;
            let post_construct = self.post_construct;
            let factory = move |args: &mut Args| -> Result<Instance, Error> {
                let object = Arc::new(constructor(args)?);
                if let Some(hook) = &post_construct {
                    hook(&object)?;
                }
                let mut instance = Instance::new(key.clone(), object.clone());
                for (_, view) in &views {
                    instance.views.push(view(&object));
                }
                Ok(instance)
            };
            Arc::new(factory) as Factory
        });

        ClassDescriptor {
            key: self.key,
            doc: self.doc,
            params: self.params,
            implements,
            properties: self.properties,
            methods: self.methods,
            factory,
        }
    }
}

impl<T: Default + Send + Sync + 'static> Class<T> {
    /// A class built with `T::default()`
    pub fn with_default(key: impl Into<ServiceKey>) -> Self {
        Self::new(key).construct(|_| Ok(T::default()))
    }
}

/// A constructed service
///
/// Cloning is cheap and keeps identity: clones compare equal under
/// [`Instance::ptr_eq`].
#[derive(Clone)]
pub struct Instance {
    class: ServiceKey,
    object: AnyArc,
    views: Vec<AnyArc>,
}

impl Instance {
    /// Wrap a pre-built object of class `class`
    pub fn new<T: Send + Sync + 'static>(class: impl Into<ServiceKey>, object: Arc<T>) -> Self {
        let view: AnyArc = Arc::new(object.clone());
        Self {
            class: class.into(),
            object,
            views: vec![view],
        }
    }

    /// Add an interface view to a pre-built instance
    pub fn with_view<T, I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        if let Some(object) = self.get::<T>() {
            let view: AnyArc = Arc::new(cast(object));
            self.views.push(view);
        }
        self
    }

    /// Concrete class key of the object
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The object as its concrete type or as one of its declared interfaces
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.views
            .iter()
            .find_map(|view| (**view).downcast_ref::<Arc<T>>().cloned())
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class)
            .field("views", &self.views.len())
            .finish()
    }
}

/// Constructor arguments: injected services first, then the extra values
pub struct Args {
    class: ServiceKey,
    injected: VecDeque<Instance>,
    extra: VecDeque<Value>,
}

impl Args {
    pub fn new(class: impl Into<ServiceKey>, injected: Vec<Instance>, extra: Vec<Value>) -> Self {
        Self {
            class: class.into(),
            injected: injected.into(),
            extra: extra.into(),
        }
    }

    /// Take the next injected service
    pub fn service<I: ?Sized + 'static>(&mut self) -> Result<Arc<I>, Error> {
        let instance = self.injected.pop_front().ok_or_else(|| {
            Error::Construction(format!(
                "`{}` asked for more injected services than it declared",
                self.class
            ))
        })?;
        instance.get::<I>().ok_or_else(|| {
            Error::Construction(format!(
                "`{}`: injected `{}` is not a `{}`",
                self.class,
                instance.class(),
                type_name::<I>()
            ))
        })
    }

    /// Take the next extra value
    pub fn value(&mut self) -> Option<Value> {
        self.extra.pop_front()
    }

    /// Take the next extra value if it is a string
    pub fn string(&mut self) -> Option<String> {
        match self.extra.pop_front()? {
            Value::String(s) => Some(s),
            other => {
                self.extra.push_front(other);
                None
            }
        }
    }

    /// Extra values not yet taken
    pub fn remaining(&self) -> usize {
        self.extra.len()
    }
}
