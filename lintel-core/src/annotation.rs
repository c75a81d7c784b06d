// Doc comment annotations

use crate::class::{Class, ClassDescriptor, MethodDescriptor, PropertyDescriptor};
use crate::container::Container;
use crate::logging::{debug, trace};
use crate::middleware::Middleware;
use crate::{Error, Service};
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;

/// Where an annotation may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTarget {
    Class,
    Property,
    Method,
}

/// The documented member an annotation was found on
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Class(&'a ClassDescriptor),
    Property(&'a PropertyDescriptor),
    Method(&'a MethodDescriptor),
}

impl<'a> Subject<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Subject::Class(class) => &class.key,
            Subject::Property(property) => &property.name,
            Subject::Method(method) => &method.name,
        }
    }

    pub fn doc(&self) -> Option<&'a str> {
        match *self {
            Subject::Class(class) => class.doc.as_deref(),
            Subject::Property(property) => property.doc.as_deref(),
            Subject::Method(method) => method.doc.as_deref(),
        }
    }

    pub fn target(&self) -> AnnotationTarget {
        match self {
            Subject::Class(_) => AnnotationTarget::Class,
            Subject::Property(_) => AnnotationTarget::Property,
            Subject::Method(_) => AnnotationTarget::Method,
        }
    }
}

/// An annotation such as `@route GET /books`
///
/// A doc comment is considered when it contains `* @<name>`. It is then
/// flattened to one line and matched with the ungreedy pattern
/// `\*\s@<name>\s<regex>\s\*`; the captures (empty when nothing matched)
/// are handed to [`Annotation::process`].
pub trait Annotation: Send + Sync {
    /// Targets this annotation is looked for on
    fn types(&self) -> Vec<AnnotationTarget>;

    /// Name after the `@`
    fn name(&self) -> &str;

    /// Pattern of the annotation arguments
    fn regex(&self) -> &str;

    /// Act on one occurrence
    ///
    /// `owner` is the interface key the member was reached through.
    fn process(
        &self,
        owner: &str,
        subject: Subject<'_>,
        comment: &str,
        captures: &[Option<String>],
    ) -> Result<(), Error>;
}

impl Service for dyn Annotation {
    const KEY: &'static str = "lintel::Annotation";
}

/// Middleware that scans every registered service for annotations
#[derive(Debug, Default)]
pub struct AnnotationProcessor {
    annotations: RwLock<Vec<String>>,
    namespaces: RwLock<Vec<String>>,
}

impl Service for AnnotationProcessor {
    const KEY: &'static str = "lintel::AnnotationProcessor";
}

impl AnnotationProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class() -> Class<AnnotationProcessor> {
        Class::with_default(Self::KEY)
            .implements(<dyn Middleware>::KEY, |processor| processor as Arc<dyn Middleware>)
    }

    /// Use the annotation class `key`; it must implement `lintel::Annotation`
    pub fn add(&self, container: &Container, key: &str) -> Result<(), Error> {
        let implements = container
            .descriptor(key)
            .is_some_and(|class| class.is_subtype_of(<dyn Annotation>::KEY));
        if !implements {
            return Err(Error::Annotation(format!(
                "{} doesn't implement the Annotation interface",
                key
            )));
        }
        let mut annotations = self.annotations.write();
        if !annotations.iter().any(|existing| existing == key) {
            annotations.push(key.to_string());
        }
        Ok(())
    }

    /// Only scan interfaces starting with one of the added prefixes
    pub fn add_namespace(&self, namespace: impl Into<String>) {
        self.namespaces.write().push(namespace.into());
    }

    fn is_allowed(&self, interface: &str) -> bool {
        let namespaces = self.namespaces.read();
        namespaces.is_empty() || namespaces.iter().any(|ns| interface.starts_with(ns.as_str()))
    }

    fn compile(annotation: &dyn Annotation) -> Result<Regex, Error> {
        let pattern = format!(
            r"(?U)\*\s@{}\s{}\s\*",
            regex::escape(annotation.name()),
            annotation.regex()
        );
        Regex::new(&pattern).map_err(|e| {
            Error::Annotation(format!("Invalid pattern for @{}: {}", annotation.name(), e))
        })
    }

    fn apply(
        annotation: &dyn Annotation,
        regex: &Regex,
        owner: &str,
        subject: Subject<'_>,
    ) -> Result<(), Error> {
        let Some(doc) = subject.doc() else {
            return Ok(());
        };
        if !doc.contains(&format!("* @{}", annotation.name())) {
            return Ok(());
        }

        let comment = doc.replace(['\r', '\n'], " ");
        let captures: Vec<Option<String>> = regex
            .captures(&comment)
            .map(|caps| {
                caps.iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        trace!(
            annotation = annotation.name(),
            owner,
            member = subject.name(),
            matched = !captures.is_empty(),
            "Annotation found"
        );
        annotation.process(owner, subject, &comment, &captures)
    }

    fn process_interface(
        &self,
        container: &Container,
        interface: &str,
        annotations: &[(Arc<dyn Annotation>, Regex)],
    ) -> Result<(), Error> {
        let class_key = container.class_for(interface)?;
        let class = container.descriptor(&class_key).ok_or_else(|| {
            Error::Reflection(format!("Can't create reflection for: {}", interface))
        })?;

        let groups: [(AnnotationTarget, Vec<Subject<'_>>); 3] = [
            (AnnotationTarget::Class, vec![Subject::Class(&class)]),
            (
                AnnotationTarget::Property,
                class.properties.iter().map(Subject::Property).collect(),
            ),
            (
                AnnotationTarget::Method,
                class.methods.iter().map(Subject::Method).collect(),
            ),
        ];

        // Each annotation visits every member of a kind before the next one runs
        for (target, subjects) in &groups {
            for (annotation, regex) in annotations {
                if !annotation.types().contains(target) {
                    continue;
                }
                for subject in subjects {
                    Self::apply(annotation.as_ref(), regex, interface, *subject)?;
                }
            }
        }
        Ok(())
    }
}

impl Middleware for AnnotationProcessor {
    fn run(&self, container: &Container) -> Result<(), Error> {
        let keys = self.annotations.read().clone();
        let mut annotations = Vec::with_capacity(keys.len());
        for key in &keys {
            let annotation = container.get::<dyn Annotation>(key)?;
            let regex = Self::compile(annotation.as_ref())?;
            annotations.push((annotation, regex));
        }

        let interfaces: Vec<String> = container
            .interfaces()
            .into_iter()
            .filter(|interface| self.is_allowed(interface))
            .collect();
        debug!(
            annotations = annotations.len(),
            interfaces = interfaces.len(),
            "Processing annotations"
        );

        for interface in &interfaces {
            self.process_interface(container, interface, &annotations)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Content;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String, Vec<Option<String>>)>>,
    }

    impl Annotation for Recorder {
        fn types(&self) -> Vec<AnnotationTarget> {
            vec![
                AnnotationTarget::Class,
                AnnotationTarget::Property,
                AnnotationTarget::Method,
            ]
        }

        fn name(&self) -> &str {
            "tag"
        }

        fn regex(&self) -> &str {
            r"(\w+)\b.*"
        }

        fn process(
            &self,
            owner: &str,
            subject: Subject<'_>,
            _comment: &str,
            captures: &[Option<String>],
        ) -> Result<(), Error> {
            self.seen
                .lock()
                .push((owner.to_string(), subject.name().to_string(), captures.to_vec()));
            Ok(())
        }
    }

    struct Shelf;

    fn container() -> Container {
        let container = Container::new();
        container
            .provide(
                Class::<Recorder>::with_default("test::Recorder")
                    .implements(<dyn Annotation>::KEY, |r| r as Arc<dyn Annotation>)
                    .build(),
            )
            .unwrap();
        container
            .provide(
                Class::<Shelf>::new("app::Shelf")
                    .doc("/**\n * @tag shelf\n */")
                    .property("size", Some("/** @tag size */"))
                    .property("hidden", None)
                    .method_doc("list", "/** @tag list */", |_, _| Ok(Content::Empty))
                    .method_doc("plain", "/** Just a comment */", |_, _| Ok(Content::Empty))
                    .construct(|_| Ok(Shelf))
                    .build(),
            )
            .unwrap();
        container
    }

    #[test]
    fn test_add_requires_annotation_class() {
        let container = container();
        let processor = AnnotationProcessor::new();
        assert!(processor.add(&container, "test::Recorder").is_ok());
        assert!(matches!(
            processor.add(&container, "app::Shelf"),
            Err(Error::Annotation(_))
        ));
        assert!(matches!(
            processor.add(&container, "app::Unknown"),
            Err(Error::Annotation(_))
        ));
    }

    #[test]
    fn test_run_visits_class_properties_and_methods() {
        let container = container();
        let processor = AnnotationProcessor::new();
        processor.add(&container, "test::Recorder").unwrap();
        processor.run(&container).unwrap();

        let recorder = container.get::<Recorder>("test::Recorder").unwrap();
        let seen = recorder.seen.lock();
        let names: Vec<&str> = seen.iter().map(|(_, name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["app::Shelf", "size", "list"]);
        assert!(seen.iter().all(|(owner, _, _)| owner == "app::Shelf"));
        assert_eq!(seen[0].2[1].as_deref(), Some("shelf"));
        assert_eq!(seen[2].2[1].as_deref(), Some("list"));
    }

    struct Tag {
        name: &'static str,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl Annotation for Tag {
        fn types(&self) -> Vec<AnnotationTarget> {
            vec![AnnotationTarget::Method]
        }

        fn name(&self) -> &str {
            self.name
        }

        fn regex(&self) -> &str {
            r"(\w+)\b.*"
        }

        fn process(
            &self,
            _owner: &str,
            subject: Subject<'_>,
            _comment: &str,
            _captures: &[Option<String>],
        ) -> Result<(), Error> {
            self.order
                .lock()
                .push(format!("{}:{}", self.name, subject.name()));
            Ok(())
        }
    }

    #[test]
    fn test_each_annotation_visits_all_methods_before_the_next() {
        let order: Arc<Mutex<Vec<String>>> = Arc::default();
        let container = Container::new();
        for name in ["first", "second"] {
            let order = order.clone();
            container
                .provide(
                    Class::<Tag>::new(format!("test::{}", name))
                        .implements(<dyn Annotation>::KEY, |t| t as Arc<dyn Annotation>)
                        .construct(move |_| {
                            Ok(Tag {
                                name,
                                order: order.clone(),
                            })
                        })
                        .build(),
                )
                .unwrap();
        }
        container
            .provide(
                Class::<Shelf>::new("app::Shelf")
                    .method_doc("m1", "/**\n * @first a\n * @second b\n */", |_, _| {
                        Ok(Content::Empty)
                    })
                    .method_doc("m2", "/**\n * @first a\n * @second b\n */", |_, _| {
                        Ok(Content::Empty)
                    })
                    .construct(|_| Ok(Shelf))
                    .build(),
            )
            .unwrap();

        let processor = AnnotationProcessor::new();
        processor.add(&container, "test::first").unwrap();
        processor.add(&container, "test::second").unwrap();
        processor.add_namespace("app::");
        processor.run(&container).unwrap();

        assert_eq!(
            *order.lock(),
            vec!["first:m1", "first:m2", "second:m1", "second:m2"]
        );
    }

    #[test]
    fn test_namespace_allow_list() {
        let container = container();
        let processor = AnnotationProcessor::new();
        processor.add(&container, "test::Recorder").unwrap();
        processor.add_namespace("other::");
        processor.run(&container).unwrap();

        let recorder = container.get::<Recorder>("test::Recorder").unwrap();
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn test_missing_descriptor_is_reflection_error() {
        let container = container();
        container.register("app::Ghost", None).unwrap();
        let processor = AnnotationProcessor::new();
        processor.add(&container, "test::Recorder").unwrap();

        assert!(matches!(
            processor.run(&container),
            Err(Error::Reflection(_))
        ));
    }

    #[test]
    fn test_flattened_multiline_doc() {
        let regex = AnnotationProcessor::compile(&Recorder::default()).unwrap();
        let comment = "/**\r\n * Lists things\r\n * @tag books\r\n */".replace(['\r', '\n'], " ");
        let caps = regex.captures(&comment).unwrap();
        assert_eq!(&caps[1], "books");
    }
}
