use lintel_core::{Class, Container, Content, Error, Handler, Instance};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {}", name)
    }
}

struct Welcome {
    greeter: Arc<dyn Greeter>,
}

fn container() -> Container {
    let container = Container::new();
    container
        .define(
            Class::<English>::new("app::English")
                .implements("app::Greeter", |g| g as Arc<dyn Greeter>)
                .construct(|_| Ok(English))
                .build(),
        )
        .unwrap();
    container
        .register("app::Greeter", Some("app::English"))
        .unwrap();
    container
        .provide(
            Class::<Welcome>::new("app::Welcome")
                .inject("app::Greeter")
                .construct(|args| {
                    Ok(Welcome {
                        greeter: args.service::<dyn Greeter>()?,
                    })
                })
                .method("hello", |welcome, args| {
                    let name = args.first().map(String::as_str).unwrap_or("world");
                    Ok(Content::Html(welcome.greeter.greet(name)))
                })
                .build(),
        )
        .unwrap();
    container
}

#[test]
fn test_resolve_through_interface() {
    let container = container();
    let greeter = container.get::<dyn Greeter>("app::Greeter").unwrap();
    assert_eq!(greeter.greet("Ada"), "Hello, Ada");
}

#[test]
fn test_singleton_per_key() {
    let container = container();
    let first = container.resolve("app::Welcome").unwrap();
    let second = container.resolve("app::Welcome").unwrap();
    let greeter = container.resolve("app::Greeter").unwrap();

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&greeter));
}

#[test]
fn test_injected_dependency_is_the_cached_one() {
    let container = container();
    let welcome = container.get::<Welcome>("app::Welcome").unwrap();
    let greeter = container.get::<dyn Greeter>("app::Greeter").unwrap();
    assert!(Arc::ptr_eq(&welcome.greeter, &greeter));
}

#[test]
fn test_unknown_binding() {
    let container = Container::new();
    assert!(matches!(
        container.resolve("app::Nothing"),
        Err(Error::UnknownBinding(_))
    ));
}

#[test]
fn test_cycle_names_the_chain() {
    struct Node;

    let container = Container::new();
    for (key, dependency) in [("app::A", "app::B"), ("app::B", "app::C"), ("app::C", "app::A")] {
        container
            .provide(
                Class::<Node>::new(key)
                    .inject(dependency)
                    .construct(|_| Ok(Node))
                    .build(),
            )
            .unwrap();
    }

    let err = container.resolve("app::B").err().unwrap();
    assert_eq!(err.kind(), "CycleError");
    assert_eq!(
        err.to_string(),
        "Circular dependency: app::B <- app::C <- app::A <- app::B"
    );
}

#[test]
fn test_missing_dependency_message() {
    let container = Container::new();
    container
        .provide(
            Class::<Welcome>::new("app::Welcome")
                .inject("app::Greeter")
                .construct(|args| {
                    Ok(Welcome {
                        greeter: args.service::<dyn Greeter>()?,
                    })
                })
                .build(),
        )
        .unwrap();

    let err = container.resolve("app::Welcome").err().unwrap();
    assert_eq!(
        err.to_string(),
        "Non existing dependency `app::Greeter` for `app::Welcome`"
    );
}

#[test]
fn test_class_without_constructor_fails_to_build() {
    let container = Container::new();
    container
        .provide(Class::<English>::new("app::Lazy").build())
        .unwrap();
    assert!(matches!(
        container.resolve("app::Lazy"),
        Err(Error::Construction(_))
    ));
}

#[test]
fn test_bound_handler_uses_cached_owner() {
    let container = container();
    let callable = container
        .callable(&Handler::bound("app::Welcome", "hello"))
        .unwrap();

    assert_eq!(
        callable(&["Grace".to_string()]).unwrap(),
        Content::Html("Hello, Grace".to_string())
    );
    assert_eq!(
        callable(&[]).unwrap(),
        Content::Html("Hello, world".to_string())
    );
}

#[test]
fn test_instance_view_through_seeded_value() {
    let container = Container::new();
    let english = Arc::new(English);
    container
        .instance(
            "app::Greeter",
            Instance::new("app::English", english.clone())
                .with_view(|g: Arc<English>| g as Arc<dyn Greeter>),
        )
        .unwrap();

    let concrete = container.get::<English>("app::Greeter").unwrap();
    assert!(Arc::ptr_eq(&concrete, &english));
    assert_eq!(container.class_for("app::Greeter").unwrap(), "app::English");
}

#[test]
fn test_concurrent_resolves_construct_once() {
    static BUILDS: AtomicUsize = AtomicUsize::new(0);
    static HOOKS: AtomicUsize = AtomicUsize::new(0);

    let container = container();
    container
        .provide(
            Class::<English>::new("app::Shared")
                .construct(|_| {
                    BUILDS.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    Ok(English)
                })
                .post_construct(|_| {
                    HOOKS.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let instances: Vec<Instance> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| container.resolve("app::Shared").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    assert_eq!(HOOKS.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
}
