//! Integration tests for the lazy service registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use rstest::rstest;
use serde_json::json;

use cmswire::application::registry::handle;
use cmswire::application::{ApplicationError, ServiceRegistry};
use cmswire::domain::ServiceName;

fn counting_registry(calls: Arc<AtomicUsize>) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Config, move |_, _| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok(handle(format!("config#{n}")))
    });
    registry
}

// ============================================================
// Singleton and fresh resolution
// ============================================================

#[test]
fn given_singleton_when_resolved_twice_then_factory_runs_once() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(calls.clone());

    // Act
    let first = registry.get::<String>(ServiceName::Config).unwrap();
    let second = registry.get::<String>(ServiceName::Config).unwrap();

    // Assert
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(registry.is_cached(ServiceName::Config));
}

#[test]
fn given_fresh_when_resolved_then_new_value_and_cache_untouched() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(calls.clone());

    // Act
    let a = registry.fresh::<String>(ServiceName::Config, None).unwrap();
    let b = registry.fresh::<String>(ServiceName::Config, None).unwrap();

    // Assert
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!registry.is_cached(ServiceName::Config));
}

#[test]
fn given_cached_value_when_fresh_then_cached_value_survives() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(calls);
    let cached = registry.get::<String>(ServiceName::Config).unwrap();

    // Act
    let fresh = registry.fresh::<String>(ServiceName::Config, None).unwrap();
    let again = registry.get::<String>(ServiceName::Config).unwrap();

    // Assert
    assert_eq!(*cached, "config#0");
    assert_eq!(*fresh, "config#1");
    assert!(Arc::ptr_eq(&cached, &again));
}

#[test]
fn given_argument_when_fresh_then_factory_receives_it() {
    // Arrange
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Acl, |_, arg| {
        Ok(handle(arg.cloned().unwrap_or(json!(null))))
    });

    // Act
    let value = registry
        .fresh::<serde_json::Value>(ServiceName::Acl, Some(&json!(42)))
        .unwrap();

    // Assert
    assert_eq!(*value, json!(42));
}

#[test]
fn given_concurrent_first_calls_when_resolving_then_constructs_once() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(counting_registry(calls.clone()));

    // Act
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.get::<String>(ServiceName::Config).unwrap())
        })
        .collect();
    let values: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Assert
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
}

// ============================================================
// Name boundary
// ============================================================

#[rstest]
#[case("config")]
#[case("CONFIG")]
#[case("  Config ")]
fn given_name_in_any_case_when_resolve_by_name_then_finds_service(#[case] name: &str) {
    let registry = counting_registry(Arc::new(AtomicUsize::new(0)));

    let value = registry.resolve_by_name(name, None, false);

    assert!(value.is_ok());
}

#[test]
fn given_unknown_name_when_resolve_by_name_then_unknown_service() {
    let registry = ServiceRegistry::new();

    let err = registry.resolve_by_name("twig", None, false).unwrap_err();

    assert!(matches!(err, ApplicationError::UnknownService(name) if name == "twig"));
}

#[test]
fn given_known_but_unregistered_name_when_resolving_then_unknown_service() {
    let registry = ServiceRegistry::new();

    let err = registry.resolve(ServiceName::Mailer, None, false).unwrap_err();

    assert!(matches!(err, ApplicationError::UnknownService(_)));
}

#[test]
fn given_wrong_type_when_get_then_service_type_error() {
    let registry = counting_registry(Arc::new(AtomicUsize::new(0)));

    let err = registry.get::<u32>(ServiceName::Config).unwrap_err();

    assert!(matches!(err, ApplicationError::ServiceType { service, .. } if service == "config"));
}

// ============================================================
// Failures and dependencies
// ============================================================

#[test]
fn given_failing_factory_when_resolved_then_not_cached_and_retried() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Mailer, move |_, _| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ApplicationError::Config {
                message: "unknown mail transport: pigeon".into(),
            })
        } else {
            Ok(handle(7u8))
        }
    });

    // Act
    let first = registry.get::<u8>(ServiceName::Mailer);
    let second = registry.get::<u8>(ServiceName::Mailer);

    // Assert
    assert!(matches!(
        first,
        Err(ApplicationError::ServiceConstruction { ref service, .. }) if service == "mailer"
    ));
    assert_eq!(*second.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn given_missing_configuration_when_resolved_then_passes_through_unwrapped() {
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Database, |_, _| {
        Err(ApplicationError::MissingConfiguration {
            keys: vec!["database.name".into()],
        })
    });

    let err = registry.resolve(ServiceName::Database, None, false).unwrap_err();

    assert!(matches!(err, ApplicationError::MissingConfiguration { keys } if keys == ["database.name"]));
}

#[test]
fn given_dependent_factory_when_resolved_then_dependency_is_shared() {
    // Arrange
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Config, |_, _| Ok(handle(String::from("cms"))));
    registry.register(ServiceName::Database, |r, _| {
        let name = r.get::<String>(ServiceName::Config)?;
        Ok(handle(format!("db:{name}")))
    });

    // Act
    let db = registry.get::<String>(ServiceName::Database).unwrap();

    // Assert
    assert_eq!(*db, "db:cms");
    assert!(registry.is_cached(ServiceName::Config));
}

#[test]
fn given_mutual_dependency_when_resolved_then_circular_dependency() {
    // Arrange
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Auth, |r, _| {
        r.get::<u8>(ServiceName::Acl)?;
        Ok(handle(1u8))
    });
    registry.register(ServiceName::Acl, |r, _| {
        r.get::<u8>(ServiceName::Auth)?;
        Ok(handle(2u8))
    });

    // Act
    let err = registry.resolve(ServiceName::Auth, None, false).unwrap_err();

    // Assert
    match err {
        ApplicationError::CircularDependency { chain } => {
            assert_eq!(chain, vec!["auth", "acl", "auth"]);
        }
        other => panic!("expected circular dependency, got {other}"),
    }
    assert!(!registry.is_cached(ServiceName::Auth));
    assert!(!registry.is_cached(ServiceName::Acl));
}

#[test]
fn given_mutual_dependency_started_on_two_threads_when_resolved_then_both_fail_without_deadlock() {
    // Arrange: each factory waits until both initializations are underway
    let barrier = Arc::new(Barrier::new(2));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let (b, c) = (barrier.clone(), calls.clone());
    registry.register(ServiceName::Auth, move |r, _| {
        if c.fetch_add(1, Ordering::SeqCst) < 2 {
            b.wait();
        }
        r.get::<u8>(ServiceName::Acl)?;
        Ok(handle(1u8))
    });
    let (b, c) = (barrier, calls);
    registry.register(ServiceName::Acl, move |r, _| {
        if c.fetch_add(1, Ordering::SeqCst) < 2 {
            b.wait();
        }
        r.get::<u8>(ServiceName::Auth)?;
        Ok(handle(2u8))
    });
    let registry = Arc::new(registry);
    let (tx, rx) = mpsc::channel();

    // Act
    for name in [ServiceName::Auth, ServiceName::Acl] {
        let (registry, tx) = (registry.clone(), tx.clone());
        thread::spawn(move || {
            let _ = tx.send(registry.resolve(name, None, false).map(|_| ()));
        });
    }
    let results: Vec<_> = (0..2)
        .map(|_| {
            rx.recv_timeout(Duration::from_secs(5))
                .expect("resolution deadlocked")
        })
        .collect();

    // Assert
    for result in results {
        assert!(matches!(
            result,
            Err(ApplicationError::CircularDependency { .. })
        ));
    }
    assert!(!registry.is_cached(ServiceName::Auth));
    assert!(!registry.is_cached(ServiceName::Acl));
}

#[test]
fn test_names_are_sorted() {
    let mut registry = ServiceRegistry::new();
    registry.register(ServiceName::Hooks, |_, _| Ok(handle(())));
    registry.register(ServiceName::Config, |_, _| Ok(handle(())));

    assert_eq!(
        registry.names(),
        vec![ServiceName::Config, ServiceName::Hooks]
    );
}
