//! Unit tests for SingletonError and SingletonResult

use singletondep::{BoxError, SingletonError, SingletonResult};
use std::error::Error;

#[test]
fn test_error_display_not_initialized() {
    let error = SingletonError::NotInitialized("db_pool");
    assert_eq!(error.to_string(), "singleton `db_pool` is not initialized");
}

#[test]
fn test_error_display_already_initialized() {
    let error = SingletonError::AlreadyInitialized("db_pool");
    assert_eq!(error.to_string(), "singleton `db_pool` is already initialized");
}

#[test]
fn test_error_display_already_clean() {
    let error = SingletonError::AlreadyClean("http_client");
    assert_eq!(error.to_string(), "singleton `http_client` has nothing to clean up");
}

#[test]
fn test_error_display_malformed_finalizer() {
    let error = SingletonError::MalformedFinalizer("cache");
    let display_str = error.to_string();
    assert!(display_str.contains("`cache`"));
    assert!(display_str.contains("exactly once"));
}

#[test]
fn test_error_display_nothing_yielded() {
    let error = SingletonError::NothingYielded("cache");
    assert_eq!(
        error.to_string(),
        "singleton `cache` generator completed without yielding a value"
    );
}

#[test]
fn test_factory_error_is_transparent() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    let error = SingletonError::from(Box::new(io) as BoxError);

    // Display and source pass straight through to the factory's error
    assert_eq!(error.to_string(), "connection refused");
    assert!(error.is_factory_error());
    assert!(!error.is_already_clean());

    let SingletonError::Factory(inner) = error else {
        panic!("expected Factory variant");
    };
    let io = inner.downcast::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
}

#[test]
fn test_usage_errors_have_no_source() {
    let errors = [
        SingletonError::NotInitialized("a"),
        SingletonError::AlreadyInitialized("a"),
        SingletonError::AlreadyClean("a"),
        SingletonError::MalformedFinalizer("a"),
        SingletonError::NothingYielded("a"),
    ];
    for error in &errors {
        assert!(error.source().is_none());
        assert!(!error.is_factory_error());
    }
    assert_eq!(errors.iter().filter(|e| e.is_already_clean()).count(), 1);
}

#[test]
fn test_singleton_result_err() {
    let result: SingletonResult<String> = Err(SingletonError::NotInitialized("svc"));
    match result {
        Err(SingletonError::NotInitialized(name)) => assert_eq!(name, "svc"),
        _ => panic!("Expected NotInitialized error"),
    }
}

#[test]
fn test_error_debug_format() {
    let debug_str = format!("{:?}", SingletonError::AlreadyClean("svc"));
    assert!(debug_str.contains("AlreadyClean"));
    assert!(debug_str.contains("svc"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<SingletonError>();

    // Converts into a boxed error for `?` in application code
    let boxed: BoxError = SingletonError::AlreadyClean("svc").into();
    assert_eq!(boxed.to_string(), "singleton `svc` has nothing to clean up");
}
