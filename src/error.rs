//! Error types for singleton lifecycle operations.

use thiserror::Error;

/// Boxed error produced by user-supplied factory or teardown code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running user-supplied factory or teardown code.
pub type FactoryResult<T> = Result<T, BoxError>;

/// Lifecycle errors
///
/// The first five variants are usage errors raised by the state machine itself.
/// They carry the singleton's name so a host juggling several singletons can
/// tell which one was misused. [`SingletonError::Factory`] wraps whatever the
/// wrapped factory returned and is passed through untouched.
///
/// # Examples
///
/// ```rust
/// use singletondep::SingletonError;
///
/// let err = SingletonError::NotInitialized("db_pool");
/// assert_eq!(err.to_string(), "singleton `db_pool` is not initialized");
/// assert!(SingletonError::AlreadyClean("db_pool").is_already_clean());
/// ```
#[derive(Debug, Error)]
pub enum SingletonError {
    /// `access()` before a successful `init()`
    #[error("singleton `{0}` is not initialized")]
    NotInitialized(&'static str),
    /// `init()` while a value is already held
    #[error("singleton `{0}` is already initialized")]
    AlreadyInitialized(&'static str),
    /// `cleanup()` with no pending finalizer
    #[error("singleton `{0}` has nothing to clean up")]
    AlreadyClean(&'static str),
    /// The generator yielded again instead of completing during `cleanup()`
    #[error("singleton `{0}` has a malformed finalizer: generator must yield exactly once")]
    MalformedFinalizer(&'static str),
    /// The generator completed before yielding its value during `init()`
    #[error("singleton `{0}` generator completed without yielding a value")]
    NothingYielded(&'static str),
    /// Failure raised by the factory or its teardown code
    #[error(transparent)]
    Factory(#[from] BoxError),
}

impl SingletonError {
    /// Returns true for the error hosts usually swallow at shutdown.
    pub fn is_already_clean(&self) -> bool {
        matches!(self, SingletonError::AlreadyClean(_))
    }

    /// Returns true if the error came from user code rather than from misuse.
    pub fn is_factory_error(&self) -> bool {
        matches!(self, SingletonError::Factory(_))
    }
}

/// Result type for singleton operations
pub type SingletonResult<T> = Result<T, SingletonError>;
