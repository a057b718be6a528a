//! # singletondep
//!
//! Lifecycle-managed singletons for request-serving processes.
//!
//! A [`LifecycleSingleton`] wraps a factory and guarantees it runs at most
//! once per startup/shutdown cycle. Readers share the produced value through
//! [`access()`](LifecycleSingleton::access); generator-shaped factories get
//! their teardown run exactly once by [`cleanup()`](LifecycleSingleton::cleanup).
//!
//! ## Factory Shapes
//!
//! - **Value**: returns the value synchronously, nothing to tear down
//! - **Future**: returns the value from a future, nothing to tear down
//! - **Generator**: yields the value, tears down on the next resume
//! - **AsyncGenerator**: same as Generator with async acquire and release
//!
//! The shape is picked by the constructor, never guessed at runtime.
//!
//! ## Quick Start
//!
//! ```rust
//! use singletondep::{generator, BoxError, LifecycleSingleton, SingletonError};
//!
//! struct Pool {
//!     url: String,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SingletonError> {
//! let mut pool = LifecycleSingleton::from_async_generator(|url: String| {
//!     generator::acquire_release(async move {
//!         let pool = Pool { url };
//!         let release = || async { Ok::<(), BoxError>(()) };
//!         Ok::<_, BoxError>((pool, release))
//!     })
//! });
//!
//! pool.init("postgres://localhost".to_string()).await?;
//! assert_eq!(pool.access()?.url, "postgres://localhost");
//! assert!(!pool.is_clean());
//!
//! pool.cleanup().await?;
//! assert!(pool.is_clean());
//! assert!(pool.access().is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Hosting
//!
//! With the `host` feature (on by default), [`SharedSingleton`] and
//! [`LifecycleHooks`] wire singletons into a process's startup and shutdown.
//! The `axum-integration` feature adds a request extractor and a serve helper.

pub mod error;
pub mod factory;
pub mod generator;
pub mod singleton;

#[cfg(feature = "host")]
pub mod host;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

#[cfg(feature = "config")]
pub mod config;

pub use error::{BoxError, FactoryResult, SingletonError, SingletonResult};
pub use factory::{BoxFuture, Factory, FactoryShape};
pub use generator::{AsyncGenerator, Generator, Step};
pub use singleton::LifecycleSingleton;

#[cfg(feature = "host")]
pub use host::{LifecycleHooks, LifecycleHost, SharedSingleton, ShutdownPolicy};

#[cfg(feature = "axum-integration")]
pub use axum_integration::{serve_with_lifecycle, Dep, DepRejection};
