//! The lifecycle state machine.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{FactoryResult, SingletonError, SingletonResult};
use crate::factory::{Factory, FactoryShape};
use crate::generator::{AsyncGenerator, Generator, Step};

/// Suspended generator awaiting its teardown resume.
enum PendingFinalizer<T> {
    Sync(Box<dyn Generator<T>>),
    Async(Box<dyn AsyncGenerator<T>>),
}

enum State<T> {
    Uninitialized,
    Holding {
        value: Arc<T>,
        // Only generator shapes leave a finalizer behind
        finalizer: Option<PendingFinalizer<T>>,
    },
}

/// A singleton whose factory runs at most once per init/cleanup cycle.
///
/// The singleton moves between two states. `init()` runs the factory and
/// stores its value; `access()` hands out the stored value; `cleanup()` runs
/// the teardown half of a generator factory and empties the slot again.
///
/// | State | `access()` | `init()` | `cleanup()` |
/// |---|---|---|---|
/// | uninitialized | `NotInitialized` | runs factory | `AlreadyClean` |
/// | holding, no finalizer | value | `AlreadyInitialized` | `AlreadyClean` |
/// | holding, finalizer | value | `AlreadyInitialized` | runs teardown |
///
/// No locking happens inside. `init()` and `cleanup()` take `&mut self`, so a
/// host sharing the singleton between tasks must serialize those calls
/// itself, e.g. with [`SharedSingleton`](crate::SharedSingleton).
///
/// # Examples
///
/// ```rust
/// use singletondep::{generator, LifecycleSingleton, SingletonError};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), SingletonError> {
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let mut db = LifecycleSingleton::from_generator(move |url: &'static str| {
///     let flag = flag.clone();
///     let conn = format!("connection to {url}");
///     generator::once(conn, move || {
///         flag.store(true, Ordering::SeqCst);
///         Ok(())
///     })
/// });
///
/// db.init("postgres://localhost").await?;
/// assert_eq!(*db.access()?, "connection to postgres://localhost");
///
/// db.cleanup().await?;
/// assert!(closed.load(Ordering::SeqCst));
/// assert!(matches!(db.access(), Err(SingletonError::NotInitialized(_))));
/// # Ok(())
/// # }
/// ```
pub struct LifecycleSingleton<T, A = ()> {
    name: &'static str,
    factory: Factory<T, A>,
    state: State<T>,
}

impl<T, A> LifecycleSingleton<T, A>
where
    T: Send + Sync + 'static,
    A: 'static,
{
    /// Wraps an already tagged factory.
    pub fn new(factory: Factory<T, A>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            factory,
            state: State::Uninitialized,
        }
    }

    /// Wraps a factory that returns its value synchronously.
    pub fn from_value<F>(f: F) -> Self
    where
        F: Fn(A) -> FactoryResult<T> + Send + Sync + 'static,
    {
        Self::new(Factory::value(f))
    }

    /// Wraps a factory that returns its value from a future.
    pub fn from_future<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FactoryResult<T>> + Send + 'static,
    {
        Self::new(Factory::future(f))
    }

    /// Wraps a factory that builds a suspend-once [`Generator`].
    pub fn from_generator<F, G>(f: F) -> Self
    where
        F: Fn(A) -> G + Send + Sync + 'static,
        G: Generator<T> + 'static,
    {
        Self::new(Factory::generator(f))
    }

    /// Wraps a factory that builds a suspend-once [`AsyncGenerator`].
    pub fn from_async_generator<F, G>(f: F) -> Self
    where
        F: Fn(A) -> G + Send + Sync + 'static,
        G: AsyncGenerator<T> + 'static,
    {
        Self::new(Factory::async_generator(f))
    }

    /// Sets the name used in errors and log records.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Runs the factory and stores the value it produces.
    ///
    /// Generator shapes are resumed up to their first yield and kept as the
    /// pending finalizer. A factory failure leaves the singleton uninitialized.
    ///
    /// # Errors
    ///
    /// - [`SingletonError::AlreadyInitialized`] if a value is already held
    /// - [`SingletonError::NothingYielded`] if a generator completed without yielding
    /// - [`SingletonError::Factory`] for failures raised by the factory itself
    pub async fn init(&mut self, args: A) -> SingletonResult<()> {
        if self.is_initialized() {
            return Err(SingletonError::AlreadyInitialized(self.name));
        }

        let (value, finalizer) = match &self.factory {
            Factory::Value(f) => (f(args)?, None),
            Factory::Future(f) => (f(args).await?, None),
            Factory::Generator(f) => {
                let mut generator = f(args);
                match generator.resume()? {
                    Step::Yielded(value) => (value, Some(PendingFinalizer::Sync(generator))),
                    Step::Complete => return Err(SingletonError::NothingYielded(self.name)),
                }
            }
            Factory::AsyncGenerator(f) => {
                let mut generator = f(args);
                match generator.resume().await? {
                    Step::Yielded(value) => (value, Some(PendingFinalizer::Async(generator))),
                    Step::Complete => return Err(SingletonError::NothingYielded(self.name)),
                }
            }
        };

        self.state = State::Holding {
            value: Arc::new(value),
            finalizer,
        };
        debug!(singleton = self.name, shape = %self.shape(), "singleton initialized");
        Ok(())
    }

    /// Runs the teardown half of a generator factory.
    ///
    /// The slot is emptied before the teardown runs, so the singleton is
    /// uninitialized afterwards whether or not the teardown succeeds.
    ///
    /// # Errors
    ///
    /// - [`SingletonError::AlreadyClean`] if there is no pending finalizer; a
    ///   value held by a value or future factory is left in place
    /// - [`SingletonError::MalformedFinalizer`] if the generator yielded again
    /// - [`SingletonError::Factory`] for failures raised by the teardown code
    pub async fn cleanup(&mut self) -> SingletonResult<()> {
        let finalizer = match &mut self.state {
            State::Holding { finalizer, .. } => finalizer.take(),
            State::Uninitialized => None,
        };
        let Some(finalizer) = finalizer else {
            return Err(SingletonError::AlreadyClean(self.name));
        };
        self.state = State::Uninitialized;

        let step = match finalizer {
            PendingFinalizer::Sync(mut generator) => generator.resume(),
            PendingFinalizer::Async(mut generator) => generator.resume().await,
        };

        match step? {
            Step::Complete => {
                debug!(singleton = self.name, "singleton cleaned up");
                Ok(())
            }
            Step::Yielded(_) => {
                warn!(singleton = self.name, "finalizer yielded a second value");
                Err(SingletonError::MalformedFinalizer(self.name))
            }
        }
    }
}

impl<T, A> LifecycleSingleton<T, A> {
    /// Returns the held value.
    ///
    /// # Errors
    ///
    /// [`SingletonError::NotInitialized`] when no value is held.
    pub fn access(&self) -> SingletonResult<Arc<T>> {
        match &self.state {
            State::Holding { value, .. } => Ok(Arc::clone(value)),
            State::Uninitialized => Err(SingletonError::NotInitialized(self.name)),
        }
    }

    /// Returns true if no teardown is pending.
    ///
    /// Always true for value and future factories.
    pub fn is_clean(&self) -> bool {
        !matches!(
            self.state,
            State::Holding {
                finalizer: Some(_),
                ..
            }
        )
    }

    /// Returns true while a value is held.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Holding { .. })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The factory shape fixed at construction.
    pub fn shape(&self) -> FactoryShape {
        self.factory.shape()
    }
}

impl<T, A> fmt::Debug for LifecycleSingleton<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSingleton")
            .field("name", &self.name)
            .field("shape", &self.shape())
            .field("initialized", &self.is_initialized())
            .field("clean", &self.is_clean())
            .finish()
    }
}

impl<T, A> Drop for LifecycleSingleton<T, A> {
    fn drop(&mut self) {
        if !self.is_clean() {
            warn!(
                singleton = self.name,
                "singleton dropped with a pending finalizer; call cleanup() before dropping"
            );
        }
    }
}
