//! Startup/shutdown wiring for hosting processes.
//!
//! A host only has to offer two registration points: one for actions to run
//! when the process starts serving and one for when it stops.
//! [`LifecycleHooks`] is a ready-made host that a process's startup code owns
//! and drives; web frameworks with their own hooks can implement
//! [`LifecycleHost`] instead.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::error::{SingletonError, SingletonResult};
use crate::factory::BoxFuture;
use crate::singleton::LifecycleSingleton;

type Hook = Box<dyn Fn() -> BoxFuture<'static, SingletonResult<()>> + Send + Sync>;

/// Registration points offered by a host process.
pub trait LifecycleHost {
    /// Registers an action to run when the process starts serving.
    fn on_startup<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SingletonResult<()>> + Send + 'static;

    /// Registers an action to run when the process stops serving.
    fn on_shutdown<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SingletonResult<()>> + Send + 'static;
}

/// What a shutdown hook does when the singleton has nothing to clean up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Swallow `AlreadyClean`, making shutdown idempotent
    #[default]
    IgnoreAlreadyClean,
    /// Report `AlreadyClean` like any other error
    Strict,
}

/// Ordered startup and shutdown hooks owned by the process orchestrator.
///
/// Startup hooks run in registration order. Shutdown hooks run in reverse
/// registration order, so resources are released in the opposite order
/// they were acquired.
///
/// # Examples
///
/// ```rust
/// use singletondep::{LifecycleHooks, LifecycleSingleton, SharedSingleton, ShutdownPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), singletondep::SingletonError> {
/// let client = SharedSingleton::new(
///     LifecycleSingleton::from_value(|base_url: String| Ok(format!("client for {base_url}"))),
/// );
///
/// let mut hooks = LifecycleHooks::new();
/// client.register(&mut hooks, "https://api.local".to_string(), ShutdownPolicy::default());
///
/// hooks.run_startup().await?;
/// assert_eq!(*client.access().await?, "client for https://api.local");
/// hooks.run_shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct LifecycleHooks {
    startup: Vec<Hook>,
    shutdown: Vec<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs startup hooks in registration order, stopping at the first failure.
    pub async fn run_startup(&self) -> SingletonResult<()> {
        debug!(hooks = self.startup.len(), "running startup hooks");
        for hook in &self.startup {
            hook().await?;
        }
        Ok(())
    }

    /// Runs every shutdown hook in reverse registration order.
    ///
    /// A failing hook does not stop the remaining ones; the first failure is
    /// returned once all hooks have run.
    pub async fn run_shutdown(&self) -> SingletonResult<()> {
        debug!(hooks = self.shutdown.len(), "running shutdown hooks");
        let mut first_error = None;
        for hook in self.shutdown.iter().rev() {
            if let Err(err) = hook().await {
                error!(error = %err, "shutdown hook failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn startup_len(&self) -> usize {
        self.startup.len()
    }

    pub fn shutdown_len(&self) -> usize {
        self.shutdown.len()
    }
}

impl LifecycleHost for LifecycleHooks {
    fn on_startup<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SingletonResult<()>> + Send + 'static,
    {
        self.startup
            .push(Box::new(move || -> BoxFuture<'static, SingletonResult<()>> {
                Box::pin(hook())
            }));
    }

    fn on_shutdown<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SingletonResult<()>> + Send + 'static,
    {
        self.shutdown
            .push(Box::new(move || -> BoxFuture<'static, SingletonResult<()>> {
                Box::pin(hook())
            }));
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("startup", &format!("{} hooks", self.startup.len()))
            .field("shutdown", &format!("{} hooks", self.shutdown.len()))
            .finish()
    }
}

/// Cloneable handle to a singleton shared between tasks.
///
/// Every operation goes through one async mutex, which provides the
/// serialization of `init()`/`cleanup()` that [`LifecycleSingleton`] leaves
/// to its caller.
pub struct SharedSingleton<T, A = ()> {
    inner: Arc<Mutex<LifecycleSingleton<T, A>>>,
}

impl<T, A> Clone for SharedSingleton<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A> From<LifecycleSingleton<T, A>> for SharedSingleton<T, A> {
    fn from(singleton: LifecycleSingleton<T, A>) -> Self {
        Self::new(singleton)
    }
}

impl<T, A> SharedSingleton<T, A> {
    pub fn new(singleton: LifecycleSingleton<T, A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(singleton)),
        }
    }

    /// Returns the held value.
    pub async fn access(&self) -> SingletonResult<Arc<T>> {
        self.inner.lock().await.access()
    }

    pub async fn is_clean(&self) -> bool {
        self.inner.lock().await.is_clean()
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.is_initialized()
    }

    /// Locks the singleton for a sequence of operations.
    pub async fn lock(&self) -> MutexGuard<'_, LifecycleSingleton<T, A>> {
        self.inner.lock().await
    }
}

impl<T, A> SharedSingleton<T, A>
where
    T: Send + Sync + 'static,
    A: Send + 'static,
{
    /// Runs the factory; concurrent callers queue on the lock and all but the
    /// first see `AlreadyInitialized`.
    pub async fn init(&self, args: A) -> SingletonResult<()> {
        self.inner.lock().await.init(args).await
    }

    /// Runs the pending teardown.
    pub async fn cleanup(&self) -> SingletonResult<()> {
        self.inner.lock().await.cleanup().await
    }

    /// Registers `init(config)` at startup and `cleanup()` at shutdown.
    ///
    /// The configuration value is cloned into each startup run and otherwise
    /// forwarded untouched.
    pub fn register<H>(&self, host: &mut H, config: A, policy: ShutdownPolicy)
    where
        H: LifecycleHost,
        A: Clone + Sync,
    {
        let singleton = self.clone();
        host.on_startup(move || {
            let singleton = singleton.clone();
            let config = config.clone();
            async move { singleton.init(config).await }
        });

        let singleton = self.clone();
        host.on_shutdown(move || {
            let singleton = singleton.clone();
            async move {
                match singleton.cleanup().await {
                    Err(SingletonError::AlreadyClean(name))
                        if policy == ShutdownPolicy::IgnoreAlreadyClean =>
                    {
                        debug!(singleton = name, "nothing to clean up at shutdown");
                        Ok(())
                    }
                    result => result,
                }
            }
        });
    }
}

impl<T, A> fmt::Debug for SharedSingleton<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Ok(singleton) => f.debug_tuple("SharedSingleton").field(&*singleton).finish(),
            Err(_) => f.write_str("SharedSingleton(<locked>)"),
        }
    }
}
