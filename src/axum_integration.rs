//! Axum web framework integration.
//!
//! - [`Dep`] extracts a singleton's value in a handler
//! - [`serve_with_lifecycle`] runs startup hooks, serves, then runs shutdown hooks

use crate::error::{BoxError, SingletonError};
use crate::host::{LifecycleHooks, SharedSingleton};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Extractor for a singleton's current value
///
/// The router state must provide a [`SharedSingleton<T, A>`] through
/// [`FromRef`]. `A` is the singleton's factory argument type.
///
/// ```rust,no_run
/// use axum::{extract::FromRef, routing::get, Router};
/// use singletondep::{Dep, LifecycleSingleton, SharedSingleton};
///
/// struct Settings { greeting: String }
///
/// #[derive(Clone)]
/// struct AppState {
///     greeting: SharedSingleton<String, Settings>,
/// }
///
/// impl FromRef<AppState> for SharedSingleton<String, Settings> {
///     fn from_ref(state: &AppState) -> Self {
///         state.greeting.clone()
///     }
/// }
///
/// async fn hello(greeting: Dep<String, Settings>) -> String {
///     greeting.to_string()
/// }
///
/// let state = AppState {
///     greeting: LifecycleSingleton::from_value(|s: Settings| Ok(s.greeting)).into(),
/// };
/// let app: Router = Router::new().route("/", get(hello)).with_state(state);
/// ```
pub struct Dep<T, A = ()> {
    value: Arc<T>,
    _args: PhantomData<fn() -> A>,
}

impl<T, A> Dep<T, A> {
    /// Returns the shared value
    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T, A> Deref for Dep<T, A> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[async_trait]
impl<S, T, A> FromRequestParts<S> for Dep<T, A>
where
    S: Send + Sync,
    SharedSingleton<T, A>: FromRef<S>,
    T: Send + Sync + 'static,
    A: 'static,
{
    type Rejection = DepRejection;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let singleton = SharedSingleton::<T, A>::from_ref(state);
        let value = singleton.access().await?;
        Ok(Dep {
            value,
            _args: PhantomData,
        })
    }
}

/// Rejection for [`Dep`] extraction failures
#[derive(Debug)]
pub struct DepRejection(pub SingletonError);

impl From<SingletonError> for DepRejection {
    fn from(err: SingletonError) -> Self {
        DepRejection(err)
    }
}

impl IntoResponse for DepRejection {
    fn into_response(self) -> Response {
        let status = match self.0 {
            // Requests racing startup or shutdown
            SingletonError::NotInitialized(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

/// Serves `router` between the startup and shutdown hooks.
///
/// Startup hooks run before the listener accepts connections. If one fails,
/// shutdown hooks run to release whatever was already acquired and the
/// startup error is returned. After `shutdown_signal` resolves and in-flight
/// requests drain, shutdown hooks run. A serve error takes precedence over a
/// shutdown hook error.
pub async fn serve_with_lifecycle<F>(
    listener: TcpListener,
    router: Router,
    hooks: &LifecycleHooks,
    shutdown_signal: F,
) -> Result<(), BoxError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(err) = hooks.run_startup().await {
        error!(error = %err, "startup failed, releasing acquired singletons");
        // The startup error is the one returned
        if let Err(shutdown_err) = hooks.run_shutdown().await {
            error!(
                error = %shutdown_err,
                startup_error = %err,
                "shutdown after failed startup also failed"
            );
        }
        return Err(err.into());
    }

    info!(addr = ?listener.local_addr().ok(), "serving");
    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await;
    info!("server stopped, running shutdown hooks");

    let shut_down = hooks.run_shutdown().await;
    served?;
    shut_down?;
    Ok(())
}
