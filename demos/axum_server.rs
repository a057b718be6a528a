//! A small axum service whose connection pool lives for one server run.
//!
//! ```text
//! DEMO_BIND_ADDR=127.0.0.1:3000 DEMO_POOL_SIZE=4 \
//!     cargo run --example axum_server --features axum-integration,config
//! ```

use axum::{extract::FromRef, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use singletondep::config::{load_settings, EnvironmentConfigSource};
use singletondep::{
    generator, serve_with_lifecycle, BoxError, Dep, LifecycleHooks, LifecycleSingleton,
    SharedSingleton, ShutdownPolicy,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Deserialize)]
struct Settings {
    #[serde(default = "default_bind_addr")]
    bind_addr: String,
    #[serde(default = "default_pool_size")]
    pool_size: u32,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_pool_size() -> u32 {
    8
}

/// Stand-in for a database pool
struct Pool {
    size: u32,
    queries: AtomicU64,
}

#[derive(Serialize)]
struct Status {
    pool_size: u32,
    queries: u64,
}

#[derive(Clone)]
struct AppState {
    pool: SharedSingleton<Pool, Settings>,
}

impl FromRef<AppState> for SharedSingleton<Pool, Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

async fn status(pool: Dep<Pool, Settings>) -> Json<Status> {
    let queries = pool.queries.fetch_add(1, Ordering::Relaxed) + 1;
    Json(Status {
        pool_size: pool.size,
        queries,
    })
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,singletondep=debug")),
        )
        .init();

    let settings: Settings = load_settings(&EnvironmentConfigSource::with_prefix("demo"))?;

    let pool = SharedSingleton::new(
        LifecycleSingleton::from_async_generator(|settings: Settings| {
            generator::acquire_release(async move {
                info!(size = settings.pool_size, "opening pool");
                let pool = Pool {
                    size: settings.pool_size,
                    queries: AtomicU64::new(0),
                };
                let release = || async {
                    info!("closing pool");
                    Ok::<(), BoxError>(())
                };
                Ok::<_, BoxError>((pool, release))
            })
        })
        .with_name("pool"),
    );

    let mut hooks = LifecycleHooks::new();
    pool.register(&mut hooks, settings.clone(), ShutdownPolicy::default());

    let router = Router::new()
        .route("/status", get(status))
        .with_state(AppState { pool });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "listening");

    serve_with_lifecycle(listener, router, &hooks, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
