#![cfg(feature = "axum-integration")]

use axum::{
    body::Body,
    extract::FromRef,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use singletondep::generator;
use singletondep::{
    serve_with_lifecycle, BoxError, Dep, LifecycleHooks, LifecycleSingleton, SharedSingleton,
    ShutdownPolicy,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

#[derive(Clone)]
struct Settings {
    greeting: String,
}

#[derive(Clone)]
struct AppState {
    greeting: SharedSingleton<String, Settings>,
}

impl FromRef<AppState> for SharedSingleton<String, Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.greeting.clone()
    }
}

async fn handle_test(greeting: Dep<String, Settings>) -> String {
    greeting.to_string()
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/test", get(handle_test))
        .with_state(state)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get_test() -> Request<Body> {
    Request::builder().uri("/test").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_extractor_serves_value_after_startup() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let greeting = SharedSingleton::new(LifecycleSingleton::from_value(move |s: Settings| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(s.greeting)
    }));

    let mut hooks = LifecycleHooks::new();
    greeting.register(
        &mut hooks,
        Settings {
            greeting: "DEPENDENCY_VALUE".to_string(),
        },
        ShutdownPolicy::default(),
    );
    hooks.run_startup().await.unwrap();

    let router = app(AppState {
        greeting: greeting.clone(),
    });
    for _ in 0..2 {
        let response = router.clone().oneshot(get_test()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "DEPENDENCY_VALUE");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    hooks.run_shutdown().await.unwrap();
}

#[tokio::test]
async fn test_extractor_rejects_before_startup() {
    let greeting: SharedSingleton<String, Settings> =
        LifecycleSingleton::from_value(|s: Settings| Ok(s.greeting))
            .with_name("greeting")
            .into();

    let response = app(AppState { greeting })
        .oneshot(get_test())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_string(response).await,
        "singleton `greeting` is not initialized"
    );
}

#[tokio::test]
async fn test_serve_with_lifecycle_runs_hooks_around_server() {
    let cleaned = Arc::new(AtomicBool::new(false));
    let flag = cleaned.clone();
    let greeting = SharedSingleton::new(LifecycleSingleton::from_async_generator(
        move |s: Settings| {
            let flag = flag.clone();
            generator::acquire_release(async move {
                let release = move || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                };
                Ok::<_, BoxError>((s.greeting, release))
            })
        },
    ));

    let mut hooks = LifecycleHooks::new();
    greeting.register(
        &mut hooks,
        Settings {
            greeting: "hello".to_string(),
        },
        ShutdownPolicy::default(),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let router = app(AppState {
        greeting: greeting.clone(),
    });

    // The server shuts down as soon as it has been observed serving
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let observer = greeting.clone();
    let server = tokio::spawn(async move {
        let hooks = hooks;
        serve_with_lifecycle(listener, router, &hooks, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    // Startup hooks run before the server accepts connections
    while !observer.is_initialized().await {
        tokio::task::yield_now().await;
    }
    assert_eq!(*observer.access().await.unwrap(), "hello");
    assert!(!cleaned.load(Ordering::SeqCst));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert!(cleaned.load(Ordering::SeqCst));
    assert!(!observer.is_initialized().await);
}

#[tokio::test]
async fn test_serve_with_lifecycle_reports_startup_failure() {
    let failing: SharedSingleton<String> = LifecycleSingleton::from_value(|()| {
        Err::<String, BoxError>("database unreachable".into())
    })
    .into();
    let mut hooks = LifecycleHooks::new();
    failing.register(&mut hooks, (), ShutdownPolicy::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let err = serve_with_lifecycle(listener, Router::new(), &hooks, std::future::pending())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "database unreachable");
}

#[tokio::test]
async fn test_startup_failure_logs_shutdown_error() {
    let (_guard, logs) = common::capture_logs();

    // Strict shutdown of a never-initialized singleton fails with AlreadyClean
    let failing: SharedSingleton<String> = LifecycleSingleton::from_value(|()| {
        Err::<String, BoxError>("database unreachable".into())
    })
    .with_name("db")
    .into();
    let mut hooks = LifecycleHooks::new();
    failing.register(&mut hooks, (), ShutdownPolicy::Strict);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let err = serve_with_lifecycle(listener, Router::new(), &hooks, std::future::pending())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "database unreachable");

    let logged = logs.lines_with(&["ERROR", "shutdown after failed startup also failed"]);
    assert_eq!(logged.len(), 1, "{}", logs.contents());
    assert!(logged[0].contains("singleton `db` has nothing to clean up"));
    assert!(logged[0].contains("database unreachable"));
}
