//! `casegen-server` — binds the axum router from `casegen_api::router` to a
//! TCP listener and starts the orchestrator's background tasks (event loop,
//! recovery sweep), matching how the teacher's `gate`/`arbiter` binaries
//! initialize tracing then `axum::serve` (spec.md §6, §9 "Coroutine / async").

use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use casegen_api::bootstrap;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = bootstrap::build();

    let app = casegen_api::router(runtime.orchestrator).layer(TraceLayer::new_for_http());

    let port = std::env::var("CASEGEN_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");

    tracing::info!(%addr, "casegen-server listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {addr}: {err}"));
    axum::serve(listener, app).await.unwrap_or_else(|err| panic!("server exited: {err}"));
}
