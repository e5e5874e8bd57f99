pub mod error;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(app_state.max_upload_bytes);

    Router::new()
        // Upload intake
        .route("/api/upload", post(routes::upload::upload))
        .route("/api/uploadExam", post(routes::upload::upload_exam))
        // Solve triggers
        .route(
            "/api/solve",
            get(routes::solve::solve).post(routes::solve::solve),
        )
        .route(
            "/api/examSolve",
            get(routes::solve::exam_solve).post(routes::solve::exam_solve),
        )
        .route("/api/solve/status", get(routes::solve::status))
        // Queries
        .route("/api/modules", get(routes::query::modules))
        .route("/api/halls", get(routes::query::halls))
        .route("/api/solver-results", get(routes::query::solver_results))
        .route(
            "/api/solver-exam-results",
            get(routes::query::solver_exam_results),
        )
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the planner API on a pre-bound listener and run until Ctrl-C.
///
/// The caller binds so it can report the actual port first (`port = 0` lets
/// the OS pick one).
pub async fn serve_on(root: &Path, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(AppState::load(root)?);

    tracing::info!("planner API listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
