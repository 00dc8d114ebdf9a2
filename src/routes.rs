// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{leaderboard, quiz, register};
use crate::state::AppState;

/// Assembles the main application router.
///
/// * Merges all sub-routers (quiz session, registration, leaderboard).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/start", post(quiz::start_quiz))
        .route(
            "/{session_id}",
            get(quiz::session_state).delete(quiz::teardown),
        )
        .route("/{session_id}/answer", post(quiz::submit_answer))
        .route("/{session_id}/advance", post(quiz::advance))
        .route("/{session_id}/restart", post(quiz::restart));

    let funnel_routes = Router::new()
        .route("/register", post(register::register))
        // Also serves any debugging/admin leaderboard view; there is no
        // separate admin query surface.
        .route("/leaderboard", get(leaderboard::get_leaderboard));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .nest("/api", funnel_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
