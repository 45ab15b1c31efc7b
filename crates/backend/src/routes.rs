use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{handlers, require_auth};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/logout", get(handlers::log_out))
        .route("/api/users/me", get(handlers::get_me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/api/healthchecker", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::sign_up))
        .route("/api/auth/login", post(handlers::sign_in))
        .route(
            "/api/sessions/oauth/google",
            get(handlers::google_oauth_callback),
        )
        .route(
            "/api/sessions/oauth/google/url",
            get(handlers::google_login_url),
        );

    Router::new()
        .merge(protected)
        .merge(public)
        .nest_service("/images", ServeDir::new("public"))
        .fallback(route_not_found)
        .layer(build_cors_layer(&state.config.cors_origins()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": "Route Not Found" })),
    )
}

/// Build CORS layer for the configured origins.
///
/// Credentials are allowed so the session cookie travels with requests, which
/// rules out a wildcard origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, cross-origin requests will be rejected");
    } else {
        tracing::info!("CORS configured for origins: {:?}", origins);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
