use axum::{http::StatusCode, routing::get, Router};

pub fn health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

// Liveness only; never looks at the store
async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
