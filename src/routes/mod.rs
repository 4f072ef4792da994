use std::sync::Arc;

use axum::{extract::Extension, Router};
use tower_http::trace::TraceLayer;

use crate::store::UserStore;

pub mod health;
pub mod users;

use health::health_router;
use users::users_router;

// Full application router with the shared store attached
pub fn app(store: Arc<UserStore>) -> Router {
    Router::new()
        .merge(users_router())
        .merge(health_router())
        .layer(Extension(store))
        .layer(TraceLayer::new_for_http())
}
