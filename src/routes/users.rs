use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json as RespJson,
    routing::get,
    Router,
};

use crate::error::{ApiError, ApiResult};
use crate::model::user::{User, UserListQuery, UserListResponse, UserPayload};
use crate::store::UserStore;

pub fn users_router() -> Router {
    Router::new()
        .route(
            "/users",
            get(list_users)
                .post(create_user)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
}

// Bodies are decoded by hand so every decode failure is a plain 400,
// whatever the Content-Type header says.
fn decode_payload(body: &Bytes) -> ApiResult<UserPayload> {
    UserPayload::from_json(body).map_err(|e| {
        tracing::warn!(error = %e, "rejecting malformed user payload");
        ApiError::from(e)
    })
}

// List users with pagination and country filtering
async fn list_users(
    Extension(store): Extension<Arc<UserStore>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> RespJson<UserListResponse> {
    let query = UserListQuery::from_pairs(pairs);
    tracing::debug!(?query, "listing users");
    RespJson(store.list_query(&query))
}

async fn create_user(
    Extension(store): Extension<Arc<UserStore>>,
    body: Bytes,
) -> ApiResult<(StatusCode, RespJson<User>)> {
    let payload = decode_payload(&body)?;
    let user = store.add(payload);

    tracing::info!(id = %user.id, total = store.len(), "user created");
    Ok((StatusCode::CREATED, RespJson(user)))
}

async fn get_user(
    Extension(store): Extension<Arc<UserStore>>,
    Path(id): Path<String>,
) -> ApiResult<RespJson<User>> {
    tracing::debug!(%id, "getting user");
    let user = store.get(&id).inspect_err(|e| tracing::warn!("{e}"))?;
    Ok(RespJson(user))
}

async fn update_user(
    Extension(store): Extension<Arc<UserStore>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<RespJson<User>> {
    let payload = decode_payload(&body)?;
    let user = store
        .update(&id, payload)
        .inspect_err(|e| tracing::warn!("{e}"))?;

    tracing::info!(%id, "user updated");
    Ok(RespJson(user))
}

async fn delete_user(
    Extension(store): Extension<Arc<UserStore>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    store.delete(&id).inspect_err(|e| tracing::warn!("{e}"))?;

    tracing::info!(%id, total = store.len(), "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
