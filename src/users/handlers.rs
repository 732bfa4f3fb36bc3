use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    errors::UserError,
    state::AppState,
    users::{
        dto::{LoginRequest, PublicUser, RegisterRequest, UserQuery},
        services,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_user_by_query))
        .route("/api/user/:id", get(get_user_by_path))
        .route("/users", get(list_users))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// GET /user?user_id=<id>
#[instrument(skip(state))]
pub async fn get_user_by_query(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<PublicUser>, UserError> {
    let user = services::get_user(state.store.as_ref(), q.user_id.as_deref()).await?;
    Ok(Json(user.into()))
}

/// GET /api/user/:id
#[instrument(skip(state))]
pub async fn get_user_by_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, UserError> {
    let user = services::get_user(state.store.as_ref(), Some(id.as_str())).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, UserError> {
    let users = services::list_users(state.store.as_ref()).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), UserError> {
    let user = services::register(
        state.store.as_ref(),
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, UserError> {
    let user =
        services::authenticate(state.store.as_ref(), &payload.username, &payload.password).await?;
    Ok(Json(user.into()))
}
