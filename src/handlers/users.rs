use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::{NewUser, User, UserUpdate};
use crate::error::{ApiError, ApiResult};
use crate::validation::{parse_body, parse_update};
use crate::AppState;

/// GET /users - `{users: [{username, first_name, last_name, email}]}`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = User::list(&state.pool).await?;
    Ok(Json(json!({ "users": users })))
}

/// POST /users - register; `{user, token}` with 201. New users are never admins.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let rules = state.payload_rules();
    let new: NewUser = parse_body(body, &rules)?;

    let user = User::create(&state.pool, &new, rules.bcrypt_cost).await?;
    let token = state
        .keys
        .sign(&AuthUser { username: user.username.clone(), is_admin: false })
        .map_err(|e| {
            tracing::error!("Failed to sign token for '{}': {}", user.username, e);
            ApiError::internal_server_error("Could not issue token")
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// GET /users/:username - `{user}`
pub async fn get(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Json<Value>> {
    let user = User::get(&state.pool, &username).await?;
    Ok(Json(json!({ "user": user })))
}

/// PATCH /users/:username - `{user}`; only the user themselves
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let fields = parse_update::<UserUpdate>(body, &state.payload_rules())?;
    let user = User::update(&state.pool, &username, fields).await?;
    Ok(Json(json!({ "user": user })))
}

/// DELETE /users/:username - `{message: "User deleted"}`; only the user themselves
pub async fn delete(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Json<Value>> {
    User::delete(&state.pool, &username).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}
