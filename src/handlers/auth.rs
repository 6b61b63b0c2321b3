use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};

use crate::database::models::{LoginRequest, User};
use crate::error::{ApiError, ApiResult};
use crate::validation::parse_body;
use crate::AppState;

/// POST /login - exchange a username and password for a signed token
///
/// Token payload: `{ username, is_admin, iat, exp }`
pub async fn login(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> ApiResult<Json<Value>> {
    let credentials: LoginRequest = parse_body(body, &state.payload_rules())?;

    let user = User::authenticate(&state.pool, &credentials.username, &credentials.password)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid username or password"))?;

    let token = state.keys.sign(&user).map_err(|e| {
        tracing::error!("Failed to sign token for '{}': {}", user.username, e);
        ApiError::internal_server_error("Could not issue token")
    })?;

    tracing::info!("User '{}' logged in", user.username);
    Ok(Json(json!({ "token": token })))
}
