use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::database::models::{Job, JobSearch, JobUpdate, NewJob};
use crate::error::ApiResult;
use crate::validation::{parse_body, parse_update};
use crate::AppState;

use super::{path_param, query_param};

/// GET /jobs?search=&min_salary=&min_equity= - `{jobs: [{title, company_handle}]}`, newest first
pub async fn list(
    State(state): State<AppState>,
    search: Result<Query<JobSearch>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let jobs = Job::list(&state.pool, &query_param(search)?).await?;
    Ok(Json(json!({ "jobs": jobs })))
}

/// POST /jobs - `{job}` with 201
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new: NewJob = parse_body(body, &state.payload_rules())?;
    let job = Job::create(&state.pool, &new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "job": job }))))
}

/// GET /jobs/:id - `{job}` including its company
pub async fn get(State(state): State<AppState>, id: Result<Path<i32>, PathRejection>) -> ApiResult<Json<Value>> {
    let job = Job::get(&state.pool, path_param(id)?).await?;
    Ok(Json(json!({ "job": job })))
}

/// PATCH /jobs/:id - `{job}`
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_param(id)?;
    let fields = parse_update::<JobUpdate>(body, &state.payload_rules())?;

    let job = Job::update(&state.pool, id, fields).await?;
    Ok(Json(json!({ "job": job })))
}

/// DELETE /jobs/:id - `{message: "Job deleted"}`
pub async fn delete(State(state): State<AppState>, id: Result<Path<i32>, PathRejection>) -> ApiResult<Json<Value>> {
    Job::delete(&state.pool, path_param(id)?).await?;
    Ok(Json(json!({ "message": "Job deleted" })))
}
