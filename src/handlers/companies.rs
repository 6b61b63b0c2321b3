use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::database::models::{Company, CompanySearch, CompanyUpdate, NewCompany};
use crate::error::ApiResult;
use crate::validation::{parse_body, parse_update};
use crate::AppState;

use super::{path_param, query_param};

/// GET /companies?search=&min_employees=&max_employees= - `{companies: [{handle, name}]}`
pub async fn list(
    State(state): State<AppState>,
    search: Result<Query<CompanySearch>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let companies = Company::list(&state.pool, &query_param(search)?).await?;
    Ok(Json(json!({ "companies": companies })))
}

/// POST /companies - `{company}` with 201
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new: NewCompany = parse_body(body, &state.payload_rules())?;
    let company = Company::create(&state.pool, &new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "company": company }))))
}

/// GET /companies/:handle - `{company}`
pub async fn get(
    State(state): State<AppState>,
    handle: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let company = Company::get(&state.pool, &path_param(handle)?).await?;
    Ok(Json(json!({ "company": company })))
}

/// PATCH /companies/:handle - `{company}`
pub async fn update(
    State(state): State<AppState>,
    handle: Result<Path<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let handle = path_param(handle)?;
    let fields = parse_update::<CompanyUpdate>(body, &state.payload_rules())?;

    let company = Company::update(&state.pool, &handle, fields).await?;
    Ok(Json(json!({ "company": company })))
}

/// DELETE /companies/:handle - `{message: "Company deleted"}`
pub async fn delete(
    State(state): State<AppState>,
    handle: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    Company::delete(&state.pool, &path_param(handle)?).await?;
    Ok(Json(json!({ "message": "Company deleted" })))
}
