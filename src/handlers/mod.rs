// handlers/mod.rs - HTTP handlers, one module per resource
//
// Guards are attached in `crate::app` as route middleware; handlers assume
// the caller has already been authorized for the route.

pub mod auth;
pub mod companies;
pub mod jobs;
pub mod root;
pub mod users;

use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Path, Query,
};

use crate::error::{ApiError, ApiResult};

/// Unwrap a path parameter, reporting malformed values as a 400.
pub(crate) fn path_param<T>(path: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    path.map(|Path(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Unwrap query-string filters, reporting malformed values as a 400.
pub(crate) fn query_param<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
