use axum::{
    body::{to_bytes, Body},
    extract::{Path, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::AppState;

/// Authentication state of one request, set once by [`verify_identity`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Authentication {
    #[default]
    Anonymous,
    Authenticated(AuthUser),
}

impl Authentication {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Authentication::Anonymous => None,
            Authentication::Authenticated(user) => Some(user),
        }
    }
}

/// Verify an optional credential. Any failure leaves the request anonymous;
/// rejecting is left to the guards below.
pub fn identity_from_token(token: Option<&str>, verifier: &dyn TokenVerifier) -> Authentication {
    let Some(token) = token else {
        return Authentication::Anonymous;
    };

    match verifier.verify(token) {
        Ok(user) => Authentication::Authenticated(user),
        Err(e) => {
            tracing::debug!("Ignoring unverifiable token: {}", e);
            Authentication::Anonymous
        }
    }
}

pub fn require_authenticated(auth: &Authentication) -> Result<&AuthUser, ApiError> {
    auth.user().ok_or_else(ApiError::unauthorized_user)
}

/// Only the named user may pass, whatever their role.
pub fn require_same_subject<'a>(auth: &'a Authentication, username: &str) -> Result<&'a AuthUser, ApiError> {
    match auth.user() {
        Some(user) if user.username == username => Ok(user),
        _ => Err(ApiError::unauthorized_user()),
    }
}

pub fn require_elevated(auth: &Authentication) -> Result<&AuthUser, ApiError> {
    match auth.user() {
        Some(user) if user.is_admin => Ok(user),
        _ => Err(ApiError::unauthorized_user()),
    }
}

/// Global middleware: decode the caller's token (if any) into an
/// [`Authentication`] request extension. Never rejects on a bad token.
///
/// Credential lookup order: `Authorization: Bearer`, `?_token=`, then a
/// `_token` field in a JSON body.
pub async fn verify_identity(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let mut token = bearer_token(request.headers()).or_else(|| query_token(request.uri()));

    let mut request = if token.is_none() && is_json(request.headers()) {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, state.config.api.max_request_size_bytes)
            .await
            .map_err(|_| ApiError::payload_too_large("Request body too large"))?;

        token = body_token(&bytes);
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    let auth = identity_from_token(token.as_deref(), &*state.keys);
    request.extensions_mut().insert(auth);

    Ok(next.run(request).await)
}

/// Route middleware: any verified user.
pub async fn ensure_logged_in(request: Request, next: Next) -> Result<Response, ApiError> {
    require_authenticated(authentication(&request))?;
    Ok(next.run(request).await)
}

/// Route middleware: only the user named by the `:username` path segment.
pub async fn ensure_correct_user(Path(username): Path<String>, request: Request, next: Next) -> Result<Response, ApiError> {
    require_same_subject(authentication(&request), &username)?;
    Ok(next.run(request).await)
}

/// Route middleware: admins only.
pub async fn ensure_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_elevated(authentication(&request))?;
    Ok(next.run(request).await)
}

fn authentication(request: &Request) -> &Authentication {
    static ANONYMOUS: Authentication = Authentication::Anonymous;
    request.extensions().get::<Authentication>().unwrap_or(&ANONYMOUS)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn query_token(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

fn body_token(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(bytes).ok()?.get("_token")? {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        _ => None,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}
