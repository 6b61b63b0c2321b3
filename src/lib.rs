pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod validation;

use std::sync::Arc;

use axum::{
    handler::Handler,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{JwtKeys, TokenError};
use crate::config::AppConfig;
use crate::handlers::{auth as login, companies, jobs, root, users};
use crate::middleware::{ensure_admin, ensure_correct_user, ensure_logged_in, verify_identity};
use crate::validation::PayloadRules;

/// Shared per-process state. Cloned into every request; holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub keys: Arc<JwtKeys>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, TokenError> {
        let keys = JwtKeys::new(config.security.jwt_secret.as_bytes(), config.security.jwt_expiry_hours)?;
        Ok(Self {
            pool,
            keys: Arc::new(keys),
            config: Arc::new(config),
        })
    }

    pub fn payload_rules(&self) -> PayloadRules {
        PayloadRules::from(&self.config.security)
    }
}

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .route("/login", post(login::login))
        .merge(company_routes())
        .merge(job_routes())
        .merge(user_routes())
        .fallback(root::not_found);

    let router = match cors_layer(&state.config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router
        // Runs before every guard; sets the request's Authentication
        .layer(from_fn_with_state(state.clone(), verify_identity))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/companies",
            get(companies::list.layer(from_fn(ensure_logged_in)))
                .post(companies::create.layer(from_fn(ensure_admin))),
        )
        .route(
            "/companies/:handle",
            get(companies::get.layer(from_fn(ensure_logged_in)))
                .patch(companies::update.layer(from_fn(ensure_admin)))
                .delete(companies::delete.layer(from_fn(ensure_admin))),
        )
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/jobs",
            get(jobs::list.layer(from_fn(ensure_logged_in))).post(jobs::create.layer(from_fn(ensure_admin))),
        )
        .route(
            "/jobs/:id",
            get(jobs::get.layer(from_fn(ensure_logged_in)))
                .patch(jobs::update.layer(from_fn(ensure_admin)))
                .delete(jobs::delete.layer(from_fn(ensure_admin))),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:username",
            get(users::get)
                .patch(users::update.layer(from_fn(ensure_correct_user)))
                .delete(users::delete.layer(from_fn(ensure_correct_user))),
        )
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
