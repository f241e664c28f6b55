//! Admin API: registry inspection and manual unblocking.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::security::RateLimiter;

pub fn setup_admin_router(limiter: RateLimiter, api_key: &str) -> Router {
    let api_key: Arc<str> = Arc::from(api_key);
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/blocks", get(get_blocks))
        .route("/admin/blocks/{ip}", delete(delete_block))
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(limiter)
}
