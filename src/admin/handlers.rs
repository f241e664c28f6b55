use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::security::rate_limit::BlockedClient;
use crate::security::RateLimiter;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub registry_entries: usize,
    pub blocked_clients: usize,
}

pub async fn get_status(State(limiter): State<RateLimiter>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        registry_entries: limiter.registry_len(),
        blocked_clients: limiter.blocked_clients().len(),
    })
}

pub async fn get_blocks(State(limiter): State<RateLimiter>) -> Json<Vec<BlockedClient>> {
    Json(limiter.blocked_clients())
}

pub async fn delete_block(
    State(limiter): State<RateLimiter>,
    Path(ip): Path<String>,
) -> StatusCode {
    if limiter.unblock(&ip) {
        tracing::info!(client = %ip, "Block lifted by admin");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
