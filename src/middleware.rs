use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::handlers::AppState;

/// Logging middleware for request/response tracking.
///
/// Logs the same client address the rate limiter keys on.
pub async fn logging_middleware(
    State(trust_proxy_headers): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = get_client_ip(&request, trust_proxy_headers);

    info!(
        target: "crafting_api::middleware",
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        "Incoming request"
    );

    let response = next.run(request).await;

    let status = response.status();
    info!(
        target: "crafting_api::middleware",
        method = %method,
        uri = %uri,
        status = %status,
        "Request completed"
    );

    response
}

/// Admit the request against the caller's token bucket. Throttled requests
/// never reach the handler.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = get_client_ip(&request, state.trust_proxy_headers);

    if !state.limiter.allow(&client_ip) {
        debug!(
            target: "crafting_api::middleware",
            client_ip = %client_ip,
            uri = %request.uri(),
            "Request throttled"
        );
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}

/// Client address used as the rate limit key.
///
/// Forwarding headers are consulted only when `trust_headers` is set;
/// otherwise the peer socket address decides.
pub fn get_client_ip(request: &Request, trust_headers: bool) -> String {
    if trust_headers {
        if let Some(forwarded) = request.headers().get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded.to_str() {
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    return first_ip.trim().to_string();
                }
            }
        }

        if let Some(real_ip) = request.headers().get("x-real-ip") {
            if let Ok(ip_str) = real_ip.to_str() {
                return ip_str.to_string();
            }
        }
    }

    // Fallback to connection info
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        addr.ip().to_string()
    } else {
        "unknown".to_string()
    }
}
