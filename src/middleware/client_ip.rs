//! Client address resolution

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, extract::Request, http::HeaderMap};

const UNKNOWN: &str = "unknown";

/// Resolve the caller's address for rate limiting and access logs.
///
/// Forwarding headers are only honoured when the service runs behind a
/// trusted proxy; otherwise the socket peer address is used.
pub fn client_address(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(addr) = forwarded_address(request.headers()) {
            return addr;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    // First hop of X-Forwarded-For is the original client
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_string)
}
