//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs method, path, status and latency of every request
///
/// Bearer tokens and bodies are never logged; the challan number in a path
/// is the most identifying value written.
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(&request);

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    match status {
        500.. => tracing::error!(%method, %path, status, latency_ms, ?client_ip, "Request failed"),
        400..=499 => tracing::warn!(%method, %path, status, latency_ms, ?client_ip, "Request rejected"),
        _ => tracing::info!(%method, %path, status, latency_ms, ?client_ip, "Request completed"),
    }

    response
}

fn client_ip(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .map(|s| s.trim().to_string())
}
