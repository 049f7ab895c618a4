//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Instrument;

use super::rate_limiter::peer_address;

/// Wrap each request in a span and log its outcome with timing
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        client = %peer_address(&request),
    );

    async move {
        let start = Instant::now();
        let response = next.run(request).await;
        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis() as u64;

        if response.status().is_server_error() {
            tracing::error!(status, duration_ms, "Request failed");
        } else if response.status().is_client_error() {
            tracing::warn!(status, duration_ms, "Request rejected");
        } else {
            tracing::info!(status, duration_ms, "Request completed");
        }

        response
    }
    .instrument(span)
    .await
}
