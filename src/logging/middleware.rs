use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Instrument;

/// Log each request and its outcome. Share tokens in the path are masked so
/// capability links never reach the log files.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = redact_share_token(request.uri().path());

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = tracing::info_span!("request", request_id = %req_id, method = %method, path = %path);

    async move {
        tracing::info!("incoming request");

        let response = next.run(request).await;

        let status = response.status();
        let duration_ms = start.elapsed().as_millis() as u64;
        if status.is_server_error() {
            tracing::error!(status = %status, duration_ms, "request failed");
        } else if status.is_client_error() {
            tracing::warn!(status = %status, duration_ms, "request rejected");
        } else {
            tracing::info!(status = %status, duration_ms, "request completed");
        }

        response
    }
    .instrument(span)
    .await
}

/// `/api/shares/<token>` becomes `/api/shares/<redacted>`.
pub fn redact_share_token(path: &str) -> String {
    match path.strip_prefix("/api/shares/") {
        Some(rest) if !rest.is_empty() => "/api/shares/<redacted>".to_string(),
        _ => path.to_string(),
    }
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
