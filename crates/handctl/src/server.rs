//! The HTTP interface: `POST /gesture` and its CORS preflight.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue},
    middleware,
    response::Response,
    routing::post,
    Json, Router,
};
use handctl_image::DecodeError;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{error::GestureError, gesture::Command, pipeline::GesturePipeline};

/// Default cap on request body size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize)]
struct GestureResponse {
    command: Command,
}

/// Builds the application router.
///
/// Bodies larger than `max_body_bytes` are rejected with `413 Payload Too Large`.
pub fn router(pipeline: Arc<GesturePipeline>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/gesture", post(gesture).options(preflight))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::map_response(cors_headers))
        .with_state(pipeline)
}

/// Serves the router on `addr` until Ctrl+C is received.
pub async fn serve(
    addr: SocketAddr,
    pipeline: Arc<GesturePipeline>,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    log::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(pipeline, max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("received Ctrl+C, shutting down"),
        Err(e) => {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// The body is parsed by hand so that any malformed body is reported as a missing image, no
/// matter its `Content-Type`.
async fn gesture(
    State(pipeline): State<Arc<GesturePipeline>>,
    body: Bytes,
) -> Result<Json<GestureResponse>, GestureError> {
    let data_url = extract_image(&body)?;

    let command = tokio::task::spawn_blocking(move || pipeline.process_data_url(&data_url))
        .await
        .map_err(|e| GestureError::Detection(anyhow::anyhow!("gesture task failed: {}", e)))??;

    Ok(Json(GestureResponse { command }))
}

fn extract_image(body: &[u8]) -> Result<String, GestureError> {
    let value = serde_json::from_slice::<Value>(body).map_err(|_| GestureError::Input)?;
    match value.as_object().and_then(|obj| obj.get("image")) {
        None => Err(GestureError::Input),
        Some(Value::String(data_url)) => Ok(data_url.clone()),
        Some(_) => Err(DecodeError::NotAString.into()),
    }
}

async fn preflight() -> Json<Value> {
    Json(json!({ "message": "CORS preflight" }))
}

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_image_field() {
        let url = extract_image(br#"{"image": "data:image/png;base64,AAAA", "extra": 1}"#).unwrap();
        assert_eq!(url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn malformed_bodies_are_input_errors() {
        let bodies: [&[u8]; 6] = [b"", b"{}", b"[]", b"\"image\"", b"{\"img\": \"x\"}", b"not json"];
        for body in bodies {
            assert!(
                matches!(extract_image(body), Err(GestureError::Input)),
                "body: {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn non_string_image_is_decode_error() {
        let bodies: [&[u8]; 3] = [br#"{"image": 1}"#, br#"{"image": null}"#, br#"{"image": []}"#];
        for body in bodies {
            assert!(matches!(
                extract_image(body),
                Err(GestureError::Decode(DecodeError::NotAString))
            ));
        }
    }
}
