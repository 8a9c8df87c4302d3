//! HTTP push receiver.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /gatewaysink`: body is one CloudEvents JSON object or an array of
//!   them. Responds `200 { "ok": true }` once every message is acknowledged
//!   successfully, `500 { "error": ... }` when the batch fails.
//!
//! Elements that are not valid events are logged and skipped; they do not
//! fail the request.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::TransportError;
use crate::bus::{Outcome, PushIngress};
use crate::codec::json::envelopes_from_json;

pub const PUSH_PATH: &str = "/gatewaysink";

/// Build an axum `Router` serving the push route.
pub fn router(ingress: PushIngress) -> Router {
    Router::new()
        .route(PUSH_PATH, post(push_handler))
        .with_state(ingress)
}

/// Serve the push receiver on `listener` until `shutdown` fires.
pub async fn serve_push(
    listener: TcpListener,
    ingress: PushIngress,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    axum::serve(listener, router(ingress))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// `POST /gatewaysink`
async fn push_handler(
    State(ingress): State<PushIngress>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let envelopes = envelopes_from_json(&body)
        .into_iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(envelope) => Some(envelope),
            Err(error) => {
                warn!(index, %error, "skipping malformed JSON event");
                None
            }
        })
        .collect();

    match ingress.accept(envelopes).await {
        Outcome::Success => (StatusCode::OK, Json(json!({ "ok": true }))),
        Outcome::Failed(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": reason })),
        ),
    }
}
