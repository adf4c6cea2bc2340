//! Telephony media-stream endpoint.

use crate::bridge::{self, StreamParams};
use crate::AppState;
use axum::extract::{Extension, Query, WebSocketUpgrade};
use axum::response::IntoResponse;
use std::sync::Arc;

/// `GET /twilio/voice/stream`: upgrades and hands the socket to the bridge.
///
/// The call id and caller number may arrive as query parameters when the
/// provider's stream URL carries them; otherwise they come from `start`.
pub async fn voice_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    tracing::debug!(call_sid = ?params.call_sid, "telephony stream upgrade");
    ws.on_upgrade(move |socket| bridge::run_call(socket, state, params))
}
