//! WebSocket upgrade handler and per-connection pumps.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_core::{AppError, Recipient};
use herald_realtime::message::serializer::deserialize_inbound;
use herald_realtime::{ConnectionHandle, InboundFrame, OutboundFrame};

use crate::error::ApiResult;
use crate::extractors::CallerRecipient;
use crate::state::AppState;

/// GET /ws: WebSocket upgrade for the caller's recipient identity.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    caller: CallerRecipient,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    if !state.hub.is_running() {
        return Err(AppError::service_unavailable("Connection hub is not running").into());
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(state, caller.0, socket)))
}

/// Runs one established connection until it closes, idles out, or is
/// evicted by the hub.
async fn handle_socket(state: AppState, recipient: Recipient, socket: WebSocket) {
    let (handle, outbound_rx) = match state.hub.register(recipient) {
        Ok(registered) => registered,
        Err(e) => {
            warn!(recipient = %recipient, error = %e, "WebSocket registration refused");
            return;
        }
    };

    let conn_id = handle.id;
    let cancel = handle.cancellation();
    let (ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(write_pump(ws_tx, outbound_rx, cancel.clone()));

    let idle = Duration::from_secs(state.hub.config().read_idle_timeout_seconds());
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(idle, ws_rx.next()) => next,
        };

        match next {
            Err(_) => {
                info!(conn_id = %conn_id, "WebSocket read idle timeout");
                break;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => break,
            Ok(Some(Err(e))) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket read error");
                break;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                handle_inbound(&state, &handle, text.as_str()).await;
            }
            Ok(Some(Ok(Message::Pong(_)))) => state.hub.record_heartbeat(&conn_id),
            Ok(Some(Ok(_))) => {}
        }
    }

    // A replaced connection is no longer registered; closing is still needed
    // to stop the write pump.
    state.hub.unregister(&conn_id);
    handle.close();
    if let Err(e) = writer.await {
        warn!(conn_id = %conn_id, error = %e, "WebSocket write pump panicked");
    }

    info!(conn_id = %conn_id, recipient = %recipient, "WebSocket connection closed");
}

/// Forwards buffered frames to the socket until the buffer closes or the
/// connection is cancelled.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = outbound_rx.recv() => {
                let Some(text) = frame else { break };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}

/// Applies one client frame.
async fn handle_inbound(state: &AppState, handle: &Arc<ConnectionHandle>, text: &str) {
    state.hub.metrics().frame_received();

    let frame = match deserialize_inbound(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(conn_id = %handle.id, error = %e, "Ignoring malformed client frame");
            return;
        }
    };

    match frame {
        InboundFrame::Ping => {
            state.hub.record_heartbeat(&handle.id);
            state.hub.send_to(&handle.recipient, &OutboundFrame::pong());
        }
        InboundFrame::Pong => state.hub.record_heartbeat(&handle.id),
        InboundFrame::MarkRead { id } => {
            if let Err(e) = state.notifications.mark_read(id, handle.recipient).await {
                debug!(conn_id = %handle.id, notification_id = %id, error = %e, "mark_read over socket failed");
            }
        }
    }
}
