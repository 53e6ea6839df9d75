use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broadcast::{ServerEvent, Subscription};

use super::AppState;

pub const BANNER: &str = "GPT Backrooms Server Running";

/// GET /
pub async fn banner_handler() -> &'static str {
    BANNER
}

/// GET /api-usage
pub async fn api_usage_handler(State(state): State<AppState>) -> Response {
    // A rollover check may rewrite the ledger file
    let reporter = state.reporter.clone();
    match tokio::task::spawn_blocking(move || reporter.report()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "Usage report failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to retrieve API usage" })),
            )
                .into_response()
        }
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let viewer = Uuid::new_v4();
        info!(%viewer, "Viewer connected");

        match viewer_session(socket, state, viewer).await {
            Ok(()) => info!(%viewer, "Viewer disconnected"),
            Err(e) => warn!(%viewer, error = %e, "Viewer session ended with error"),
        }
    })
}

async fn viewer_session(socket: WebSocket, state: AppState, viewer: Uuid) -> anyhow::Result<()> {
    // Subscribe before starting so the session announcement is not missed
    let Subscription {
        snapshot,
        mut receiver,
    } = state.broadcaster.subscribe();
    state.conversation.start();

    let (mut sink, mut stream) = socket.split();

    send(&mut sink, &ServerEvent::InitialHistory(snapshot))
        .await
        .context("sending initial history")?;
    // A rollover check may rewrite the ledger file
    let reporter = state.reporter.clone();
    let usage = tokio::task::spawn_blocking(move || reporter.info())
        .await
        .context("reading usage")?;
    send(&mut sink, &ServerEvent::ApiUsage(usage))
        .await
        .context("sending usage")?;

    loop {
        tokio::select! {
            published = receiver.recv() => match published {
                Ok(entry) => {
                    send(&mut sink, &ServerEvent::NewMessage(entry))
                        .await
                        .context("forwarding message")?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%viewer, skipped, "Viewer lagging, messages dropped");
                }
                Err(RecvError::Closed) => break,
            },

            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                // Viewers only listen
                Some(Ok(other)) => debug!(%viewer, ?other, "Ignoring viewer frame"),
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    Ok(())
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) -> anyhow::Result<()> {
    let json = event.to_json()?;
    sink.send(Message::Text(json.into())).await?;
    debug!(event = event.name(), "Sent frame");
    Ok(())
}
