//! # Notification Stream
//!
//! WebSocket endpoint that forwards the caller's account notifications as
//! JSON text frames. Browsers cannot set headers on the upgrade request,
//! so the JWT travels in the query string.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use utoipa::IntoParams;

use crate::auth::{AuthUser, authenticate};
use crate::error::ApiError;
use crate::handlers::types::ApiQuery;
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamQuery {
    /// Bearer token issued at login
    pub token: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/ws/notifications",
    params(StreamQuery),
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 401, description = "Invalid or expired token", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn notifications_ws(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StreamQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let auth = authenticate(&state.config, &state.db, &query.token).await?;
    Ok(upgrade.on_upgrade(move |socket| stream_notifications(state, auth, socket)))
}

async fn stream_notifications(state: AppState, auth: AuthUser, mut socket: WebSocket) {
    let mut receiver = state.notifications.subscribe();
    tracing::debug!(user_id = %auth.user_id, account_id = %auth.account_id, "Notification stream opened");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::debug!(%error, "Notification socket error");
                    break;
                }
            },
            notification = receiver.recv() => match notification {
                Ok(notification) if notification.account_id == auth.account_id => {
                    let frame = match serde_json::to_string(&notification) {
                        Ok(frame) => frame,
                        Err(error) => {
                            tracing::warn!(%error, kind = %notification.kind, "Failed to encode notification");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, account_id = %auth.account_id, "Notification subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!(user_id = %auth.user_id, "Notification stream closed");
}
