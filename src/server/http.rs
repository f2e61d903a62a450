//! Http and websocket transports.
//!
//! - `POST /configuration/{operation}` takes the plain request fields as json body
//!   and answers with the response payload, the status code mirrors `errorCode`.
//! - `GET /ws` upgrades to a websocket speaking `{q, sid, d}` messages.
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};

use crate::common::{debug, error, info, Result};
use crate::core::ServiceHandle;
use crate::protocol::codec::{HttpCodec, StreamingCodec};

// Outbound messages buffered per websocket, also the bound of requests in flight on one socket.
const WS_OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    // http listen host.
    listen_host: Option<String>,
    // http listen port.
    listen_port: Option<String>,
}

impl Config {
    const DEFAULT_LISTEN_HOST: &'static str = "127.0.0.1";
    const DEFAULT_LISTEN_PORT: &'static str = crate::server::DEFAULT_HTTP_PORT;

    pub fn set_listen_host(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_host = Some(val)
        }
    }
    pub fn set_listen_port(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_port = Some(val)
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_listen_host(&mut other.listen_host);
        self.set_listen_port(&mut other.listen_port);
    }

    pub(crate) fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.listen_host
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_HOST),
            self.listen_port
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_PORT),
        )
    }
}

/// Routes of the http and websocket transports.
pub fn router(service: ServiceHandle) -> Router {
    Router::new()
        .route("/configuration/{operation}", post(invoke))
        .route("/ws", get(ws_handler))
        .with_state(service)
}

pub(crate) async fn serve<F>(listener: TcpListener, service: ServiceHandle, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = ?listener.local_addr().ok(), "Http server running");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Http server stopped");
    Ok(())
}

async fn invoke(
    State(service): State<ServiceHandle>,
    Path(operation): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let reply = service.exchange(&HttpCodec::new(operation), &body).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(reply.body))
}

async fn ws_handler(ws: WebSocketUpgrade, State(service): State<ServiceHandle>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: ServiceHandle) {
    info!("WebSocket client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<Vec<Value>>(WS_OUTBOUND_BUFFER);
    let in_flight = Arc::new(Semaphore::new(WS_OUTBOUND_BUFFER));

    let send_task = tokio::spawn(async move {
        while let Some(messages) = outbound_rx.recv().await {
            for message in messages {
                if ws_sender
                    .send(Message::Text(message.to_string().into()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
        debug!("Send task ended");
    });

    while let Some(msg) = ws_receiver.next().await {
        let frame: Bytes = match msg {
            Ok(Message::Text(text)) => {
                let text_str: &str = &text;
                Bytes::copy_from_slice(text_str.as_bytes())
            }
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => {
                debug!("WebSocket close received");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(err) => {
                error!(cause = %err, "WebSocket error");
                break;
            }
        };

        // Requests on one socket run concurrently, each answer carries its sid.
        // Reading stops while the socket has too many requests in flight.
        let permit = match in_flight.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let service = service.clone();
        let outbound = outbound.clone();
        tokio::spawn(async move {
            let messages = service.exchange(&StreamingCodec, &frame).await;
            let _ = outbound.send(messages).await;
            drop(permit);
        });
    }

    // Let in flight requests flush their answers before closing.
    drop(outbound);
    if let Err(err) = send_task.await {
        error!(cause = %err, "WebSocket send task failed");
    }
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr() {
        let mut config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:7401");

        let mut other = Config::default();
        other.set_listen_host(&mut Some("0.0.0.0".into()));
        config.override_merge(&mut other);
        assert_eq!(config.listen_addr(), "0.0.0.0:7401");
    }
}
