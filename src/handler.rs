//! WebSocket connection handler
//!
//! Drives one connection through AWAIT_JOIN → ACTIVE → TERMINATED:
//! WebSocket handshake, JOIN validation, then a receive task that feeds
//! client events to the [`ChatServer`] while a writer task drains the
//! client's outbound queue into the socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::client::ClientHandle;
use crate::error::AppError;
use crate::message::{ClientEvent, EventType, ServerEvent};
use crate::server::ChatServer;
use crate::state::ServerState;
use crate::types::{ClientId, ConnectionId};

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsReceiver = SplitStream<WebSocketStream<TcpStream>>;

/// How long a finished session waits for its writer to flush
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How the ACTIVE state ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Client sent LEAVE
    Left,
    /// Stream closed, read error, or protocol violation mid-session
    Disconnected,
}

/// Handle a new TCP connection
///
/// Returns an error only if the connection is rejected before it becomes
/// ACTIVE. Mid-session transport errors are handled as disconnects.
pub async fn handle_connection(stream: TcpStream, server: Arc<ChatServer>) -> Result<(), AppError> {
    let connection_id = ConnectionId::new();
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("Connection {} from {}", connection_id, peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // AWAIT_JOIN
    let join = match await_join(&mut ws_receiver).await {
        Ok(join) => join,
        Err(e) => {
            debug!("Connection {} failed handshake: {}", connection_id, e);
            reject(&mut ws_sender, &e).await;
            return Err(e);
        }
    };

    let (outbox_tx, outbox_rx) = mpsc::channel(server.config().outbox_capacity);
    let client = ClientHandle::new(join.id, &join.client_name, outbox_tx).with_session(connection_id);

    if let Err(e) = server.handle_join(&client, join.timestamp).await {
        warn!(
            "JOIN refused for {} (ID={}, connection {}): {}",
            client.name, client.id, connection_id, e
        );
        reject(&mut ws_sender, &e).await;
        return Err(e);
    }

    let mut writer = tokio::spawn(write_loop(
        ws_sender,
        outbox_rx,
        server.state().clone(),
        client.id,
        connection_id,
    ));
    debug!("Connection {} is client {}", connection_id, client.id);

    // ACTIVE
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(receive_loop(ws_receiver, server.clone(), client.clone(), done_tx));

    let end = match done_rx.await {
        Ok(end) => end,
        Err(_) => {
            // Receive task died without signalling
            server.handle_disconnect(&client).await;
            SessionEnd::Disconnected
        }
    };

    // TERMINATED
    drop(client);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!("Writer for connection {} did not drain in time", connection_id);
        writer.abort();
    }

    info!("Connection {} ended ({:?})", connection_id, end);
    Ok(())
}

/// Read frames until the first protocol message and validate it as JOIN
async fn await_join<S>(ws_receiver: &mut S) -> Result<ClientEvent, AppError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let text = loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(AppError::ConnectionClosed),
            Some(Ok(_)) => {
                return Err(AppError::ProtocolViolation(
                    "expected a JSON text frame".to_string(),
                ))
            }
            Some(Err(e)) => return Err(e.into()),
        }
    };

    let event: ClientEvent = serde_json::from_str(&text)
        .map_err(|e| AppError::ProtocolViolation(format!("malformed first message: {}", e)))?;

    if event.event_type != EventType::Join {
        return Err(AppError::ProtocolViolation(format!(
            "expected JOIN as first message, got {}",
            event.event_type
        )));
    }
    if event.id.is_reserved() {
        return Err(AppError::ProtocolViolation(format!(
            "client id {} is reserved",
            event.id
        )));
    }
    Ok(event)
}

/// Best-effort close frame for a rejected handshake
async fn reject(ws_sender: &mut WsSender, err: &AppError) {
    if matches!(err, AppError::ConnectionClosed | AppError::WebSocket(_)) {
        return;
    }
    let frame = CloseFrame {
        code: CloseCode::Policy,
        reason: err.to_string().into(),
    };
    let _ = ws_sender.send(Message::Close(Some(frame))).await;
}

/// Receive duty of an ACTIVE session
///
/// Signals `done` exactly once, after the registry removal for this
/// session has happened.
async fn receive_loop(
    mut ws_receiver: WsReceiver,
    server: Arc<ChatServer>,
    client: ClientHandle,
    done: oneshot::Sender<SessionEnd>,
) {
    let end = loop {
        let text = match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) => {
                debug!("Client {} sent close frame", client.id);
                break SessionEnd::Disconnected;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!("WebSocket error for {}: {}", client.id, e);
                break SessionEnd::Disconnected;
            }
            None => break SessionEnd::Disconnected,
        };

        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Invalid JSON from {}: {}", client.id, e);
                continue;
            }
        };

        match event.event_type {
            EventType::Message => server.handle_chat(&client, event).await,
            EventType::Leave => match server.handle_leave(&client, event.timestamp).await {
                Ok(_) => break SessionEnd::Left,
                Err(e) => warn!("Dropping LEAVE from {}: {}", client.id, e),
            },
            EventType::Join => {
                warn!("Client {} sent a second JOIN, dropping it", client.id);
                break SessionEnd::Disconnected;
            }
        }
    };

    if end == SessionEnd::Disconnected {
        server.handle_disconnect(&client).await;
    }
    let _ = done.send(end);
}

/// Drain the outbound queue into the socket
///
/// Runs until every queue sender is dropped. A failed write deactivates
/// the client and closes the queue, so later broadcasts skip it.
async fn write_loop(
    mut ws_sender: WsSender,
    mut outbox: mpsc::Receiver<ServerEvent>,
    state: Arc<ServerState>,
    client_id: ClientId,
    session: ConnectionId,
) {
    while let Some(event) = outbox.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize event for {}: {}", client_id, e);
                continue;
            }
        };
        if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
            warn!("Error sending to {}: {}", client_id, e);
            state.deactivate(client_id, session).await;
            return;
        }
    }

    debug!("Write task ended for {}", client_id);
    let _ = ws_sender.close().await;
}
