//! Per-connection handler: register the client, pump messages both ways,
//! unregister on teardown.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::protocol;
use crate::ServerContext;

/// Handle a single frontend WebSocket connection.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    ctx: ServerContext,
) {
    let (mut sink, mut stream) = ws.split();
    let (client_id, mut outbound) = ctx.clients.register().await;
    tracing::info!(peer = %addr, client = %client_id, "frontend connected");

    loop {
        tokio::select! {
            // Broadcasts queued for this client → its WebSocket.
            Some(message) = outbound.recv() => {
                if sink.send(Message::Text(message.into())).await.is_err() {
                    break;
                }
            }

            // Messages from this client → dispatch.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => handle_text(&text, addr, &ctx),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "websocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    ctx.clients.remove(&client_id).await;
    tracing::info!(peer = %addr, client = %client_id, "frontend disconnected");
}

/// Parse and dispatch one inbound message. Malformed input is logged and
/// ignored without closing the connection. Each valid envelope runs in its
/// own task, so a slow handler never stalls this connection's read loop; the
/// outcome goes to every connected client, not just the sender.
fn handle_text(text: &str, addr: SocketAddr, ctx: &ServerContext) {
    let envelope = match protocol::parse_envelope(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "ignoring invalid frontend message");
            return;
        }
    };

    let ctx = ctx.clone();
    tokio::spawn(async move {
        let outcome = ctx
            .dispatcher
            .dispatch(
                &envelope.cmd,
                envelope.result_id,
                envelope.error_id,
                &envelope.payload,
            )
            .await;
        match serde_json::to_string(&outcome) {
            Ok(message) => {
                ctx.clients.broadcast(&message).await;
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize dispatch outcome"),
        }
    });
}
