//! Frontend endpoint: a WebSocket server that dispatches command envelopes
//! and fans every outcome out to all connected clients.

pub mod clients;
pub mod connection;
pub mod protocol;

use std::sync::Arc;

use frameport_commands::Dispatcher;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

pub use clients::ClientSet;
pub use protocol::{parse_envelope, CommandEnvelope, EnvelopeError};

/// Shared state handed to every connection.
#[derive(Clone)]
pub struct ServerContext {
    pub clients: ClientSet,
    pub dispatcher: Arc<Dispatcher>,
}

/// Accept frontend connections forever. The caller binds the listener, so a
/// bind failure surfaces as a startup diagnostic instead of dying in here.
pub async fn run(listener: TcpListener, ctx: ServerContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => connection::handle_connection(ws, addr, ctx).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "websocket handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept error");
            }
        }
    }
}
