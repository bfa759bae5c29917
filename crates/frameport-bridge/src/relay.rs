//! Relay loop: the single serialized forwarder between this process and the
//! native runtime.
//!
//! One task owns the queue and the transport; it performs exactly one framed
//! request/response exchange at a time, so the runtime never sees overlapping
//! calls. A transport fault fails only the in-flight call.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::Framed;

use crate::error::CallError;
use crate::pending::PendingCalls;
use crate::wire::{self, ApiRequest, ApiResponse};
use crate::CallResult;

/// Default pause between forwarded calls. Bounds the forwarding rate.
pub const DEFAULT_RELAY_INTERVAL: Duration = Duration::from_millis(10);

/// A call waiting in the relay queue.
pub struct QueuedCall {
    pub request: ApiRequest,
    /// Direct completion handle. When set, the reply bypasses the registry
    /// and goes straight to this sender.
    pub reply: Option<oneshot::Sender<CallResult>>,
}

/// Drains the FIFO call queue against the native runtime.
pub struct Relay {
    runtime_addr: SocketAddr,
    pending: Arc<PendingCalls>,
    interval: Duration,
}

impl Relay {
    pub fn new(runtime_addr: SocketAddr, pending: Arc<PendingCalls>, interval: Duration) -> Self {
        Self {
            runtime_addr,
            pending,
            interval,
        }
    }

    /// Run until shutdown is signalled or the queue closes, then settle every
    /// outstanding call so no caller waits past shutdown.
    pub async fn run(
        self,
        mut queue: mpsc::UnboundedReceiver<QueuedCall>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(runtime = %self.runtime_addr, "relay loop started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                call = queue.recv() => match call {
                    Some(call) => {
                        self.forward(call).await;
                        tokio::time::sleep(self.interval).await;
                    }
                    None => break,
                },
            }
        }
        tracing::info!(
            outstanding = self.pending.outstanding(),
            "relay loop terminated"
        );
        self.pending.force_complete_all(CallError::RelayShutdown);
    }

    async fn forward(&self, call: QueuedCall) {
        let QueuedCall { request, reply } = call;
        let id = request.id;
        match self.exchange(&request).await {
            Ok(response) => {
                let response_id = response.id;
                let result = response.into_result();
                match reply {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => {
                        if !self.pending.complete(response_id, result) {
                            tracing::debug!(
                                id = response_id,
                                method = %request.method,
                                "response for unknown call id, dropped"
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    id,
                    method = %request.method,
                    error = %error,
                    "native runtime exchange failed"
                );
                match reply {
                    Some(tx) => {
                        let _ = tx.send(Err(error));
                    }
                    None => {
                        self.pending.complete(id, Err(error));
                    }
                }
            }
        }
    }

    /// One connection, one request frame, one response frame.
    async fn exchange(&self, request: &ApiRequest) -> Result<ApiResponse, CallError> {
        let stream = TcpStream::connect(self.runtime_addr)
            .await
            .map_err(|e| CallError::Transport(format!("connect {}: {e}", self.runtime_addr)))?;
        let mut framed = Framed::new(stream, wire::frame_codec());

        let body = request.encode_body()?;
        framed
            .send(body.into())
            .await
            .map_err(|e| CallError::Transport(format!("send: {e}")))?;

        let frame = match framed.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(CallError::Transport(format!("recv: {e}"))),
            None => {
                return Err(CallError::Transport(
                    "connection closed before response".into(),
                ))
            }
        };
        ApiResponse::decode_body(&frame)
    }
}
