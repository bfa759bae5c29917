//! In-process stand-in for the native runtime, shared by transport tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use crate::wire;

/// Fake native runtime: one framed exchange per connection, answered by the
/// supplied closure. `None` holds the connection open without replying.
pub(crate) struct FakeRuntime {
    pub addr: SocketAddr,
    /// Request arrays in arrival order.
    pub seen: Arc<Mutex<Vec<Value>>>,
}

pub(crate) async fn spawn_fake_runtime<F>(respond: F) -> FakeRuntime
where
    F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
    spawn_fake_runtime_with(Duration::ZERO, respond).await
}

/// Like [`spawn_fake_runtime`], but waits `delay` before each reply.
pub(crate) async fn spawn_fake_runtime_with<F>(delay: Duration, respond: F) -> FakeRuntime
where
    F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let seen = seen_task.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, wire::frame_codec());
                if let Some(Ok(frame)) = framed.next().await {
                    let request: Value = serde_json::from_slice(&frame).unwrap();
                    seen.lock().unwrap().push(request.clone());
                    match respond(&request) {
                        Some(reply) => {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            let body = serde_json::to_vec(&reply).unwrap();
                            let _ = framed.send(Bytes::from(body)).await;
                        }
                        None => {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                        }
                    }
                }
            });
        }
    });

    FakeRuntime { addr, seen }
}

/// Success reply echoing the request id.
pub(crate) fn reply_ok(request: &Value, result: Value) -> Value {
    serde_json::json!([request[0], 0, "ok", result])
}

/// Poll until the fake runtime has seen `count` requests.
pub(crate) async fn wait_for_requests(runtime: &FakeRuntime, count: usize) {
    for _ in 0..200 {
        if runtime.seen.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("fake runtime never saw {count} requests");
}
