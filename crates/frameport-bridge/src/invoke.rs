//! Typed call facade: build a request, register it, enqueue it, await the
//! reply with a timeout, and convert the raw result.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::CallError;
use crate::pending::PendingCalls;
use crate::relay::QueuedCall;
use crate::wire::ApiRequest;

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalize call arguments into an ordered argument list: nothing becomes
/// the empty list, an array is taken as the list itself, and any other value
/// is wrapped singly. Values are JSON-safe by construction.
pub fn normalize_args(args: Option<Value>) -> Vec<Value> {
    match args {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(value) => vec![value],
    }
}

/// Issues correlated calls to the native runtime through the relay queue.
#[derive(Clone)]
pub struct RuntimeHandle {
    pending: Arc<PendingCalls>,
    queue: mpsc::UnboundedSender<QueuedCall>,
    timeout: Duration,
}

impl RuntimeHandle {
    pub fn new(
        pending: Arc<PendingCalls>,
        queue: mpsc::UnboundedSender<QueuedCall>,
        timeout: Duration,
    ) -> Self {
        Self {
            pending,
            queue,
            timeout,
        }
    }

    /// Issue a call and return the raw result value.
    ///
    /// The pending entry is removed on every exit path: by completion, by
    /// timeout, or when the relay is gone. A response arriving after the
    /// timeout hits the registry's no-op rule and is dropped.
    pub async fn call_raw(&self, method: &str, args: Option<Value>) -> Result<Value, CallError> {
        let id = self.pending.allocate()?;
        let request = ApiRequest::new(id, method, normalize_args(args));
        let (tx, rx) = oneshot::channel();
        self.pending.register(id, tx);

        if self
            .queue
            .send(QueuedCall {
                request,
                reply: None,
            })
            .is_err()
        {
            self.pending.remove(id);
            return Err(CallError::RelayShutdown);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.remove(id);
                Err(CallError::RelayShutdown)
            }
            Err(_) => {
                self.pending.remove(id);
                Err(CallError::Timeout(self.timeout))
            }
        }
    }

    /// Issue a call and validate the result against `T`'s schema.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Option<Value>,
    ) -> Result<T, CallError> {
        let raw = self.call_raw(method, args).await?;
        serde_json::from_value(raw)
            .map_err(|e| CallError::Protocol(format!("result for '{method}': {e}")))
    }

    /// Issue a call and convert the result with the supplied function.
    pub async fn call_map<T, F>(
        &self,
        method: &str,
        args: Option<Value>,
        convert: F,
    ) -> Result<T, CallError>
    where
        F: FnOnce(Value) -> Result<T, CallError>,
    {
        convert(self.call_raw(method, args).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Relay;
    use crate::test_support::{reply_ok, spawn_fake_runtime, spawn_fake_runtime_with};
    use serde_json::json;
    use tokio::sync::watch;

    #[test]
    fn normalize_args_wraps_scalars_singly() {
        assert_eq!(normalize_args(None), Vec::<Value>::new());
        assert_eq!(normalize_args(Some(json!("x"))), vec![json!("x")]);
        assert_eq!(
            normalize_args(Some(json!({"label": "root"}))),
            vec![json!({"label": "root"})]
        );
    }

    #[test]
    fn normalize_args_takes_arrays_as_the_list() {
        assert_eq!(
            normalize_args(Some(json!([1, "two", null]))),
            vec![json!(1), json!("two"), Value::Null]
        );
    }

    fn wire_up(
        addr: std::net::SocketAddr,
        capacity: u16,
        timeout: Duration,
    ) -> (RuntimeHandle, watch::Sender<bool>) {
        let pending = Arc::new(PendingCalls::new(capacity));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = Relay::new(addr, pending.clone(), Duration::from_millis(1));
        tokio::spawn(relay.run(queue_rx, shutdown_rx));
        (RuntimeHandle::new(pending, queue_tx, timeout), shutdown_tx)
    }

    #[tokio::test]
    async fn typed_call_resolves_to_declared_type() {
        let runtime = spawn_fake_runtime(|req| Some(reply_ok(req, json!("My Window")))).await;
        let (handle, _shutdown) = wire_up(runtime.addr, 255, Duration::from_secs(2));

        let title: String = handle
            .call("window.title", Some(json!({"label": "root"})))
            .await
            .unwrap();
        assert_eq!(title, "My Window");
    }

    #[tokio::test]
    async fn typed_call_rejects_mismatched_result() {
        let runtime = spawn_fake_runtime(|req| Some(reply_ok(req, json!(42)))).await;
        let (handle, _shutdown) = wire_up(runtime.addr, 255, Duration::from_secs(2));

        let err = handle
            .call::<String>("window.title", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Protocol(_)));
    }

    #[tokio::test]
    async fn call_map_applies_the_transform() {
        let runtime = spawn_fake_runtime(|req| Some(reply_ok(req, json!([800, 600])))).await;
        let (handle, _shutdown) = wire_up(runtime.addr, 255, Duration::from_secs(2));

        let area = handle
            .call_map("window.innerSize", None, |v| {
                let (w, h): (u64, u64) = serde_json::from_value(v)
                    .map_err(|e| CallError::Protocol(e.to_string()))?;
                Ok(w * h)
            })
            .await
            .unwrap();
        assert_eq!(area, 480_000);
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_to_their_own_callers() {
        // The runtime echoes the method name, so any cross-delivery shows up
        // as a mismatched result.
        let runtime = spawn_fake_runtime(|req| Some(reply_ok(req, req[1].clone()))).await;
        let (handle, _shutdown) = wire_up(runtime.addr, 255, Duration::from_secs(5));

        let mut tasks = Vec::new();
        for n in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let method = format!("method.{n}");
                let result: String = handle.call(&method, None).await.unwrap();
                (method, result)
            }));
        }
        for task in tasks {
            let (method, result) = task.await.unwrap();
            assert_eq!(method, result);
        }
    }

    #[tokio::test]
    async fn timeout_removes_the_pending_entry() {
        let runtime = spawn_fake_runtime(|_| None).await;
        let pending = Arc::new(PendingCalls::new(255));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = Relay::new(runtime.addr, pending.clone(), Duration::from_millis(1));
        tokio::spawn(relay.run(queue_rx, shutdown_rx));
        let handle = RuntimeHandle::new(pending.clone(), queue_tx, Duration::from_millis(50));

        let err = handle.call_raw("window.title", None).await.unwrap_err();
        assert!(matches!(err, CallError::Timeout(_)));
        assert_eq!(pending.outstanding(), 0);
    }

    #[tokio::test]
    async fn late_response_is_discarded_and_the_loop_continues() {
        // Replies arrive 200ms after the request; the caller gives up at 50ms.
        let runtime = spawn_fake_runtime_with(Duration::from_millis(200), |req| {
            Some(reply_ok(req, json!("slow")))
        })
        .await;
        let (handle, _shutdown) = wire_up(runtime.addr, 255, Duration::from_millis(50));

        let err = handle.call_raw("window.title", None).await.unwrap_err();
        assert!(matches!(err, CallError::Timeout(_)));

        // The late reply lands on a removed id and is dropped; a fresh call
        // with a generous deadline still goes through.
        let fresh: String = {
            let patient = RuntimeHandle::new(
                handle.pending.clone(),
                handle.queue.clone(),
                Duration::from_secs(5),
            );
            patient.call("window.theme", None).await.unwrap()
        };
        assert_eq!(fresh, "slow");
    }

    #[tokio::test]
    async fn exhausted_id_space_fails_fast() {
        let runtime = spawn_fake_runtime(|_| None).await;
        let (handle, _shutdown) = wire_up(runtime.addr, 1, Duration::from_secs(5));

        let blocked = handle.clone();
        let first = tokio::spawn(async move { blocked.call_raw("window.title", None).await });
        // Wait until the only id is outstanding.
        crate::test_support::wait_for_requests(&runtime, 1).await;

        let err = handle.call_raw("window.theme", None).await.unwrap_err();
        assert!(matches!(err, CallError::IdSpaceExhausted));
        first.abort();
    }

    #[tokio::test]
    async fn relay_shutdown_fails_queued_callers() {
        let runtime = spawn_fake_runtime(|req| Some(reply_ok(req, json!(true)))).await;
        let (handle, shutdown) = wire_up(runtime.addr, 255, Duration::from_secs(5));

        shutdown.send(true).unwrap();
        // Give the loop a moment to wind down and drop the queue receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = handle.call_raw("window.title", None).await.unwrap_err();
        assert!(matches!(err, CallError::RelayShutdown));
    }
}
