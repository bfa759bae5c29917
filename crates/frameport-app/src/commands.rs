//! Built-in commands shipped with the binary.

use frameport_bridge::Window;
use frameport_commands::{CommandRegistry, CommandSpec, ParamSpec, ParamType};
use serde_json::Value;

/// Register the built-in command set.
pub fn register_builtin(registry: &mut CommandRegistry) {
    registry.register(CommandSpec::new(
        "greet",
        vec![
            ParamSpec::injected("window", "window"),
            ParamSpec::required("name", ParamType::String),
        ],
        |args| {
            Box::pin(async move {
                let window = args
                    .resource::<Window>("window")
                    .ok_or("window dependency not resolved")?;
                let name = args.str("name").unwrap_or_default().to_string();

                let retitled = window.set_title(&format!("Hello, {name}!")).await?;
                if retitled {
                    Ok(Value::String(format!(
                        "Hello, {name}! You've been greeted from the native runtime!"
                    )))
                } else {
                    Ok(Value::String(format!(
                        "Could not update the title, but hello anyway, {name}!"
                    )))
                }
            })
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use frameport_bridge::{wire, PendingCalls, Relay, RuntimeHandle};
    use frameport_commands::{DependencyCache, Dispatcher, DispatchOutcome, ParamType};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::{mpsc, watch};
    use tokio_util::codec::Framed;

    #[test]
    fn greet_is_registered_with_its_parameters() {
        let mut registry = CommandRegistry::new();
        register_builtin(&mut registry);

        let spec = &registry.candidates("greet").unwrap()[0];
        assert_eq!(spec.params.len(), 2);
        assert_eq!(spec.params[0].name, "window");
        assert_eq!(spec.params[0].ty, ParamType::Injected("window"));
        assert_eq!(spec.params[1].name, "name");
        assert_eq!(spec.params[1].ty, ParamType::String);
    }

    /// Minimal native runtime: answers every `set_title` with `true`.
    async fn spawn_title_runtime() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut framed = Framed::new(stream, wire::frame_codec());
                    if let Some(Ok(frame)) = framed.next().await {
                        let request: serde_json::Value =
                            serde_json::from_slice(&frame).unwrap();
                        assert_eq!(request[1], "set_title");
                        let reply = json!([request[0], 0, "ok", true]);
                        let body = serde_json::to_vec(&reply).unwrap();
                        let _ = framed.send(Bytes::from(body)).await;
                    }
                });
            }
        });
        addr
    }

    fn dispatcher_with(handle: RuntimeHandle) -> Dispatcher {
        let mut registry = CommandRegistry::new();
        register_builtin(&mut registry);
        let mut resources = DependencyCache::new();
        resources.provide("window", move || Ok(Window::new(handle.clone())));
        Dispatcher::new(Arc::new(registry), Arc::new(resources))
    }

    #[tokio::test]
    async fn greet_sets_the_title_and_returns_the_greeting() {
        let addr = spawn_title_runtime().await;
        let pending = Arc::new(PendingCalls::new(255));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = Relay::new(addr, pending.clone(), Duration::from_millis(1));
        tokio::spawn(relay.run(queue_rx, shutdown_rx));
        let handle = RuntimeHandle::new(pending, queue_tx, Duration::from_secs(2));

        let dispatcher = dispatcher_with(handle);
        let mut payload = Map::new();
        payload.insert("name".into(), json!("Ada"));
        let outcome = dispatcher.dispatch("greet", 7, 8, &payload).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Success {
                result_id: 7,
                result: json!("Hello, Ada! You've been greeted from the native runtime!")
            }
        );
    }

    #[tokio::test]
    async fn greet_surfaces_bridge_failures_as_a_tagged_error() {
        // No relay is running: the queue receiver is dropped immediately.
        let pending = Arc::new(PendingCalls::new(255));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        drop(queue_rx);
        let handle = RuntimeHandle::new(pending, queue_tx, Duration::from_millis(100));

        let dispatcher = dispatcher_with(handle);
        let mut payload = Map::new();
        payload.insert("name".into(), json!("Ada"));
        let outcome = dispatcher.dispatch("greet", 7, 8, &payload).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Error {
                error_id: 8,
                error: "relay shut down".into()
            }
        );
    }
}
