//! Typed facade over the runtime's window operations.
//!
//! Every method forwards a `method`/`args` pair through the call facade.
//! A `Window` is cheap to clone and addresses the runtime window whose
//! `label` it carries (`"root"` by default).

use serde_json::{json, Value};

use crate::error::CallError;
use crate::invoke::RuntimeHandle;

#[derive(Clone)]
pub struct Window {
    handle: RuntimeHandle,
    label: String,
}

impl Window {
    pub fn new(handle: RuntimeHandle) -> Self {
        Self {
            handle,
            label: "root".into(),
        }
    }

    /// A facade addressing a different window label.
    pub fn for_label(&self, label: impl Into<String>) -> Self {
        Self {
            handle: self.handle.clone(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn query(&self) -> Option<Value> {
        Some(json!({ "label": self.label }))
    }

    async fn op<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, CallError> {
        self.handle.call(method, self.query()).await
    }

    pub async fn title(&self) -> Result<String, CallError> {
        self.op("window.title").await
    }

    pub async fn is_fullscreen(&self) -> Result<bool, CallError> {
        self.op("window.isFullscreen").await
    }

    pub async fn is_minimized(&self) -> Result<bool, CallError> {
        self.op("window.isMinimized").await
    }

    pub async fn is_maximized(&self) -> Result<bool, CallError> {
        self.op("window.isMaximized").await
    }

    pub async fn is_focused(&self) -> Result<bool, CallError> {
        self.op("window.isFocused").await
    }

    pub async fn is_visible(&self) -> Result<bool, CallError> {
        self.op("window.isVisible").await
    }

    pub async fn scale_factor(&self) -> Result<f64, CallError> {
        self.op("window.scaleFactor").await
    }

    /// Content size as `(width, height)`.
    pub async fn inner_size(&self) -> Result<(u32, u32), CallError> {
        self.op("window.innerSize").await
    }

    /// Frame size as `(width, height)`.
    pub async fn outer_size(&self) -> Result<(u32, u32), CallError> {
        self.op("window.outerSize").await
    }

    /// Current theme, e.g. `light` or `dark`, when the runtime reports one.
    pub async fn theme(&self) -> Result<Option<String>, CallError> {
        self.op("window.theme").await
    }

    pub async fn current_monitor(&self) -> Result<Option<Value>, CallError> {
        self.monitor("window.currentMonitor").await
    }

    pub async fn primary_monitor(&self) -> Result<Option<Value>, CallError> {
        self.monitor("window.primaryMonitor").await
    }

    async fn monitor(&self, method: &str) -> Result<Option<Value>, CallError> {
        self.handle
            .call_map(method, self.query(), |v| {
                Ok(if v.is_null() { None } else { Some(v) })
            })
            .await
    }

    /// Set the window title. The runtime takes the bare string argument.
    pub async fn set_title(&self, title: &str) -> Result<bool, CallError> {
        self.handle
            .call("set_title", Some(Value::String(title.to_owned())))
            .await
    }

    pub async fn set_fullscreen(&self, fullscreen: bool) -> Result<bool, CallError> {
        self.handle
            .call(
                "window.setFullscreen",
                Some(json!({ "label": self.label, "fullscreen": fullscreen })),
            )
            .await
    }

    /// Show or hide the window.
    pub async fn set_visible(&self, visible: bool) -> Result<bool, CallError> {
        let method = if visible { "window.show" } else { "window.hide" };
        self.op(method).await
    }

    pub async fn set_resizable(&self, resizable: bool) -> Result<bool, CallError> {
        self.handle
            .call(
                "window.setResizable",
                Some(json!({ "label": self.label, "resizable": resizable })),
            )
            .await
    }

    pub async fn set_always_on_top(&self, always: bool) -> Result<bool, CallError> {
        self.handle
            .call(
                "window.setAlwaysOnTop",
                Some(json!({ "label": self.label, "alwaysOnTop": always })),
            )
            .await
    }

    pub async fn maximize(&self) -> Result<bool, CallError> {
        self.op("window.maximize").await
    }

    pub async fn minimize(&self) -> Result<bool, CallError> {
        self.op("window.minimize").await
    }

    pub async fn unmaximize(&self) -> Result<bool, CallError> {
        self.op("window.unmaximize").await
    }

    pub async fn unminimize(&self) -> Result<bool, CallError> {
        self.op("window.unminimize").await
    }

    pub async fn center(&self) -> Result<bool, CallError> {
        self.op("window.center").await
    }

    pub async fn set_focus(&self) -> Result<bool, CallError> {
        self.op("window.setFocus").await
    }

    pub async fn request_redraw(&self) -> Result<bool, CallError> {
        self.op("window.requestRedraw").await
    }

    pub async fn close(&self) -> Result<bool, CallError> {
        self.op("window.close").await
    }

    pub async fn destroy(&self) -> Result<bool, CallError> {
        self.op("window.destroy").await
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window").field("label", &self.label).finish()
    }
}
