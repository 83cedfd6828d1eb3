use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{json, Value};
use std::time::Duration;

use super::traits::{BackendError, Bounds, ElementHandle, LocatorStrategy, UiBackend};

/// W3C element identifier key. Older servers use the legacy "ELEMENT" key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Tick length for synthesized holds. Single long pauses hit a timeout
/// ceiling on some UiAutomator2 servers, so holds are chained from these.
const HOLD_TICK_MS: u64 = 1000;

/// Session configuration for the UiAutomator2 backend.
#[derive(Debug, Clone)]
pub struct AppiumConfig {
    pub server_url: String,
    pub device_serial: Option<String>,
    pub app_package: Option<String>,
    pub app_activity: Option<String>,
    pub new_command_timeout_s: u64,
}

impl Default for AppiumConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4723".to_string(),
            device_serial: None,
            app_package: None,
            app_activity: None,
            new_command_timeout_s: 300,
        }
    }
}

/// Production backend speaking the W3C/UiAutomator2 wire protocol.
pub struct AppiumBackend {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

/// Escape a literal for embedding in a UiSelector expression.
fn uiselector_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape a literal for a single-quoted XPath string.
fn xpath_escape(s: &str) -> String {
    // XPath 1.0 has no escape inside quotes; drop the quote character rather
    // than produce a broken expression.
    s.replace('\'', "")
}

/// Translate a strategy into a (using, value) locator pair for the wire.
fn strategy_to_wire(strategy: &LocatorStrategy) -> (&'static str, String) {
    match strategy {
        LocatorStrategy::Text(t) => (
            "-android uiautomator",
            format!("new UiSelector().text(\"{}\")", uiselector_escape(t)),
        ),
        LocatorStrategy::TextContains(t) => (
            "-android uiautomator",
            format!("new UiSelector().textContains(\"{}\")", uiselector_escape(t)),
        ),
        LocatorStrategy::DescriptionContains(t) => (
            "-android uiautomator",
            format!(
                "new UiSelector().descriptionContains(\"{}\")",
                uiselector_escape(t)
            ),
        ),
        LocatorStrategy::HintContains(t) => (
            "xpath",
            format!("//*[contains(@hint, '{}')]", xpath_escape(t)),
        ),
        LocatorStrategy::ClassName(c) => ("class name", c.clone()),
        LocatorStrategy::ClassInstance { class, instance } => (
            "-android uiautomator",
            format!(
                "new UiSelector().className(\"{}\").enabled(true).instance({})",
                uiselector_escape(class),
                instance
            ),
        ),
        LocatorStrategy::UiAutomator(expr) => ("-android uiautomator", expr.clone()),
        LocatorStrategy::XPath(x) => ("xpath", x.clone()),
    }
}

/// Convert a wire-level error kind into a backend error.
fn map_wire_error(kind: &str, message: &str) -> BackendError {
    match kind {
        "stale element reference" => BackendError::Stale,
        "no such element" => BackendError::NoSuchElement,
        "unknown command" => BackendError::Unsupported("unknown command"),
        "unknown method" => BackendError::Unsupported("unknown method"),
        _ => BackendError::Protocol(format!("{}: {}", kind, message)),
    }
}

/// Extract an element id from a W3C or legacy element object.
fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

impl AppiumBackend {
    /// Open a new session against the automation server.
    pub async fn open(config: &AppiumConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::new();

        let mut caps = json!({
            "platformName": "Android",
            "appium:automationName": "UiAutomator2",
            "appium:newCommandTimeout": config.new_command_timeout_s,
        });
        if let Some(ref serial) = config.device_serial {
            caps["appium:udid"] = json!(serial);
        }
        if let Some(ref package) = config.app_package {
            caps["appium:appPackage"] = json!(package);
        }
        if let Some(ref activity) = config.app_activity {
            caps["appium:appActivity"] = json!(activity);
        }

        let body = json!({ "capabilities": { "alwaysMatch": caps, "firstMatch": [{}] } });
        let url = format!("{}/session", config.server_url.trim_end_matches('/'));
        let resp = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("session create failed: {}", e)))?;
        let value = Self::unwrap_response(resp).await?;

        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                BackendError::Protocol("session response carried no sessionId".to_string())
            })?;

        debug!("opened automation session {}", session_id);
        Ok(Self {
            http,
            base: config.server_url.trim_end_matches('/').to_string(),
            session_id,
        })
    }

    /// Parse a wire response, surfacing the protocol error kind if present.
    async fn unwrap_response(resp: reqwest::Response) -> Result<Value, BackendError> {
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("malformed response body: {}", e)))?;
        let value = body.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let kind = value
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            return Err(map_wire_error(kind, message));
        }
        Ok(value)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BackendError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("POST {} failed: {}", path, e)))?;
        Self::unwrap_response(resp).await
    }

    async fn get(&self, path: &str) -> Result<Value, BackendError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("GET {} failed: {}", path, e)))?;
        Self::unwrap_response(resp).await
    }

    /// Perform a W3C pointer action sequence with a single touch pointer.
    async fn perform_pointer(&self, actions: Vec<Value>) -> Result<(), BackendError> {
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "finger",
                "parameters": { "pointerType": "touch" },
                "actions": actions,
            }]
        });
        self.post("/actions", body).await?;
        Ok(())
    }
}

fn pointer_move(x: i32, y: i32, duration_ms: u64) -> Value {
    json!({ "type": "pointerMove", "duration": duration_ms, "origin": "viewport", "x": x, "y": y })
}

fn pointer_down() -> Value {
    json!({ "type": "pointerDown", "button": 0 })
}

fn pointer_up() -> Value {
    json!({ "type": "pointerUp", "button": 0 })
}

fn pause(duration_ms: u64) -> Value {
    json!({ "type": "pause", "duration": duration_ms })
}

#[async_trait]
impl UiBackend for AppiumBackend {
    async fn query(
        &self,
        strategy: &LocatorStrategy,
    ) -> Result<Vec<ElementHandle>, BackendError> {
        let (using, value) = strategy_to_wire(strategy);
        let result = self
            .post("/elements", json!({ "using": using, "value": value }))
            .await;
        let found = match result {
            Ok(v) => v,
            // A strict server may answer the plural endpoint with an error
            // instead of an empty list.
            Err(BackendError::NoSuchElement) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let handles = found
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(element_id)
                    .map(ElementHandle::new)
                    .collect()
            })
            .unwrap_or_default();
        Ok(handles)
    }

    async fn tap(&self, element: &ElementHandle) -> Result<(), BackendError> {
        self.post(&format!("/element/{}/click", element.id), json!({}))
            .await?;
        Ok(())
    }

    async fn set_text(&self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        self.post(
            &format!("/element/{}/value", element.id),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn clear_text(&self, element: &ElementHandle) -> Result<(), BackendError> {
        self.post(&format!("/element/{}/clear", element.id), json!({}))
            .await?;
        Ok(())
    }

    async fn read_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        let value = self
            .get(&format!("/element/{}/attribute/{}", element.id, name))
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn is_interactable(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<bool>, BackendError> {
        let displayed = match self.get(&format!("/element/{}/displayed", element.id)).await {
            Ok(v) => v.as_bool(),
            Err(BackendError::Stale) => return Ok(None),
            Err(e) => return Err(e),
        };
        if displayed == Some(false) {
            return Ok(Some(false));
        }

        let enabled = match self.get(&format!("/element/{}/enabled", element.id)).await {
            Ok(v) => v.as_bool(),
            Err(BackendError::Stale) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (displayed, enabled) {
            (Some(d), Some(e)) => Some(d && e),
            _ => None,
        })
    }

    async fn bounds(&self, element: &ElementHandle) -> Result<Bounds, BackendError> {
        let rect = self.get(&format!("/element/{}/rect", element.id)).await?;
        let field = |name: &str| -> Result<i32, BackendError> {
            rect.get(name)
                .and_then(|v| v.as_f64())
                .map(|f| f as i32)
                .ok_or_else(|| {
                    BackendError::Protocol(format!("element rect missing field '{}'", name))
                })
        };
        Ok(Bounds::from_rect(
            field("x")?,
            field("y")?,
            field("width")?,
            field("height")?,
        ))
    }

    async fn press_key(&self, keycode: u32) -> Result<(), BackendError> {
        self.post(
            "/appium/device/press_keycode",
            json!({ "keycode": keycode }),
        )
        .await?;
        Ok(())
    }

    async fn long_press(
        &self,
        element: &ElementHandle,
        duration: Duration,
    ) -> Result<(), BackendError> {
        self.post(
            "/execute/sync",
            json!({
                "script": "mobile: longClickGesture",
                "args": [{ "elementId": element.id, "duration": duration.as_millis() as u64 }],
            }),
        )
        .await?;
        Ok(())
    }

    async fn touch_hold(&self, x: i32, y: i32, duration: Duration) -> Result<(), BackendError> {
        let total_ms = duration.as_millis() as u64;
        let mut actions = vec![pointer_move(x, y, 0), pointer_down()];
        let mut remaining = total_ms;
        while remaining > 0 {
            let tick = remaining.min(HOLD_TICK_MS);
            actions.push(pause(tick));
            remaining -= tick;
        }
        actions.push(pointer_up());
        self.perform_pointer(actions).await
    }

    async fn hold_with_motion(
        &self,
        x: i32,
        y: i32,
        duration: Duration,
    ) -> Result<(), BackendError> {
        // ~2 px oscillation; each move+pause pair covers 500 ms of the hold.
        let total_ms = duration.as_millis() as u64;
        let mut actions = vec![pointer_move(x, y, 0), pointer_down()];
        let mut elapsed = 0u64;
        let mut offset = 2i32;
        while elapsed < total_ms {
            let slice = (total_ms - elapsed).min(500);
            let move_ms = slice.min(250);
            actions.push(pointer_move(x + offset, y, move_ms));
            if slice > move_ms {
                actions.push(pause(slice - move_ms));
            }
            offset = -offset;
            elapsed += slice;
        }
        actions.push(pointer_up());
        self.perform_pointer(actions).await
    }

    async fn swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), BackendError> {
        let actions = vec![
            pointer_move(x1, y1, 0),
            pointer_down(),
            pointer_move(x2, y2, duration.as_millis() as u64),
            pointer_up(),
        ];
        self.perform_pointer(actions).await
    }

    async fn hide_keyboard(&self) -> Result<(), BackendError> {
        // Errors out when no keyboard is shown; callers treat that as done.
        self.post("/appium/device/hide_keyboard", json!({})).await?;
        Ok(())
    }

    async fn screen_size(&self) -> Result<(u32, u32), BackendError> {
        let rect = self.get("/window/rect").await?;
        let field = |name: &str| -> Result<u32, BackendError> {
            rect.get(name)
                .and_then(|v| v.as_f64())
                .map(|f| f as u32)
                .ok_or_else(|| {
                    BackendError::Protocol(format!("window rect missing field '{}'", name))
                })
        };
        Ok((field("width")?, field("height")?))
    }

    async fn close(&self) -> Result<(), BackendError> {
        let url = format!("{}/session/{}", self.base, self.session_id);
        let resp = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("session delete failed: {}", e)))?;
        if let Err(e) = Self::unwrap_response(resp).await {
            warn!("session teardown reported {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_to_wire_text_contains() {
        let (using, value) = strategy_to_wire(&LocatorStrategy::TextContains("Next".into()));
        assert_eq!(using, "-android uiautomator");
        assert_eq!(value, "new UiSelector().textContains(\"Next\")");
    }

    #[test]
    fn test_strategy_to_wire_escapes_quotes() {
        let (_, value) = strategy_to_wire(&LocatorStrategy::Text("say \"hi\"".into()));
        assert_eq!(value, "new UiSelector().text(\"say \\\"hi\\\"\")");
    }

    #[test]
    fn test_strategy_to_wire_class_instance() {
        let (using, value) = strategy_to_wire(&LocatorStrategy::ClassInstance {
            class: "android.widget.EditText".into(),
            instance: 1,
        });
        assert_eq!(using, "-android uiautomator");
        assert_eq!(
            value,
            "new UiSelector().className(\"android.widget.EditText\").enabled(true).instance(1)"
        );
    }

    #[test]
    fn test_map_wire_error_stale() {
        assert!(map_wire_error("stale element reference", "gone").is_stale());
        assert!(matches!(
            map_wire_error("no such element", ""),
            BackendError::NoSuchElement
        ));
    }

    #[test]
    fn test_element_id_both_keys() {
        let w3c = json!({ ELEMENT_KEY: "abc" });
        let legacy = json!({ LEGACY_ELEMENT_KEY: "def" });
        assert_eq!(element_id(&w3c).as_deref(), Some("abc"));
        assert_eq!(element_id(&legacy).as_deref(), Some("def"));
    }

    #[test]
    fn test_hold_tick_chunking() {
        // 15 s hold must be chained from 1 s pauses, never one long pause.
        let total: u64 = 15_000;
        let ticks = (total + HOLD_TICK_MS - 1) / HOLD_TICK_MS;
        assert_eq!(ticks, 15);
    }
}
