use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One way of querying the UI tree for candidate elements.
///
/// Strategies are carried in ordered slices; the declared order encodes a
/// reliability ranking, most trustworthy first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// Exact visible text.
    Text(String),
    /// Substring of visible text.
    TextContains(String),
    /// Substring of the accessibility description (content-desc).
    DescriptionContains(String),
    /// Substring of the input hint attribute.
    HintContains(String),
    /// Widget class, e.g. "android.widget.EditText".
    ClassName(String),
    /// Widget class narrowed to the nth enabled instance (0-based).
    ClassInstance { class: String, instance: u32 },
    /// Raw UiSelector expression, passed through untranslated.
    UiAutomator(String),
    /// XPath over the UI tree.
    XPath(String),
}

impl LocatorStrategy {
    /// Short human-readable form for log lines.
    pub fn describe(&self) -> String {
        match self {
            LocatorStrategy::Text(t) => format!("text='{}'", t),
            LocatorStrategy::TextContains(t) => format!("text~'{}'", t),
            LocatorStrategy::DescriptionContains(t) => format!("desc~'{}'", t),
            LocatorStrategy::HintContains(t) => format!("hint~'{}'", t),
            LocatorStrategy::ClassName(c) => format!("class='{}'", c),
            LocatorStrategy::ClassInstance { class, instance } => {
                format!("class='{}'[{}]", class, instance)
            }
            LocatorStrategy::UiAutomator(e) => format!("uiautomator'{}'", e),
            LocatorStrategy::XPath(x) => format!("xpath'{}'", x),
        }
    }
}

/// Opaque reference to a UI node, borrowed from the backend.
///
/// A handle may go stale at any point after it is obtained; nothing in the
/// engine assumes one stays valid across a wait or a page transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Element bounding box in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// Center point of the bounds.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

/// Failures at the backend boundary. Everything the wire or the adb process
/// can throw is converted into one of these before it reaches the engine.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The handle no longer corresponds to a live UI node.
    #[error("stale element reference")]
    Stale,
    #[error("no such element")]
    NoSuchElement,
    /// The backend does not implement this primitive on this device.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    pub fn is_stale(&self) -> bool {
        matches!(self, BackendError::Stale)
    }
}

/// Device-automation backend: the element-handle side of the world.
///
/// The production implementation speaks the W3C/UiAutomator2 wire protocol;
/// tests substitute a scripted mock. Handles returned by `query` may be
/// invalidated by the device at any time, so callers re-resolve rather than
/// hold on to them.
#[async_trait]
pub trait UiBackend: Send + Sync {
    /// Query for all elements matching one strategy. May return empty; must
    /// not block indefinitely.
    async fn query(&self, strategy: &LocatorStrategy)
        -> Result<Vec<ElementHandle>, BackendError>;

    async fn tap(&self, element: &ElementHandle) -> Result<(), BackendError>;

    /// Replace-or-append text through the element's own input channel.
    async fn set_text(&self, element: &ElementHandle, text: &str) -> Result<(), BackendError>;

    /// Native field clear. Known unreliable for some field classes.
    async fn clear_text(&self, element: &ElementHandle) -> Result<(), BackendError>;

    async fn read_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError>;

    /// Tri-state interactability: `Some(true)` / `Some(false)` when the
    /// backend could determine it, `None` when it could not.
    async fn is_interactable(&self, element: &ElementHandle)
        -> Result<Option<bool>, BackendError>;

    async fn bounds(&self, element: &ElementHandle) -> Result<Bounds, BackendError>;

    /// Press an Android keycode at the current focus.
    async fn press_key(&self, keycode: u32) -> Result<(), BackendError>;

    /// Whether the device exposes a native long-press primitive.
    fn supports_long_press(&self) -> bool {
        true
    }

    /// Native long-press gesture for the exact duration (optional capability).
    async fn long_press(
        &self,
        element: &ElementHandle,
        duration: Duration,
    ) -> Result<(), BackendError>;

    /// Synthesized hold at a point, built from repeated short pointer pauses.
    async fn touch_hold(&self, x: i32, y: i32, duration: Duration) -> Result<(), BackendError>;

    /// Hold with ~2 px back-and-forth motion, for press detectors that need
    /// movement to register continued contact.
    async fn hold_with_motion(
        &self,
        x: i32,
        y: i32,
        duration: Duration,
    ) -> Result<(), BackendError>;

    async fn swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), BackendError>;

    async fn hide_keyboard(&self) -> Result<(), BackendError>;

    /// Screen size in pixels (width, height).
    async fn screen_size(&self) -> Result<(u32, u32), BackendError>;

    /// Release the underlying session. Must be safe to call exactly once.
    async fn close(&self) -> Result<(), BackendError>;
}

/// Out-of-band input injection. Operates outside the element-handle model:
/// it can only reach the currently focused field or fixed coordinates.
#[async_trait]
pub trait RawInput: Send + Sync {
    async fn inject_text(&self, text: &str) -> Result<(), BackendError>;

    async fn inject_swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), BackendError>;

    async fn inject_key(&self, keycode: u32) -> Result<(), BackendError>;
}
