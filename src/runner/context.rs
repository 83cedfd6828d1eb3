use anyhow::{Context, Result};
use log::{debug, warn};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::Timing;
use crate::driver::adb::AdbInput;
use crate::driver::{AppiumBackend, AppiumConfig, RawInput, UiBackend};

/// Live connection state for one workflow run: the automation backend plus
/// the raw input-injection channel used as a last resort.
///
/// Created once per run and released unconditionally at the end; the
/// orchestrator is its sole owner while a run is in flight.
pub struct SessionContext {
    backend: Box<dyn UiBackend>,
    raw: Box<dyn RawInput>,
    timing: Timing,
    closed: AtomicBool,
}

impl SessionContext {
    /// Assemble a context from already-constructed channels. This is the
    /// seam tests use to substitute scripted backends.
    pub fn new(backend: Box<dyn UiBackend>, raw: Box<dyn RawInput>, timing: Timing) -> Self {
        Self {
            backend,
            raw,
            timing,
            closed: AtomicBool::new(false),
        }
    }

    /// Open a production session: UiAutomator2 server + adb raw channel.
    pub async fn open(config: &AppiumConfig, timing: Timing) -> Result<Self> {
        let backend = AppiumBackend::open(config)
            .await
            .context("failed to open automation session")?;
        let raw = AdbInput::new(config.device_serial.as_deref());
        Ok(Self::new(Box::new(backend), Box::new(raw), timing))
    }

    pub fn backend(&self) -> &dyn UiBackend {
        &*self.backend
    }

    pub fn raw(&self) -> &dyn RawInput {
        &*self.raw
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Sleep a jittered duration drawn from the given millisecond range.
    pub async fn settle(&self, range_ms: (u64, u64)) {
        let (lo, hi) = range_ms;
        let ms = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    pub async fn settle_after_tap(&self) {
        self.settle(self.timing.settle_after_tap_ms).await;
    }

    pub async fn settle_after_type(&self) {
        self.settle(self.timing.settle_after_type_ms).await;
    }

    /// Release the backend session. Idempotent; later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing automation session");
        if let Err(e) = self.backend.close().await {
            warn!("session close reported {}", e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
