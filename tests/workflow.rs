//! End-to-end coverage over a scripted backend: resolution order, text-entry
//! normalization, hold synthesis tiers, and orchestration policy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use droidform::config::Timing;
use droidform::driver::{
    BackendError, Bounds, ElementHandle, LocatorStrategy, RawInput, UiBackend,
};
use droidform::engine::{self, HoldTarget};
use droidform::error::EngineError;
use droidform::runner::{run_workflow, SessionContext, StepStatus, WorkflowStep};

const KEYCODE_DEL: u32 = 67;

/// Shared scripted state for the mock backend and raw channel.
#[derive(Default)]
struct MockState {
    /// Elements returned per strategy, keyed by `describe()`.
    elements: HashMap<String, Vec<ElementHandle>>,
    /// Interactability override per element id; absent means `Some(true)`.
    interactable: HashMap<String, Option<bool>>,
    /// Attribute values keyed by (element id, attribute name).
    attributes: HashMap<(String, String), String>,
    /// Remaining scripted stale failures per element id; each tap on the
    /// element consumes one before taps start succeeding.
    stale_taps: HashMap<String, u32>,

    query_log: Vec<String>,
    taps: Vec<String>,
    set_texts: Vec<(String, String)>,
    clear_calls: Vec<String>,
    pressed_keys: Vec<u32>,
    holds: Vec<(&'static str, u64)>,
    raw_swipes: Vec<(i32, i32, i32, i32, u64)>,
    closed: bool,

    fail_native_hold: bool,
    fail_tick_hold: bool,
    fail_raw_swipe: bool,
}

type Shared = Arc<Mutex<MockState>>;

struct MockBackend(Shared);
struct MockRaw(Shared);

#[async_trait]
impl UiBackend for MockBackend {
    async fn query(
        &self,
        strategy: &LocatorStrategy,
    ) -> Result<Vec<ElementHandle>, BackendError> {
        let mut state = self.0.lock().unwrap();
        let key = strategy.describe();
        state.query_log.push(key.clone());
        Ok(state.elements.get(&key).cloned().unwrap_or_default())
    }

    async fn tap(&self, element: &ElementHandle) -> Result<(), BackendError> {
        let mut state = self.0.lock().unwrap();
        state.taps.push(element.id.clone());
        if let Some(remaining) = state.stale_taps.get_mut(&element.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BackendError::Stale);
            }
        }
        Ok(())
    }

    async fn set_text(&self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        self.0
            .lock()
            .unwrap()
            .set_texts
            .push((element.id.clone(), text.to_string()));
        Ok(())
    }

    async fn clear_text(&self, element: &ElementHandle) -> Result<(), BackendError> {
        self.0.lock().unwrap().clear_calls.push(element.id.clone());
        Ok(())
    }

    async fn read_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        let state = self.0.lock().unwrap();
        Ok(state
            .attributes
            .get(&(element.id.clone(), name.to_string()))
            .cloned())
    }

    async fn is_interactable(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<bool>, BackendError> {
        let state = self.0.lock().unwrap();
        Ok(state
            .interactable
            .get(&element.id)
            .cloned()
            .unwrap_or(Some(true)))
    }

    async fn bounds(&self, _element: &ElementHandle) -> Result<Bounds, BackendError> {
        Ok(Bounds::from_rect(440, 935, 200, 50))
    }

    async fn press_key(&self, keycode: u32) -> Result<(), BackendError> {
        self.0.lock().unwrap().pressed_keys.push(keycode);
        Ok(())
    }

    async fn long_press(
        &self,
        _element: &ElementHandle,
        duration: Duration,
    ) -> Result<(), BackendError> {
        let mut state = self.0.lock().unwrap();
        if state.fail_native_hold {
            return Err(BackendError::Unsupported("long press"));
        }
        state.holds.push(("native", duration.as_millis() as u64));
        Ok(())
    }

    async fn touch_hold(&self, _x: i32, _y: i32, duration: Duration) -> Result<(), BackendError> {
        let mut state = self.0.lock().unwrap();
        if state.fail_tick_hold {
            return Err(BackendError::Protocol("pointer sequence rejected".into()));
        }
        state.holds.push(("ticks", duration.as_millis() as u64));
        Ok(())
    }

    async fn hold_with_motion(
        &self,
        _x: i32,
        _y: i32,
        duration: Duration,
    ) -> Result<(), BackendError> {
        self.0
            .lock()
            .unwrap()
            .holds
            .push(("motion", duration.as_millis() as u64));
        Ok(())
    }

    async fn swipe(
        &self,
        _x1: i32,
        _y1: i32,
        _x2: i32,
        _y2: i32,
        _duration: Duration,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn hide_keyboard(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn screen_size(&self) -> Result<(u32, u32), BackendError> {
        Ok((1080, 1920))
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.0.lock().unwrap().closed = true;
        Ok(())
    }
}

#[async_trait]
impl RawInput for MockRaw {
    async fn inject_text(&self, _text: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn inject_swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), BackendError> {
        let mut state = self.0.lock().unwrap();
        if state.fail_raw_swipe {
            return Err(BackendError::Transport("device offline".into()));
        }
        state
            .raw_swipes
            .push((x1, y1, x2, y2, duration.as_millis() as u64));
        Ok(())
    }

    async fn inject_key(&self, _keycode: u32) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Near-zero delays so a test run stays fast.
fn test_timing() -> Timing {
    Timing {
        settle_after_tap_ms: (0, 0),
        settle_after_type_ms: (0, 0),
        focus_delay_ms: 0,
        poll_interval_ms: 1,
        resolve_timeout_ms: 30,
        retry_backoff_ms: 1,
        attempt_cap: 3,
        min_resolve_passes: 2,
        dropdown_render_ms: 0,
        backspace_interval_ms: 0,
        digit_key_interval_ms: 0,
        blind_backspace_count: 15,
        backspace_margin: 5,
        post_hold_settle_ms: 0,
        center_tolerance: 0.2,
    }
}

fn mock_session(state: &Shared) -> SessionContext {
    SessionContext::new(
        Box::new(MockBackend(Arc::clone(state))),
        Box::new(MockRaw(Arc::clone(state))),
        test_timing(),
    )
}

fn seed(state: &Shared, strategy: &LocatorStrategy, ids: &[&str]) {
    state.lock().unwrap().elements.insert(
        strategy.describe(),
        ids.iter().map(|id| ElementHandle::new(*id)).collect(),
    );
}

#[tokio::test]
async fn first_strategy_wins_when_both_match() {
    let state = Shared::default();
    let primary = LocatorStrategy::Text("Next".into());
    let secondary = LocatorStrategy::TextContains("Next".into());
    seed(&state, &primary, &["el-primary"]);
    seed(&state, &secondary, &["el-secondary"]);

    let ctx = mock_session(&state);
    engine::tap(&ctx, &[primary.clone(), secondary], "next button")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.taps, vec!["el-primary"]);
    assert_eq!(s.query_log[0], primary.describe());
}

#[tokio::test]
async fn later_strategy_used_when_earlier_finds_nothing() {
    let state = Shared::default();
    let primary = LocatorStrategy::HintContains("email".into());
    let fallback = LocatorStrategy::ClassName("android.widget.EditText".into());
    seed(&state, &fallback, &["el-edit"]);

    let ctx = mock_session(&state);
    engine::tap(&ctx, &[primary.clone(), fallback.clone()], "email field")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.taps, vec!["el-edit"]);
    // The primary strategy was polled before the fallback matched.
    assert!(s.query_log.contains(&primary.describe()));
}

#[tokio::test]
async fn interactable_unknown_candidate_is_retained() {
    let state = Shared::default();
    let strategy = LocatorStrategy::Text("Submit".into());
    seed(&state, &strategy, &["el-disabled", "el-unknown"]);
    {
        let mut s = state.lock().unwrap();
        s.interactable.insert("el-disabled".into(), Some(false));
        s.interactable.insert("el-unknown".into(), None);
    }

    let ctx = mock_session(&state);
    engine::tap(&ctx, &[strategy], "submit button").await.unwrap();

    assert_eq!(state.lock().unwrap().taps, vec!["el-unknown"]);
}

#[tokio::test]
async fn stale_tap_is_recovered_by_re_resolving_the_same_strategies() {
    let state = Shared::default();
    let strategy = LocatorStrategy::Text("Next".into());
    seed(&state, &strategy, &["el-next"]);
    state.lock().unwrap().stale_taps.insert("el-next".into(), 1);

    let ctx = mock_session(&state);
    engine::tap(&ctx, &[strategy.clone()], "next button")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    // The stale first tap forces a second attempt on a fresh handle.
    assert_eq!(s.taps, vec!["el-next", "el-next"]);
    // Every query before and after the stale failure uses the declared
    // strategy list unchanged.
    assert!(s.query_log.len() >= 2);
    assert!(s.query_log.iter().all(|q| *q == strategy.describe()));
}

#[tokio::test]
async fn missing_element_reports_not_found() {
    let state = Shared::default();
    let ctx = mock_session(&state);

    let err = engine::tap(
        &ctx,
        &[LocatorStrategy::Text("Nowhere".into())],
        "ghost button",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn year_field_never_uses_native_clear() {
    let state = Shared::default();
    let strategy = LocatorStrategy::TextContains("Year".into());
    seed(&state, &strategy, &["el-year"]);
    state.lock().unwrap().attributes.insert(
        ("el-year".into(), "text".into()),
        "1990".to_string(),
    );

    let ctx = mock_session(&state);
    engine::type_text(&ctx, &[strategy], "1994", "birth year")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert!(s.clear_calls.is_empty());
    // Content length 4 plus the margin of 5.
    let backspaces = s.pressed_keys.iter().filter(|&&k| k == KEYCODE_DEL).count();
    assert_eq!(backspaces, 9);
    assert_eq!(s.set_texts, vec![("el-year".to_string(), "1994".to_string())]);
}

#[tokio::test]
async fn ordinary_field_uses_native_clear() {
    let state = Shared::default();
    let strategy = LocatorStrategy::HintContains("email".into());
    seed(&state, &strategy, &["el-email"]);

    let ctx = mock_session(&state);
    engine::type_text(&ctx, &[strategy], "user@example.com", "email field")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.clear_calls, vec!["el-email"]);
    assert!(s.pressed_keys.is_empty());
}

#[tokio::test]
async fn reentry_produces_identical_final_state() {
    let state = Shared::default();
    let strategy = LocatorStrategy::HintContains("email".into());
    seed(&state, &strategy, &["el-email"]);

    let ctx = mock_session(&state);
    engine::type_text(&ctx, &[strategy.clone()], "user@example.com", "email field")
        .await
        .unwrap();
    engine::type_text(&ctx, &[strategy], "user@example.com", "email field")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    // Each entry clears first, so the field content is the value exactly
    // once regardless of how many times the step ran.
    assert_eq!(s.clear_calls.len(), 2);
    assert_eq!(s.set_texts.len(), 2);
    assert!(s.set_texts.iter().all(|(_, t)| t == "user@example.com"));
}

#[tokio::test]
async fn hold_falls_through_to_raw_swipe_with_full_duration() {
    let state = Shared::default();
    {
        let mut s = state.lock().unwrap();
        s.fail_native_hold = true;
        s.fail_tick_hold = true;
    }
    let strategy = LocatorStrategy::DescriptionContains("press and hold".into());
    seed(&state, &strategy, &["el-hold"]);

    let ctx = mock_session(&state);
    engine::press_and_hold(
        &ctx,
        &HoldTarget::Element(vec![strategy]),
        Duration::from_millis(15_000),
        "hold control",
    )
    .await
    .unwrap();

    let s = state.lock().unwrap();
    assert!(s.holds.is_empty());
    assert_eq!(s.raw_swipes.len(), 1);
    let (x1, y1, x2, y2, ms) = s.raw_swipes[0];
    assert_eq!((x1, y1), (x2, y2));
    assert!(ms >= 15_000);
}

#[tokio::test]
async fn hold_without_element_uses_screen_fraction() {
    let state = Shared::default();
    let ctx = mock_session(&state);

    engine::press_and_hold(
        &ctx,
        &HoldTarget::ScreenFraction { x: 0.5, y: 0.6 },
        Duration::from_millis(2_000),
        "hold point",
    )
    .await
    .unwrap();

    let s = state.lock().unwrap();
    // Native tier needs an element, so the tick tier handles the point hold.
    assert_eq!(s.holds, vec![("ticks", 2_000)]);
}

#[tokio::test]
async fn dropdown_selects_matching_option() {
    let state = Shared::default();
    let dropdown = LocatorStrategy::TextContains("Month".into());
    seed(&state, &dropdown, &["el-month"]);
    seed(&state, &LocatorStrategy::Text("June".into()), &["el-june"]);

    let ctx = mock_session(&state);
    engine::select_value(&ctx, &[dropdown], "June", "month picker")
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.taps, vec!["el-month", "el-june"]);
}

fn failing_step(name: &str, critical: bool) -> WorkflowStep {
    if critical {
        WorkflowStep::critical(name, |_ctx| {
            Box::pin(async { Err(EngineError::not_found("scripted failure")) })
        })
    } else {
        WorkflowStep::optional(name, |_ctx| {
            Box::pin(async { Err(EngineError::not_found("scripted failure")) })
        })
    }
}

fn passing_step(name: &str, critical: bool) -> WorkflowStep {
    if critical {
        WorkflowStep::critical(name, |_ctx| Box::pin(async { Ok(()) }))
    } else {
        WorkflowStep::optional(name, |_ctx| Box::pin(async { Ok(()) }))
    }
}

#[tokio::test]
async fn critical_failure_aborts_and_omits_later_steps() {
    let state = Shared::default();
    let ctx = mock_session(&state);

    let result = run_workflow(
        vec![failing_step("launch", true), passing_step("details", false)],
        ctx,
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.aborted_at.as_deref(), Some("launch"));
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].name, "launch");
    assert!(matches!(result.steps[0].status, StepStatus::Failed { .. }));
    // The session is released even on the abort path.
    assert!(state.lock().unwrap().closed);
}

#[tokio::test]
async fn optional_failure_is_recorded_and_run_continues() {
    let state = Shared::default();
    let ctx = mock_session(&state);

    let result = run_workflow(
        vec![failing_step("birth day", false), passing_step("birth year", true)],
        ctx,
    )
    .await;

    assert!(result.success);
    assert!(result.aborted_at.is_none());
    assert_eq!(result.steps.len(), 2);
    assert!(matches!(result.steps[0].status, StepStatus::Failed { .. }));
    assert!(matches!(result.steps[1].status, StepStatus::Passed));
}

#[tokio::test]
async fn form_sequence_runs_in_order_over_scripted_screen() {
    let state = Shared::default();
    let email = LocatorStrategy::HintContains("email".into());
    let year = LocatorStrategy::TextContains("Year".into());
    let month = LocatorStrategy::TextContains("Month".into());
    seed(&state, &email, &["el-email"]);
    seed(&state, &year, &["el-year"]);
    seed(&state, &month, &["el-month"]);
    seed(&state, &LocatorStrategy::Text("June".into()), &["el-june"]);

    let ctx = mock_session(&state);

    let email_step = WorkflowStep::critical("email", move |ctx| {
        let email = email.clone();
        Box::pin(async move {
            engine::type_text(&ctx, &[email], "user@example.com", "email field").await
        })
    });
    let year_step = WorkflowStep::critical("birth year", move |ctx| {
        let year = year.clone();
        Box::pin(async move { engine::type_text(&ctx, &[year], "1994", "birth year").await })
    });
    let month_step = WorkflowStep::optional("birth month", move |ctx| {
        let month = month.clone();
        Box::pin(async move { engine::select_value(&ctx, &[month], "June", "month picker").await })
    });

    let result = run_workflow(vec![email_step, year_step, month_step], ctx).await;

    assert!(result.success);
    let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["email", "birth year", "birth month"]);
    assert!(result.steps.iter().all(|s| s.passed()));

    let s = state.lock().unwrap();
    // Year input was backspace-cleared, email natively cleared.
    assert_eq!(s.clear_calls, vec!["el-email"]);
    assert!(s.pressed_keys.iter().all(|&k| k == KEYCODE_DEL));
}
