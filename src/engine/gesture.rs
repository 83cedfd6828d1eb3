use log::{debug, info, warn};
use regex::Regex;
use std::time::Duration;

use super::locator;
use crate::driver::{Bounds, ElementHandle, LocatorStrategy};
use crate::error::EngineError;
use crate::runner::context::SessionContext;

/// Default press point when no element could be resolved: horizontal center,
/// 60% down the screen.
const FALLBACK_POINT: (f32, f32) = (0.5, 0.6);

/// What to hold down.
pub enum HoldTarget {
    /// An element resolved through the usual strategy ladder.
    Element(Vec<LocatorStrategy>),
    /// A fixed point given as fractions of the screen size.
    ScreenFraction { x: f32, y: f32 },
}

/// Press and hold for at least `min_duration`.
///
/// No single primitive is reliably supported across devices, so the hold is
/// synthesized through a tiered fallback, each tier attempted only when the
/// previous one raised an error. A tier that completes is trusted even when
/// its effect cannot be verified:
/// 1. native long-press gesture for the exact duration;
/// 2. pointer hold chained from one-second pause ticks;
/// 3. raw-channel swipe with identical start and end coordinates;
/// 4. micro-drag — small back-and-forth pointer moves while held down, for
///    press detectors that need motion to register continued contact.
///
/// Before any tier runs, the on-screen keyboard is dismissed and the view is
/// nudged so the target's vertical center sits near the viewport's center.
pub async fn press_and_hold(
    ctx: &SessionContext,
    target: &HoldTarget,
    min_duration: Duration,
    description: &str,
) -> Result<(), EngineError> {
    if let Err(e) = ctx.backend().hide_keyboard().await {
        debug!("hide keyboard before hold: {}", e);
    }

    let (width, height) = match ctx.backend().screen_size().await {
        Ok(size) => size,
        Err(e) => {
            warn!("screen size unavailable ({}), assuming 1080x1920", e);
            (1080, 1920)
        }
    };

    let mut element = match target {
        HoldTarget::Element(strategies) => locator::resolve_default(ctx, strategies).await,
        HoldTarget::ScreenFraction { .. } => None,
    };

    let fraction = match target {
        HoldTarget::ScreenFraction { x, y } => (*x, *y),
        HoldTarget::Element(_) => FALLBACK_POINT,
    };
    let fallback_point = (
        (width as f32 * fraction.0) as i32,
        (height as f32 * fraction.1) as i32,
    );

    let mut point = match &element {
        Some(el) => element_center(ctx, el).await.unwrap_or(fallback_point),
        None => fallback_point,
    };

    // Nudge the view so the target is not obscured near a screen edge.
    if element.is_some() {
        let tolerance = (height as f32 * ctx.timing().center_tolerance) as i32;
        let mid = height as i32 / 2;
        if (point.1 - mid).abs() > tolerance {
            debug!(
                "centering {} before hold (center y {} vs viewport {})",
                description, point.1, mid
            );
            let _ = ctx
                .backend()
                .swipe(point.0, point.1, point.0, mid, Duration::from_millis(500))
                .await;
            ctx.settle_after_tap().await;
            // The nudge invalidates the old handle and its coordinates.
            if let HoldTarget::Element(strategies) = target {
                element = locator::resolve_default(ctx, strategies).await;
            }
            if let Some(el) = &element {
                point = element_center(ctx, el).await.unwrap_or(fallback_point);
            }
        }
    }

    let (x, y) = point;
    info!(
        "holding {} at ({}, {}) for {} ms",
        description,
        x,
        y,
        min_duration.as_millis()
    );

    let mut tier_errors: Vec<String> = Vec::new();

    // Tier 1: native long press, when the backend exposes one and an element
    // was resolved.
    if ctx.backend().supports_long_press() {
        if let Some(el) = &element {
            match ctx.backend().long_press(el, min_duration).await {
                Ok(()) => return finish_hold(ctx, "native long-press").await,
                Err(e) => {
                    warn!("native long-press failed: {}", e);
                    tier_errors.push(format!("native: {}", e));
                }
            }
        }
    }

    // Tier 2: pointer hold from one-second ticks.
    match ctx.backend().touch_hold(x, y, min_duration).await {
        Ok(()) => return finish_hold(ctx, "tick hold").await,
        Err(e) => {
            warn!("tick hold failed: {}", e);
            tier_errors.push(format!("ticks: {}", e));
        }
    }

    // Tier 3: raw-channel swipe in place for the full duration.
    match ctx.raw().inject_swipe(x, y, x, y, min_duration).await {
        Ok(()) => return finish_hold(ctx, "raw swipe-in-place").await,
        Err(e) => {
            warn!("raw swipe-in-place failed: {}", e);
            tier_errors.push(format!("raw: {}", e));
        }
    }

    // Tier 4: micro-drag.
    match ctx.backend().hold_with_motion(x, y, min_duration).await {
        Ok(()) => return finish_hold(ctx, "micro-drag").await,
        Err(e) => {
            warn!("micro-drag failed: {}", e);
            tier_errors.push(format!("micro-drag: {}", e));
        }
    }

    Err(EngineError::action_failed(
        "hold",
        description,
        tier_errors.join("; "),
    ))
}

async fn finish_hold(ctx: &SessionContext, tier: &str) -> Result<(), EngineError> {
    info!("hold completed via {}", tier);
    ctx.settle((
        ctx.timing().post_hold_settle_ms,
        ctx.timing().post_hold_settle_ms,
    ))
    .await;
    Ok(())
}

/// Bounding-box center, via the rect endpoint with the bounds attribute as a
/// fallback.
async fn element_center(ctx: &SessionContext, element: &ElementHandle) -> Option<(i32, i32)> {
    match ctx.backend().bounds(element).await {
        Ok(bounds) => Some(bounds.center()),
        Err(e) => {
            debug!("bounds lookup failed ({}), trying attribute", e);
            let attr = ctx
                .backend()
                .read_attribute(element, "bounds")
                .await
                .ok()??;
            parse_bounds_attr(&attr).map(|b| b.center())
        }
    }
}

/// Parse the Android bounds attribute form "[l,t][r,b]".
fn parse_bounds_attr(s: &str) -> Option<Bounds> {
    let re = Regex::new(r"\[(\d+),(\d+)\]\[(\d+),(\d+)\]").unwrap();
    let caps = re.captures(s)?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
    Some(Bounds {
        left: num(1)?,
        top: num(2)?,
        right: num(3)?,
        bottom: num(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds_attr() {
        let b = parse_bounds_attr("[42,100][442,300]").unwrap();
        assert_eq!(b.left, 42);
        assert_eq!(b.bottom, 300);
        assert_eq!(b.center(), (242, 200));
    }

    #[test]
    fn test_parse_bounds_attr_rejects_garbage() {
        assert!(parse_bounds_attr("not bounds").is_none());
        assert!(parse_bounds_attr("[1,2][3]").is_none());
    }
}
