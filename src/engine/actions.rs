use log::{debug, info, warn};

use super::locator;
use super::text::{self, TextError};
use crate::driver::LocatorStrategy;
use crate::error::EngineError;
use crate::runner::context::SessionContext;

/// Tap the element described by the strategy list.
///
/// Every attempt resolves a fresh handle; a handle is never carried from one
/// attempt to the next, which removes the stale-reference failure mode by
/// construction. Non-stale interaction failures are retried up to the
/// configured attempt cap with a backoff between attempts. After a
/// successful tap the configured settle delay elapses before returning.
pub async fn tap(
    ctx: &SessionContext,
    strategies: &[LocatorStrategy],
    description: &str,
) -> Result<(), EngineError> {
    let cap = ctx.timing().attempt_cap.max(1);
    let mut last_detail = String::from("no attempt made");

    for attempt in 1..=cap {
        let Some(element) = locator::resolve_default(ctx, strategies).await else {
            return Err(EngineError::not_found(description));
        };

        match ctx.backend().tap(&element).await {
            Ok(()) => {
                info!("tapped {}", description);
                ctx.settle_after_tap().await;
                return Ok(());
            }
            Err(e) if e.is_stale() => {
                // Fresh handle on the next attempt; no backoff needed.
                debug!("stale handle tapping {}, re-resolving", description);
                last_detail = e.to_string();
            }
            Err(e) => {
                warn!(
                    "tap {} failed (attempt {}/{}): {}",
                    description, attempt, cap, e
                );
                last_detail = e.to_string();
                if attempt < cap {
                    tokio::time::sleep(ctx.timing().retry_backoff()).await;
                }
            }
        }
    }

    Err(EngineError::action_failed("tap", description, last_detail))
}

/// Resolve the field described by the strategy list and normalize its
/// content to `text`. Same re-resolution and retry discipline as [`tap`].
pub async fn type_text(
    ctx: &SessionContext,
    strategies: &[LocatorStrategy],
    text: &str,
    description: &str,
) -> Result<(), EngineError> {
    let cap = ctx.timing().attempt_cap.max(1);
    let mut last_detail = String::from("no attempt made");

    for attempt in 1..=cap {
        let Some(element) = locator::resolve_default(ctx, strategies).await else {
            return Err(EngineError::not_found(description));
        };

        match text::set_text(ctx, &element, text, description).await {
            Ok(()) => {
                info!("entered text into {}", description);
                ctx.settle_after_type().await;
                return Ok(());
            }
            Err(TextError::Stale) => {
                debug!("stale handle typing into {}, re-resolving", description);
                last_detail = "stale element reference".to_string();
            }
            Err(TextError::Failed(detail)) => {
                warn!(
                    "text entry into {} failed (attempt {}/{}): {}",
                    description, attempt, cap, detail
                );
                last_detail = detail;
                if attempt < cap {
                    tokio::time::sleep(ctx.timing().retry_backoff()).await;
                }
            }
        }
    }

    Err(EngineError::action_failed("type", description, last_detail))
}
