use log::{debug, info, warn};
use std::time::Duration;

use super::{actions, locator};
use crate::driver::LocatorStrategy;
use crate::error::EngineError;
use crate::runner::context::SessionContext;

/// Per-strategy budget while scanning the option list. Options render
/// together with the list, so the long field-resolution timeout would only
/// slow down the miss-then-scroll path.
const OPTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Open the dropdown described by `dropdown_strategies` and choose the
/// option whose label matches `value`.
///
/// Matching goes exact text, then text fragment, then content-description
/// fragment. When no option matches, the list is scrolled once and the scan
/// repeated; a second miss is a failure.
pub async fn select_value(
    ctx: &SessionContext,
    dropdown_strategies: &[LocatorStrategy],
    value: &str,
    description: &str,
) -> Result<(), EngineError> {
    actions::tap(ctx, dropdown_strategies, description).await?;
    tokio::time::sleep(Duration::from_millis(ctx.timing().dropdown_render_ms)).await;

    let option_strategies = [
        LocatorStrategy::Text(value.to_string()),
        LocatorStrategy::TextContains(value.to_string()),
        LocatorStrategy::DescriptionContains(value.to_string()),
    ];

    for round in 0..2 {
        if round > 0 {
            debug!("option {:?} not visible, scrolling the list", value);
            scroll_options(ctx).await;
        }

        let Some(option) = locator::resolve(ctx, &option_strategies, OPTION_TIMEOUT, 1).await
        else {
            continue;
        };

        match ctx.backend().tap(&option).await {
            Ok(()) => {
                info!("selected {:?} in {}", value, description);
                ctx.settle_after_tap().await;
                return Ok(());
            }
            Err(e) => {
                warn!("tapping option {:?} failed: {}", value, e);
            }
        }
    }

    Err(EngineError::action_failed(
        "select",
        description,
        format!("no option matching {:?}", value),
    ))
}

/// One upward drag over the lower half of the screen, where option lists
/// render.
async fn scroll_options(ctx: &SessionContext) {
    let (width, height) = match ctx.backend().screen_size().await {
        Ok(size) => size,
        Err(e) => {
            debug!("screen size unavailable for option scroll: {}", e);
            (1080, 1920)
        }
    };
    let x = width as i32 / 2;
    let from_y = (height as f32 * 0.74) as i32;
    let to_y = (height as f32 * 0.55) as i32;
    if let Err(e) = ctx
        .backend()
        .swipe(x, from_y, x, to_y, Duration::from_millis(1000))
        .await
    {
        debug!("option scroll failed: {}", e);
    }
    ctx.settle_after_type().await;
}
