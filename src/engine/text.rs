use log::{debug, warn};
use std::time::Duration;

use crate::driver::ElementHandle;
use crate::runner::context::SessionContext;

pub const KEYCODE_DEL: u32 = 67;
pub const KEYCODE_ENTER: u32 = 66;
pub const KEYCODE_DIGIT_0: u32 = 7;

/// Outcome of one text-entry attempt.
#[derive(Debug)]
pub enum TextError {
    /// The handle went stale while focusing or clearing; the caller
    /// re-resolves and retries with a fresh handle.
    Stale,
    /// Every injection tactic failed.
    Failed(String),
}

/// Whether a field takes the backspace-only clearing path. Native clear is
/// known unreliable for year inputs and is excluded outright for them.
pub fn is_year_like(description: &str) -> bool {
    description.to_lowercase().contains("year")
}

/// Clear the field's existing content and inject `text`.
///
/// Linear sequence, no branching back:
/// 1. focus the field with a tap;
/// 2. clear it — natively where allowed, otherwise with backspace
///    keystrokes covering the current content length plus a margin (a
///    fixed blind count when the length cannot be read);
/// 3. inject — element input channel, then the raw channel, then one
///    keycode per digit when the text is purely numeric.
///
/// Clearing failures alone are tolerated; only an injection failure across
/// every tactic reports `Failed`. The final field content is not read back
/// for verification.
pub async fn set_text(
    ctx: &SessionContext,
    element: &ElementHandle,
    text: &str,
    description: &str,
) -> Result<(), TextError> {
    // 1. Focus.
    match ctx.backend().tap(element).await {
        Ok(()) => {}
        Err(e) if e.is_stale() => return Err(TextError::Stale),
        Err(e) => {
            // The field may already hold focus; carry on.
            debug!("focus tap on {} failed: {}", description, e);
        }
    }
    tokio::time::sleep(Duration::from_millis(ctx.timing().focus_delay_ms)).await;

    // 2. Clear.
    if is_year_like(description) {
        debug!("backspace-only clearing for {}", description);
        backspace_clear(ctx, element).await;
    } else {
        match ctx.backend().clear_text(element).await {
            Ok(()) => {}
            Err(e) if e.is_stale() => return Err(TextError::Stale),
            Err(e) => {
                debug!("native clear on {} failed ({}), using backspace", description, e);
                backspace_clear(ctx, element).await;
            }
        }
    }

    // 3. Inject.
    let direct = ctx.backend().set_text(element, text).await;
    let direct_err = match direct {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(
        "direct injection into {} failed ({}), trying raw channel",
        description, direct_err
    );

    let raw_err = match ctx.raw().inject_text(text).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(
        "raw injection into {} failed ({})",
        description, raw_err
    );

    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        match keycode_digits(ctx, text).await {
            Ok(()) => return Ok(()),
            Err(detail) => {
                return Err(TextError::Failed(format!(
                    "all injection tactics failed (direct: {}; raw: {}; keycodes: {})",
                    direct_err, raw_err, detail
                )))
            }
        }
    }

    Err(TextError::Failed(format!(
        "all injection tactics failed (direct: {}; raw: {})",
        direct_err, raw_err
    )))
}

/// Backspace the field empty. Strokes cover the readable content length
/// plus a margin; when the length cannot be read, a fixed blind count is
/// used instead. Keystroke failures are tolerated — an un-cleared field
/// that the injection step fully overwrites is acceptable.
async fn backspace_clear(ctx: &SessionContext, element: &ElementHandle) {
    let timing = ctx.timing();
    let count = match ctx.backend().read_attribute(element, "text").await {
        Ok(Some(current)) => current.chars().count() as u32 + timing.backspace_margin,
        Ok(None) => timing.blind_backspace_count,
        Err(e) => {
            debug!("could not read field content for clearing: {}", e);
            timing.blind_backspace_count
        }
    };

    for _ in 0..count {
        if let Err(e) = ctx.backend().press_key(KEYCODE_DEL).await {
            debug!("backspace keystroke failed: {}", e);
            break;
        }
        tokio::time::sleep(Duration::from_millis(timing.backspace_interval_ms)).await;
    }
}

/// Final numeric fallback: one keycode per digit.
async fn keycode_digits(ctx: &SessionContext, text: &str) -> Result<(), String> {
    let interval = Duration::from_millis(ctx.timing().digit_key_interval_ms);
    for digit in text.chars().filter_map(|c| c.to_digit(10)) {
        ctx.backend()
            .press_key(KEYCODE_DIGIT_0 + digit)
            .await
            .map_err(|e| e.to_string())?;
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_like_classification() {
        assert!(is_year_like("Year field"));
        assert!(is_year_like("birth year"));
        assert!(!is_year_like("Email"));
        assert!(!is_year_like("First Name"));
    }

    #[test]
    fn test_digit_keycode_offset() {
        // KEYCODE_0 is 7; digit d maps to 7 + d.
        assert_eq!(KEYCODE_DIGIT_0 + '9'.to_digit(10).unwrap(), 16);
    }
}
