use std::time::Duration;

/// Speed profile for flow execution. Maps to a full set of timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedProfile {
    /// Minimal delays, for fast devices.
    Fast,
    /// Balanced delays (default).
    #[default]
    Normal,
    /// Extra delays for slow devices/emulators.
    Safe,
}

impl SpeedProfile {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fast" | "turbo" => SpeedProfile::Fast,
            "safe" | "slow" => SpeedProfile::Safe,
            _ => SpeedProfile::Normal,
        }
    }

    /// Profile from the DROIDFORM_SPEED environment variable, if set.
    pub fn from_env() -> Self {
        std::env::var("DROIDFORM_SPEED")
            .map(|s| SpeedProfile::parse(&s))
            .unwrap_or_default()
    }

    pub fn timing(self) -> Timing {
        match self {
            SpeedProfile::Fast => Timing {
                settle_after_tap_ms: (300, 600),
                settle_after_type_ms: (150, 300),
                focus_delay_ms: 200,
                poll_interval_ms: 100,
                resolve_timeout_ms: 5_000,
                retry_backoff_ms: 300,
                dropdown_render_ms: 700,
                backspace_interval_ms: 10,
                digit_key_interval_ms: 50,
                post_hold_settle_ms: 1_500,
                ..Timing::default()
            },
            SpeedProfile::Normal => Timing::default(),
            SpeedProfile::Safe => Timing {
                settle_after_tap_ms: (1_500, 3_000),
                settle_after_type_ms: (700, 1_200),
                focus_delay_ms: 800,
                poll_interval_ms: 500,
                resolve_timeout_ms: 15_000,
                retry_backoff_ms: 1_500,
                dropdown_render_ms: 2_500,
                backspace_interval_ms: 40,
                digit_key_interval_ms: 150,
                post_hold_settle_ms: 5_000,
                ..Timing::default()
            },
        }
    }
}

/// Every delay and retry knob in one place, named and tunable.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Jitter range slept after a successful tap.
    pub settle_after_tap_ms: (u64, u64),
    /// Jitter range slept after a successful text entry.
    pub settle_after_type_ms: (u64, u64),
    /// Pause after focusing a field before clearing it.
    pub focus_delay_ms: u64,
    /// Interval between resolver polls.
    pub poll_interval_ms: u64,
    /// Per-strategy poll-until-present budget inside one resolver pass.
    pub resolve_timeout_ms: u64,
    /// Backoff between action attempts.
    pub retry_backoff_ms: u64,
    /// Attempt cap for tap/type before reporting failure.
    pub attempt_cap: u32,
    /// Full resolver passes over the strategy list before giving up.
    pub min_resolve_passes: u32,
    /// Wait for picker options to render after opening a dropdown.
    pub dropdown_render_ms: u64,
    /// Interval between backspace keystrokes while clearing.
    pub backspace_interval_ms: u64,
    /// Interval between per-digit keycode presses in the numeric fallback.
    pub digit_key_interval_ms: u64,
    /// Backspace count when the field's current length cannot be read.
    pub blind_backspace_count: u32,
    /// Extra backspaces beyond the read content length.
    pub backspace_margin: u32,
    /// Settle after a completed hold gesture.
    pub post_hold_settle_ms: u64,
    /// How far (fraction of screen height) the hold target's center may sit
    /// from the viewport's vertical center before a nudge scroll.
    pub center_tolerance: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_after_tap_ms: (1_000, 2_000),
            settle_after_type_ms: (300, 600),
            focus_delay_ms: 500,
            poll_interval_ms: 300,
            resolve_timeout_ms: 10_000,
            retry_backoff_ms: 800,
            attempt_cap: 3,
            min_resolve_passes: 2,
            dropdown_render_ms: 1_500,
            backspace_interval_ms: 20,
            digit_key_interval_ms: 100,
            blind_backspace_count: 15,
            backspace_margin: 5,
            post_hold_settle_ms: 3_000,
            center_tolerance: 0.2,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parse() {
        assert_eq!(SpeedProfile::parse("fast"), SpeedProfile::Fast);
        assert_eq!(SpeedProfile::parse("SLOW"), SpeedProfile::Safe);
        assert_eq!(SpeedProfile::parse("anything"), SpeedProfile::Normal);
    }

    #[test]
    fn test_safe_profile_slower_than_fast() {
        let fast = SpeedProfile::Fast.timing();
        let safe = SpeedProfile::Safe.timing();
        assert!(safe.settle_after_tap_ms.0 > fast.settle_after_tap_ms.1);
        assert!(safe.resolve_timeout_ms > fast.resolve_timeout_ms);
    }

    #[test]
    fn test_default_attempt_cap() {
        assert_eq!(Timing::default().attempt_cap, 3);
    }

    #[test]
    fn test_key_intervals_scale_with_profile() {
        assert_eq!(Timing::default().digit_key_interval_ms, 100);
        assert!(SpeedProfile::Fast.timing().digit_key_interval_ms < 100);
        assert!(SpeedProfile::Safe.timing().digit_key_interval_ms > 100);
    }
}
