use std::{
    ops::RangeInclusive,
    time::{SystemTime, UNIX_EPOCH},
};

// All timestamps are in milliseconds, to correspond with JS's Date.now().
pub const DAY_IN_MILLIS: u64 = 1000 * 60 * 60 * 24;

/// Default epoch length, one week.
pub const WEEK_IN_MILLIS: u64 = 7 * DAY_IN_MILLIS;

/// Default maximum lookback window, four full epochs.
pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 28;

/// Maps timestamps to epoch ids and lookback windows to epoch ranges.
///
/// Epoch ids are absolute: epoch `e` covers timestamps
/// `[e * epoch_length_ms, (e + 1) * epoch_length_ms)`. The clock holds no
/// mutable state; it is configuration plus arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochClock {
    epoch_length_ms: u64,
    max_lookback_days: u32,
}

impl EpochClock {
    /// A clock with the given epoch length and maximum lookback window.
    /// The maximum lookback bounds conversion queries that do not name one,
    /// so no query window is ever unbounded.
    ///
    /// # Panics
    ///
    /// Panics if `epoch_length_ms` is zero.
    pub fn new(epoch_length_ms: u64, max_lookback_days: u32) -> Self {
        assert!(epoch_length_ms > 0, "epoch length must be positive");
        Self {
            epoch_length_ms,
            max_lookback_days,
        }
    }

    pub fn epoch_of(&self, timestamp_ms: u64) -> u64 {
        timestamp_ms / self.epoch_length_ms
    }

    /// First timestamp belonging to `epoch`.
    pub fn epoch_start(&self, epoch: u64) -> u64 {
        epoch.saturating_mul(self.epoch_length_ms)
    }

    /// Inclusive epoch window ending at `now_ms` and reaching back
    /// `lookback_days` (or the configured maximum when absent). Saturates at
    /// timestamp zero, so the window never underflows below epoch 0.
    pub fn epoch_range(
        &self,
        lookback_days: Option<u32>,
        now_ms: u64,
    ) -> RangeInclusive<u64> {
        let days = lookback_days.unwrap_or(self.max_lookback_days);
        let span_ms = u64::from(days) * DAY_IN_MILLIS;
        let start = self.epoch_of(now_ms.saturating_sub(span_ms));
        start..=self.epoch_of(now_ms)
    }

    /// Current wall clock in milliseconds since the Unix epoch.
    pub fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

impl Default for EpochClock {
    fn default() -> Self {
        Self::new(WEEK_IN_MILLIS, DEFAULT_MAX_LOOKBACK_DAYS)
    }
}
