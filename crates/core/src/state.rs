//! Engine lifecycle state threaded through each tick.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

/// Where the engine is in the order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Cooldown,
    Scanning,
    Sizing,
    EntrySubmitted,
    Bracketed,
    Monitoring,
    Faulted,
}

/// Per-runner state carried between ticks.
///
/// Deliberately a plain value handed to every tick rather than process
/// state: restart recovery re-derives position truth from the venue, so
/// nothing here is load-bearing across restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub lifecycle: Lifecycle,
    /// Set when an entry is accepted; drives the cooldown gate.
    pub last_trade_time: Option<DateTime<Utc>>,
    /// Consecutive losing round-trips, feeding the optional martingale.
    pub loss_streak: u32,
    /// Equity snapshot at the last accepted entry, for loss detection.
    pub equity_at_entry: Option<Decimal>,
}

impl EngineState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            last_trade_time: None,
            loss_streak: 0,
            equity_at_entry: None,
        }
    }

    /// True while the re-entry lockout after the last accepted entry is
    /// still running.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.last_trade_time {
            Some(entered) => now - entered < cooldown,
            None => false,
        }
    }

    /// Records an accepted entry.
    pub fn record_entry(&mut self, now: DateTime<Utc>, equity: Decimal) {
        self.last_trade_time = Some(now);
        self.equity_at_entry = Some(equity);
    }

    /// Records the position going flat, updating the loss streak from the
    /// equity delta since entry.
    pub fn record_flat(&mut self, equity: Decimal) {
        if let Some(at_entry) = self.equity_at_entry.take() {
            if equity < at_entry {
                self.loss_streak += 1;
            } else {
                self.loss_streak = 0;
            }
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fresh_state_not_in_cooldown() {
        let state = EngineState::new();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert!(!state.in_cooldown(now, Duration::seconds(300)));
    }

    #[test]
    fn test_cooldown_window() {
        let mut state = EngineState::new();
        let entered = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        state.record_entry(entered, dec!(100));

        let inside = entered + Duration::seconds(299);
        let boundary = entered + Duration::seconds(300);
        assert!(state.in_cooldown(inside, Duration::seconds(300)));
        assert!(!state.in_cooldown(boundary, Duration::seconds(300)));
    }

    #[test]
    fn test_loss_streak_tracking() {
        let mut state = EngineState::new();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        state.record_entry(now, dec!(100));
        state.record_flat(dec!(98));
        assert_eq!(state.loss_streak, 1);

        state.record_entry(now, dec!(98));
        state.record_flat(dec!(95));
        assert_eq!(state.loss_streak, 2);

        state.record_entry(now, dec!(95));
        state.record_flat(dec!(103));
        assert_eq!(state.loss_streak, 0);
    }

    #[test]
    fn test_flat_without_entry_leaves_streak() {
        let mut state = EngineState::new();
        state.loss_streak = 2;
        state.record_flat(dec!(50));
        assert_eq!(state.loss_streak, 2);
    }
}
