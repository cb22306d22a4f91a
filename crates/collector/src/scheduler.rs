//! Tick, flush and day-rollover state machine.
//!
//! The scheduler is pure: callers hand it the current time and act on the
//! returned [`SchedulerAction`]. One wakeup may yield several actions (for
//! example a day reset, then a sample, then a flush), so callers drain
//! [`Scheduler::poll`] until it returns `None`.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::time::Duration;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Scheduler states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    /// Waiting for the next aligned second or flush window
    AwaitingNextTick,
    /// A new UTC day started; buffer must be cleared
    Resetting,
    /// A sample must be taken
    Sampling,
    /// An export must be attempted
    AwaitingFlush,
    /// Cancelled; no further actions
    Stopped,
}

/// Work the collector must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Clear the buffer for the new day
    Reset,
    /// Fetch, normalize, compute and append
    Sample,
    /// Export the buffer
    Flush,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval_seconds: u64,
    flush_minute: u32,
    poll_interval: Duration,
    state: SchedulerState,
    current_day: Option<NaiveDate>,
    last_tick_second: Option<i64>,
    last_flush_bucket: Option<i64>,
}

impl Scheduler {
    /// `interval_seconds` must be positive; collectors validate this before
    /// building a scheduler.
    #[must_use]
    pub fn new(interval_seconds: u64, flush_minute: u32, poll_interval: Duration) -> Self {
        Self {
            interval_seconds: interval_seconds.max(1),
            flush_minute,
            poll_interval,
            state: SchedulerState::Idle,
            current_day: None,
            last_tick_second: None,
            last_flush_bucket: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// UTC day the buffer currently belongs to.
    #[must_use]
    pub const fn current_day(&self) -> Option<NaiveDate> {
        self.current_day
    }

    /// Minute bucket (`unix_seconds / 60`) of the last flush attempt.
    #[must_use]
    pub const fn last_flush_bucket(&self) -> Option<i64> {
        self.last_flush_bucket
    }

    /// Leaves `Idle`, anchoring the buffer to today's date.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.state == SchedulerState::Idle {
            self.current_day = Some(now.date_naive());
            self.state = SchedulerState::AwaitingNextTick;
        }
    }

    /// Enters the terminal state.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    /// Advances the state machine and returns the next action, if any.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<SchedulerAction> {
        match self.state {
            SchedulerState::Stopped => None,
            SchedulerState::Idle => {
                self.start(now);
                self.poll(now)
            }
            SchedulerState::Resetting => {
                self.state = SchedulerState::Sampling;
                Some(SchedulerAction::Sample)
            }
            SchedulerState::Sampling | SchedulerState::AwaitingFlush => {
                self.state = SchedulerState::AwaitingNextTick;
                self.poll(now)
            }
            SchedulerState::AwaitingNextTick => {
                if self.tick_due(now) {
                    self.last_tick_second = Some(now.timestamp());
                    let today = now.date_naive();
                    if self.current_day != Some(today) {
                        self.current_day = Some(today);
                        self.state = SchedulerState::Resetting;
                        return Some(SchedulerAction::Reset);
                    }
                    self.state = SchedulerState::Sampling;
                    return Some(SchedulerAction::Sample);
                }
                if self.flush_due(now) {
                    self.last_flush_bucket = Some(minute_bucket(now));
                    self.state = SchedulerState::AwaitingFlush;
                    return Some(SchedulerAction::Flush);
                }
                None
            }
        }
    }

    /// True when `now` is an aligned second that has not fired yet.
    #[must_use]
    pub fn tick_due(&self, now: DateTime<Utc>) -> bool {
        let second = now.timestamp();
        second.rem_euclid(self.interval_i64()) == 0 && self.last_tick_second != Some(second)
    }

    /// True inside the flush window when this minute has not been flushed.
    ///
    /// The window is the last `interval_seconds` of `flush_minute`.
    #[must_use]
    pub fn flush_due(&self, now: DateTime<Utc>) -> bool {
        let window_start = 60u64.saturating_sub(self.interval_seconds);
        now.minute() == self.flush_minute
            && u64::from(now.second()) >= window_start
            && self
                .last_flush_bucket
                .map_or(true, |bucket| minute_bucket(now) > bucket)
    }

    /// How long to sleep before polling again.
    ///
    /// Aims at the next aligned second or the start of the flush window,
    /// whichever is sooner, capped at the poll interval.
    #[must_use]
    pub fn next_wakeup(&self, now: DateTime<Utc>) -> Duration {
        let now_ms = now.timestamp_millis();
        let interval_ms = self.interval_i64() * 1000;

        let into_interval = now_ms.rem_euclid(interval_ms);
        let mut wait_ms = if into_interval == 0 && self.tick_due(now) {
            0
        } else {
            interval_ms - into_interval
        };

        let window_start_ms =
            (i64::from(self.flush_minute) * 60 + 60 - self.interval_i64().min(60)) * 1000;
        let into_hour = now_ms.rem_euclid(MILLIS_PER_HOUR);
        if into_hour < window_start_ms {
            wait_ms = wait_ms.min(window_start_ms - into_hour);
        }

        Duration::from_millis(u64::try_from(wait_ms).unwrap_or_default()).min(self.poll_interval)
    }

    fn interval_i64(&self) -> i64 {
        i64::try_from(self.interval_seconds).unwrap_or(i64::MAX)
    }
}

fn minute_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, second).unwrap()
    }

    fn started(interval: u64, now: DateTime<Utc>) -> Scheduler {
        let mut scheduler = Scheduler::new(interval, 59, Duration::from_secs(1));
        scheduler.start(now);
        scheduler
    }

    fn drain(scheduler: &mut Scheduler, now: DateTime<Utc>) -> Vec<SchedulerAction> {
        std::iter::from_fn(|| scheduler.poll(now)).collect()
    }

    // ========== Tick alignment ==========

    #[test]
    fn test_fires_on_aligned_seconds_only() {
        let mut scheduler = started(15, at(14, 10, 0, 0));

        assert_eq!(drain(&mut scheduler, at(14, 10, 0, 14)), vec![]);
        assert_eq!(drain(&mut scheduler, at(14, 10, 0, 15)), vec![SchedulerAction::Sample]);
        assert_eq!(drain(&mut scheduler, at(14, 10, 0, 16)), vec![]);
        assert_eq!(drain(&mut scheduler, at(14, 10, 0, 30)), vec![SchedulerAction::Sample]);
    }

    #[test]
    fn test_at_most_one_tick_per_aligned_second() {
        let mut scheduler = started(15, at(14, 10, 0, 0));
        let second = at(14, 10, 1, 0);

        assert_eq!(drain(&mut scheduler, second), vec![SchedulerAction::Sample]);
        assert_eq!(drain(&mut scheduler, second + chrono::Duration::milliseconds(400)), vec![]);
        assert_eq!(drain(&mut scheduler, second + chrono::Duration::milliseconds(900)), vec![]);
    }

    #[test]
    fn test_idle_scheduler_starts_on_first_poll() {
        let mut scheduler = Scheduler::new(5, 59, Duration::from_secs(1));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        assert_eq!(drain(&mut scheduler, at(14, 10, 0, 5)), vec![SchedulerAction::Sample]);
        assert_eq!(scheduler.current_day(), NaiveDate::from_ymd_opt(2025, 3, 14));
    }

    // ========== Day rollover ==========

    #[test]
    fn test_day_change_resets_before_sampling() {
        let mut scheduler = started(15, at(14, 23, 59, 0));

        let actions = drain(&mut scheduler, at(15, 0, 0, 0));

        assert_eq!(actions, vec![SchedulerAction::Reset, SchedulerAction::Sample]);
        assert_eq!(scheduler.current_day(), NaiveDate::from_ymd_opt(2025, 3, 15));
    }

    #[test]
    fn test_no_reset_between_ticks_of_same_day() {
        let mut scheduler = started(15, at(14, 0, 0, 0));

        for minute in 0..5 {
            let actions = drain(&mut scheduler, at(14, 0, minute, 30));
            assert_eq!(actions, vec![SchedulerAction::Sample]);
        }
    }

    // ========== Hourly flush ==========

    #[test]
    fn test_flush_once_per_window() {
        let mut scheduler = started(15, at(14, 10, 0, 0));

        assert_eq!(drain(&mut scheduler, at(14, 10, 59, 44)), vec![]);
        assert_eq!(
            drain(&mut scheduler, at(14, 10, 59, 45)),
            vec![SchedulerAction::Sample, SchedulerAction::Flush]
        );
        for second in 46..60 {
            assert_eq!(drain(&mut scheduler, at(14, 10, 59, second)), vec![]);
        }
        assert_eq!(scheduler.last_flush_bucket(), Some(at(14, 10, 59, 0).timestamp() / 60));
    }

    #[test]
    fn test_flush_fires_on_unaligned_poll_inside_window() {
        let mut scheduler = started(15, at(14, 10, 0, 0));

        // Poll that skipped second 45 still flushes.
        assert_eq!(drain(&mut scheduler, at(14, 10, 59, 47)), vec![SchedulerAction::Flush]);
    }

    #[test]
    fn test_flush_every_hour() {
        let mut scheduler = started(15, at(14, 10, 0, 0));

        assert!(drain(&mut scheduler, at(14, 10, 59, 50)).contains(&SchedulerAction::Flush));
        assert!(drain(&mut scheduler, at(14, 11, 59, 50)).contains(&SchedulerAction::Flush));
        assert!(!drain(&mut scheduler, at(14, 11, 59, 55)).contains(&SchedulerAction::Flush));
    }

    #[test]
    fn test_custom_flush_minute_and_wide_interval() {
        let mut scheduler = Scheduler::new(120, 30, Duration::from_secs(1));
        scheduler.start(at(14, 10, 0, 0));

        // Interval above 60s makes the whole minute a flush window.
        assert_eq!(drain(&mut scheduler, at(14, 10, 30, 1)), vec![SchedulerAction::Flush]);
        assert_eq!(drain(&mut scheduler, at(14, 10, 29, 59)), vec![]);
    }

    #[test]
    fn test_flush_guard_is_monotonic() {
        let mut scheduler = started(15, at(14, 10, 0, 0));
        drain(&mut scheduler, at(14, 10, 59, 50));

        // Clock stepping backwards into an already flushed minute does not re-flush.
        assert!(!scheduler.flush_due(at(14, 10, 59, 52)));
        assert!(!scheduler.flush_due(at(14, 9, 59, 52)));
    }

    // ========== Stop ==========

    #[test]
    fn test_stopped_scheduler_is_inert() {
        let mut scheduler = started(15, at(14, 10, 0, 0));
        scheduler.stop();

        assert_eq!(drain(&mut scheduler, at(14, 10, 59, 45)), vec![]);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    // ========== Wakeups ==========

    #[test]
    fn test_next_wakeup_targets_aligned_second() {
        let scheduler = Scheduler::new(15, 59, Duration::from_secs(5));
        let now = at(14, 10, 0, 13) + chrono::Duration::milliseconds(250);

        assert_eq!(scheduler.next_wakeup(now), Duration::from_millis(1750));
    }

    #[test]
    fn test_next_wakeup_capped_by_poll_interval() {
        let scheduler = Scheduler::new(15, 59, Duration::from_secs(1));

        assert_eq!(scheduler.next_wakeup(at(14, 10, 0, 1)), Duration::from_secs(1));
    }

    #[test]
    fn test_next_wakeup_after_firing_waits_full_interval() {
        let mut scheduler = Scheduler::new(15, 59, Duration::from_secs(60));
        scheduler.start(at(14, 10, 0, 0));
        let now = at(14, 10, 0, 15);
        drain(&mut scheduler, now);

        assert_eq!(scheduler.next_wakeup(now), Duration::from_secs(15));
    }

    #[test]
    fn test_next_wakeup_targets_flush_window() {
        // 7s interval does not divide 60; window opens at 59:53.
        let scheduler = Scheduler::new(7, 59, Duration::from_secs(60));
        let now = at(14, 10, 59, 50);
        let rem = now.timestamp().rem_euclid(7);
        let until_tick = if rem == 0 { 0 } else { 7 - rem };

        let expected = until_tick.min(3);
        assert_eq!(
            scheduler.next_wakeup(now),
            Duration::from_secs(u64::try_from(expected).unwrap())
        );
    }
}
