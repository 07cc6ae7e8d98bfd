//! Due-decision state machine.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use roamcast_core::error::{Result, RoamcastError};
use roamcast_core::types::Schedule;
use roamcast_core::Store;

use crate::clock;

/// Is the schedule due at `now`? Pure read — asking never advances anything.
pub fn due(schedule: &Schedule, now: DateTime<Utc>) -> bool {
    schedule.enabled && now >= schedule.next_run_at
}

/// Advance after a confirmed publish.
///
/// Within a normal cadence (the poll fired less than one frequency window
/// after the due instant) the next run is anchored to the previous due
/// instant, so repeated cycles do not drift. After dormancy past one or more
/// whole windows the next run is anchored to `now`: one post, no catch-up
/// storm.
pub fn advance(schedule: &mut Schedule, now: DateTime<Utc>) {
    let step = Duration::hours(schedule.frequency_hours.max(1) as i64);
    let base = if now - schedule.next_run_at < step {
        schedule.next_run_at
    } else {
        now
    };
    schedule.next_run_at = base + step;
    schedule.updated_at = now;
}

/// Read-only introspection record for the admin and the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulePreview {
    pub next_post_time: Option<String>,
    pub frequency_hours: u32,
    pub enabled: bool,
    /// Next due instant rendered in the admin's display offset.
    pub next_run_at: String,
}

impl SchedulePreview {
    pub fn of(schedule: &Schedule) -> Self {
        Self {
            next_post_time: schedule.post_time.clone(),
            frequency_hours: schedule.frequency_hours,
            enabled: schedule.enabled,
            next_run_at: clock::format_in_offset(
                schedule.next_run_at,
                schedule.display_offset_minutes,
            ),
        }
    }
}

/// Storage-backed scheduler for one bot instance.
pub struct Scheduler {
    store: Arc<dyn Store>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// True iff the group has a schedule that is enabled and past due.
    /// Never mutates state.
    pub async fn is_due(&self, group_id: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .store
            .get_schedule(group_id)
            .await?
            .map(|s| due(&s, now))
            .unwrap_or(false))
    }

    /// Advance the schedule after a confirmed publish and persist it.
    /// Direct delivery calls this after the Telegram API accepted the post;
    /// relay delivery calls it at hand-off.
    pub async fn mark_posted(&self, group_id: &str, now: DateTime<Utc>) -> Result<Schedule> {
        let mut schedule = self.require(group_id).await?;
        advance(&mut schedule, now);
        self.store.set_schedule(&schedule).await?;
        tracing::info!(
            "📅 Schedule for {} advanced, next run {}",
            group_id,
            schedule.next_run_at
        );
        Ok(schedule)
    }

    /// `/settime HH:MM` — (re)anchor the schedule at the next occurrence of
    /// that wall-clock time in the admin's display offset. Creates the
    /// schedule on first use.
    pub async fn set_time(&self, group_id: &str, raw: &str, now: DateTime<Utc>) -> Result<Schedule> {
        let (hours, minutes) = clock::parse_post_time(raw)
            .ok_or_else(|| RoamcastError::Config(format!("Invalid time '{raw}', expected HH:MM")))?;

        let mut schedule = match self.store.get_schedule(group_id).await? {
            Some(s) => s,
            None => Schedule::new(group_id, now),
        };
        let offset = schedule.display_offset_minutes.unwrap_or(0);
        schedule.next_run_at = clock::next_occurrence(hours, minutes, offset, now);
        schedule.post_time = Some(format!("{hours:02}:{minutes:02}"));
        schedule.updated_at = now;
        self.store.set_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// `/setfreq N` — change the cadence; takes effect from the next advance.
    pub async fn set_frequency(&self, group_id: &str, hours: u32) -> Result<Schedule> {
        if hours == 0 {
            return Err(RoamcastError::Config("Frequency must be at least 1 hour".into()));
        }
        let mut schedule = self.require(group_id).await?;
        schedule.frequency_hours = hours;
        schedule.updated_at = Utc::now();
        self.store.set_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// `/on` and `/off`. Schedules are never deleted, only disabled.
    pub async fn set_enabled(&self, group_id: &str, enabled: bool) -> Result<Schedule> {
        let mut schedule = self.require(group_id).await?;
        schedule.enabled = enabled;
        schedule.updated_at = Utc::now();
        self.store.set_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// `/setlocal ±HH:MM` — display offset only; the due instant is untouched.
    pub async fn set_local(&self, group_id: &str, raw: &str) -> Result<Schedule> {
        let offset = clock::parse_offset(raw).ok_or_else(|| {
            RoamcastError::Config(format!("Invalid offset '{raw}', expected e.g. +03:00"))
        })?;
        let mut schedule = match self.store.get_schedule(group_id).await? {
            Some(s) => s,
            None => Schedule::new(group_id, Utc::now()),
        };
        schedule.display_offset_minutes = Some(offset);
        schedule.timezone_label = Some(raw.trim().to_string());
        schedule.updated_at = Utc::now();
        self.store.set_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// Introspection for `/status` and the schedule endpoint.
    pub async fn preview(&self, group_id: &str) -> Result<Option<SchedulePreview>> {
        Ok(self
            .store
            .get_schedule(group_id)
            .await?
            .map(|s| SchedulePreview::of(&s)))
    }

    async fn require(&self, group_id: &str) -> Result<Schedule> {
        self.store.get_schedule(group_id).await?.ok_or_else(|| {
            RoamcastError::Storage(format!("No schedule for group {group_id} — run /settime first"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule_at(next: DateTime<Utc>) -> Schedule {
        let mut s = Schedule::new("-100", next);
        s.frequency_hours = 24;
        s
    }

    #[test]
    fn test_due_is_idempotent_read() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let s = schedule_at(t);

        let poll = t + Duration::minutes(1);
        // Repeated polls within the same window agree — nothing advanced.
        assert!(due(&s, poll));
        assert!(due(&s, poll));
        assert!(due(&s, poll + Duration::minutes(15)));
    }

    #[test]
    fn test_not_due_before_window_or_when_disabled() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut s = schedule_at(t);
        assert!(!due(&s, t - Duration::hours(1)));

        s.enabled = false;
        assert!(!due(&s, t + Duration::hours(1)));
    }

    #[test]
    fn test_daily_cadence_scenario() {
        // frequency 24h, due at T: poll at T-1h is quiet, poll at T+1min
        // fires and the next run lands on T+24h exactly.
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut s = schedule_at(t);

        assert!(!due(&s, t - Duration::hours(1)));
        assert!(due(&s, t + Duration::minutes(1)));

        advance(&mut s, t + Duration::minutes(1));
        assert_eq!(s.next_run_at, t + Duration::hours(24));
        assert!(!due(&s, t + Duration::minutes(2)));
    }

    #[test]
    fn test_no_drift_over_100_cycles() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let mut s = schedule_at(t0);

        // Polls land up to 15 minutes late every cycle; the anchor keeps the
        // cadence exact.
        for i in 0..100u32 {
            let poll = s.next_run_at + Duration::minutes(i64::from(i % 15));
            assert!(due(&s, poll));
            advance(&mut s, poll);
        }
        let expected = t0 + Duration::hours(24 * 100);
        assert_eq!(s.next_run_at, expected);
    }

    #[test]
    fn test_dormancy_fires_once_without_catchup() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut s = schedule_at(t);

        // Service slept through 3 whole windows.
        let wake = t + Duration::hours(24 * 3 + 2);
        assert!(due(&s, wake));
        advance(&mut s, wake);

        // One advance from `now`, not three stacked increments.
        assert_eq!(s.next_run_at, wake + Duration::hours(24));
        assert!(!due(&s, wake + Duration::minutes(1)));
    }

    #[test]
    fn test_advance_zero_frequency_guarded() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut s = schedule_at(t);
        s.frequency_hours = 0;
        advance(&mut s, t);
        assert!(s.next_run_at > t);
    }

    #[test]
    fn test_preview_renders_display_offset() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        let mut s = schedule_at(t);
        s.display_offset_minutes = Some(180);
        s.post_time = Some("09:00".into());

        let preview = SchedulePreview::of(&s);
        assert_eq!(preview.next_run_at, "2025-06-01 09:00 +03:00");
        assert_eq!(preview.next_post_time.as_deref(), Some("09:00"));
        assert!(preview.enabled);
    }
}
