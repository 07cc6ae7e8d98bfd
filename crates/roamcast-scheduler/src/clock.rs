//! Wall-clock helpers — admin-facing time parsing and display.
//!
//! Scheduling arithmetic is UTC everywhere; the offset parsed here is used
//! only to interpret `/settime` input and to render the next run back to the
//! administrator.

use chrono::{DateTime, Duration, FixedOffset, Offset, TimeZone, Utc};

/// Largest UTC offset Telegram users realistically have (UTC±14).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Parse an admin-supplied UTC offset: `+03:00`, `-5`, `03:30`, `+0530`.
/// Returns minutes east of UTC.
pub fn parse_offset(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (sign, rest) = match raw.as_bytes()[0] {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => (1, raw),
    };

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() == 4 && rest.chars().all(|c| c.is_ascii_digit()) {
        // compact +HHMM form
        (rest[..2].parse().ok()?, rest[2..].parse().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    let total = sign * (hours * 60 + minutes);
    if total.abs() > MAX_OFFSET_MINUTES {
        return None;
    }
    Some(total)
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_post_time(raw: &str) -> Option<(u32, u32)> {
    let (h, m) = raw.trim().split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours < 24 && minutes < 60 {
        Some((hours, minutes))
    } else {
        None
    }
}

/// Next instant (UTC) at which the wall clock in the given offset reads HH:MM.
/// Strictly in the future relative to `now`.
pub fn next_occurrence(
    hours: u32,
    minutes: u32,
    offset_minutes: i32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let local_now = now.with_timezone(&offset);

    let mut date = local_now.date_naive();
    loop {
        if let Some(naive) = date.and_hms_opt(hours, minutes, 0)
            && let Some(candidate) = offset.from_local_datetime(&naive).single()
        {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
        date = date + Duration::days(1);
    }
}

/// Render a UTC instant in the admin's display offset, RFC 3339 to the minute.
pub fn format_in_offset(dt: DateTime<Utc>, offset_minutes: Option<i32>) -> String {
    let offset =
        FixedOffset::east_opt(offset_minutes.unwrap_or(0) * 60).unwrap_or_else(|| Utc.fix());
    dt.with_timezone(&offset).format("%Y-%m-%d %H:%M %:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offset_forms() {
        assert_eq!(parse_offset("+03:00"), Some(180));
        assert_eq!(parse_offset("-05:30"), Some(-330));
        assert_eq!(parse_offset("3"), Some(180));
        assert_eq!(parse_offset("-4"), Some(-240));
        assert_eq!(parse_offset("+0530"), Some(330));
        assert_eq!(parse_offset("0"), Some(0));
    }

    #[test]
    fn test_parse_offset_rejects_garbage() {
        assert_eq!(parse_offset(""), None);
        assert_eq!(parse_offset("Moscow"), None);
        assert_eq!(parse_offset("+25:00"), None);
        assert_eq!(parse_offset("+03:99"), None);
        assert_eq!(parse_offset("+15"), None);
    }

    #[test]
    fn test_parse_post_time() {
        assert_eq!(parse_post_time("09:30"), Some((9, 30)));
        assert_eq!(parse_post_time(" 23:59 "), Some((23, 59)));
        assert_eq!(parse_post_time("24:00"), None);
        assert_eq!(parse_post_time("9"), None);
    }

    #[test]
    fn test_next_occurrence_later_today() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let next = next_occurrence(12, 0, 0, now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
        let next = next_occurrence(12, 0, 0, now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_respects_offset() {
        // 09:00 at UTC+3 is 06:00 UTC.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let next = next_occurrence(9, 0, 180, now);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_format_in_offset() {
        let dt = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        assert_eq!(format_in_offset(dt, Some(180)), "2025-06-01 09:00 +03:00");
        assert_eq!(format_in_offset(dt, None), "2025-06-01 06:00 +00:00");
    }
}
