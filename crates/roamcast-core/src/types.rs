//! Domain records shared across Roamcast crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram caps photo captions at 1024 characters.
pub const CAPTION_MAX_CHARS: usize = 1024;

/// Per-group publishing schedule.
///
/// `next_run_at` is the canonical due instant, always UTC. `post_time` is the
/// admin-facing "HH:MM" wall-clock label set by `/settime`, kept only for
/// display. Arithmetic never touches the display offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub group_id: String,
    /// Wall-clock "HH:MM" label in the admin's local offset.
    pub post_time: Option<String>,
    pub frequency_hours: u32,
    pub enabled: bool,
    pub next_run_at: DateTime<Utc>,
    /// Display offset from UTC in minutes, set by `/setlocal`.
    pub display_offset_minutes: Option<i32>,
    /// Raw zone label as the admin typed it.
    pub timezone_label: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Fresh schedule for a group, due at `next_run_at`.
    pub fn new(group_id: &str, next_run_at: DateTime<Utc>) -> Self {
        Self {
            group_id: group_id.to_string(),
            post_time: None,
            frequency_hours: 24,
            enabled: true,
            next_run_at,
            display_offset_minutes: None,
            timezone_label: None,
            updated_at: Utc::now(),
        }
    }
}

/// Latest inbound group message. One per chat — new arrivals overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub chat_id: String,
    pub message_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// A known Telegram group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    #[serde(default)]
    pub title: String,
}

/// A generated post, composed once per generation call. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub photo_url: Option<String>,
    pub photo_caption: String,
    pub body_text: String,
    pub full_text: String,
}

impl Post {
    /// Split generated text into a photo caption (the headline) and the body.
    ///
    /// The text oracle is prompted to put a headline on the first line
    /// followed by a blank line; everything after that blank line is the body.
    pub fn compose(full_text: &str, photo_url: Option<String>) -> Self {
        let full_text = full_text.trim();
        let mut lines = full_text.lines();
        let headline = lines.next().unwrap_or_default().trim();

        let mut body_lines: Vec<&str> = lines.collect();
        while body_lines.first().is_some_and(|l| l.trim().is_empty()) {
            body_lines.remove(0);
        }
        let body_text = body_lines.join("\n");

        Self {
            photo_url,
            photo_caption: truncate_chars(headline, CAPTION_MAX_CHARS),
            body_text,
            full_text: full_text.to_string(),
        }
    }
}

/// A published post, logged for the stats summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub post_id: String,
    pub photo_message_id: Option<String>,
    pub text_message_id: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_splits_headline_and_body() {
        let text = "Дорога зовёт\n\nСобирайте рюкзак.\nВыходите из дома.";
        let post = Post::compose(text, Some("https://img".into()));
        assert_eq!(post.photo_caption, "Дорога зовёт");
        assert_eq!(post.body_text, "Собирайте рюкзак.\nВыходите из дома.");
        assert_eq!(post.full_text, text);
    }

    #[test]
    fn test_compose_without_blank_line() {
        let post = Post::compose("Заголовок\nтело сразу", None);
        assert_eq!(post.photo_caption, "Заголовок");
        assert_eq!(post.body_text, "тело сразу");
        assert!(post.photo_url.is_none());
    }

    #[test]
    fn test_compose_single_line() {
        let post = Post::compose("Только заголовок", None);
        assert_eq!(post.photo_caption, "Только заголовок");
        assert!(post.body_text.is_empty());
    }

    #[test]
    fn test_caption_truncated_to_telegram_cap() {
        let headline: String = "я".repeat(2000);
        let text = format!("{headline}\n\nтело");
        let post = Post::compose(&text, None);
        assert_eq!(post.photo_caption.chars().count(), CAPTION_MAX_CHARS);
    }

    #[test]
    fn test_truncate_chars_multibyte_boundary() {
        let s = "ёжик в тумане";
        assert_eq!(truncate_chars(s, 4), "ёжик");
        assert_eq!(truncate_chars(s, 100), s);
    }
}
