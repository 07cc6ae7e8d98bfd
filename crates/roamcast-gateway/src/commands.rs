//! Admin command surface.
//!
//! Commands arrive as webhook text from the admin chat and map onto an
//! explicit enum — one variant per command, no dynamic lookup.

use chrono::Utc;

use super::server::AppState;

/// Parsed admin command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetTime(String),
    SetFreq(u32),
    Enable,
    Disable,
    Status,
    SetLocal(String),
    AddGroup { group_id: String, title: String },
    SetGroup(String),
    Groups,
    Stats,
    Help,
}

impl Command {
    /// Parse a slash command. `/settime@MyBot 09:00` forms are accepted.
    pub fn parse(text: &str) -> Option<Command> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?;
        if !head.starts_with('/') {
            return None;
        }
        // Strip the bot mention Telegram appends in groups.
        let name = head[1..].split('@').next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        let command = match name {
            "settime" => Command::SetTime(rest.first()?.to_string()),
            "setfreq" => Command::SetFreq(rest.first()?.parse().ok()?),
            "on" | "enable" => Command::Enable,
            "off" | "disable" => Command::Disable,
            "status" => Command::Status,
            "setlocal" => Command::SetLocal(rest.first()?.to_string()),
            "addgroup" => Command::AddGroup {
                group_id: rest.first()?.to_string(),
                title: rest[1..].join(" "),
            },
            "setgroup" => Command::SetGroup(rest.first()?.to_string()),
            "groups" => Command::Groups,
            "stats" => Command::Stats,
            "help" | "start" => Command::Help,
            _ => return None,
        };
        Some(command)
    }
}

const HELP_TEXT: &str = "\
Команды:
/settime HH:MM — время следующей публикации
/setfreq N — частота публикаций в часах
/on, /off — включить или выключить расписание
/setlocal +03:00 — смещение для отображения времени
/addgroup <id> [название] — добавить группу
/setgroup <id> — выбрать активную группу
/groups — список групп
/status — текущее расписание
/stats — последние публикации";

/// Execute a command against the active group; returns the reply text.
pub async fn dispatch(state: &AppState, text: &str) -> String {
    let Some(command) = Command::parse(text) else {
        return format!("Неизвестная команда.\n\n{HELP_TEXT}");
    };
    let group_id = state.target_group().await;

    let result = match command {
        Command::SetTime(raw) => state
            .scheduler
            .set_time(&group_id, &raw, Utc::now())
            .await
            .map(|s| {
                format!(
                    "⏰ Время публикации установлено. Следующий пост: {}",
                    roamcast_scheduler::format_in_offset(s.next_run_at, s.display_offset_minutes)
                )
            }),
        Command::SetFreq(hours) => state
            .scheduler
            .set_frequency(&group_id, hours)
            .await
            .map(|s| format!("📅 Частота: раз в {} ч.", s.frequency_hours)),
        Command::Enable => state
            .scheduler
            .set_enabled(&group_id, true)
            .await
            .map(|_| "✅ Расписание включено.".to_string()),
        Command::Disable => state
            .scheduler
            .set_enabled(&group_id, false)
            .await
            .map(|_| "⏸ Расписание выключено.".to_string()),
        Command::SetLocal(raw) => state.scheduler.set_local(&group_id, &raw).await.map(|s| {
            format!(
                "🕒 Смещение сохранено: {}",
                s.timezone_label.unwrap_or_default()
            )
        }),
        Command::Status => match state.scheduler.preview(&group_id).await {
            Ok(Some(p)) => Ok(format!(
                "Группа: {group_id}\nВремя: {}\nЧастота: раз в {} ч.\nВключено: {}\nСледующий запуск: {}",
                p.next_post_time.unwrap_or_else(|| "—".into()),
                p.frequency_hours,
                if p.enabled { "да" } else { "нет" },
                p.next_run_at,
            )),
            Ok(None) => Ok("Расписания ещё нет — задайте время через /settime.".to_string()),
            Err(e) => Err(e),
        },
        Command::AddGroup { group_id, title } => state
            .store
            .upsert_group(&roamcast_core::types::Group {
                group_id: group_id.clone(),
                title,
            })
            .await
            .map(|_| format!("➕ Группа {group_id} добавлена.")),
        Command::SetGroup(id) => state
            .store
            .set_active_group(&id)
            .await
            .map(|_| format!("🎯 Активная группа: {id}")),
        Command::Groups => match state.store.list_groups().await {
            Ok(groups) if groups.is_empty() => Ok("Группы ещё не добавлены.".to_string()),
            Ok(groups) => {
                let active = state.store.active_group().await.ok().flatten();
                let lines: Vec<String> = groups
                    .iter()
                    .map(|g| {
                        let marker = if active.as_deref() == Some(&g.group_id) { "• " } else { "  " };
                        format!("{marker}{} {}", g.group_id, g.title)
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            Err(e) => Err(e),
        },
        Command::Stats => match state.store.recent_posts(10).await {
            Ok(posts) if posts.is_empty() => Ok("Публикаций пока не было.".to_string()),
            Ok(posts) => Ok(format!(
                "Последние публикации: {}\nПоследняя: {}",
                posts.len(),
                posts[0].posted_at.format("%Y-%m-%d %H:%M UTC"),
            )),
            Err(e) => Err(e),
        },
        Command::Help => Ok(HELP_TEXT.to_string()),
    };

    result.unwrap_or_else(|e| format!("⚠️ {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamcast_core::RoamcastConfig;
    use roamcast_storage::FileStore;
    use std::sync::Arc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("/settime 09:30"),
            Some(Command::SetTime("09:30".into()))
        );
        assert_eq!(Command::parse("/setfreq 12"), Some(Command::SetFreq(12)));
        assert_eq!(Command::parse("/on"), Some(Command::Enable));
        assert_eq!(Command::parse("/off"), Some(Command::Disable));
        assert_eq!(
            Command::parse("/setlocal +03:00"),
            Some(Command::SetLocal("+03:00".into()))
        );
        assert_eq!(
            Command::parse("/addgroup -100 Наши путешествия"),
            Some(Command::AddGroup {
                group_id: "-100".into(),
                title: "Наши путешествия".into()
            })
        );
        assert_eq!(Command::parse("/help"), Some(Command::Help));
    }

    #[test]
    fn test_parse_strips_bot_mention() {
        assert_eq!(
            Command::parse("/settime@RoamcastBot 08:00"),
            Some(Command::SetTime("08:00".into()))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/settime"), None);
        assert_eq!(Command::parse("/setfreq soon"), None);
        assert_eq!(Command::parse("/frobnicate"), None);
    }

    fn test_state(tag: &str) -> AppState {
        let dir = std::env::temp_dir().join(format!("roamcast-cmd-{tag}"));
        std::fs::remove_dir_all(&dir).ok();
        let mut config = RoamcastConfig::default();
        config.telegram.group_id = "-100".into();
        AppState::new(config, Arc::new(FileStore::new(&dir)))
    }

    #[tokio::test]
    async fn test_settime_creates_schedule() {
        let state = test_state("settime");
        let reply = dispatch(&state, "/settime 09:00").await;
        assert!(reply.contains("Следующий пост"), "{reply}");

        let preview = state.scheduler.preview("-100").await.unwrap().unwrap();
        assert_eq!(preview.next_post_time.as_deref(), Some("09:00"));
        assert!(preview.enabled);
    }

    #[tokio::test]
    async fn test_setfreq_requires_schedule() {
        let state = test_state("setfreq");
        let reply = dispatch(&state, "/setfreq 12").await;
        assert!(reply.contains("/settime"), "{reply}");

        dispatch(&state, "/settime 09:00").await;
        let reply = dispatch(&state, "/setfreq 12").await;
        assert!(reply.contains("12"), "{reply}");
    }

    #[tokio::test]
    async fn test_group_management() {
        let state = test_state("groups");
        dispatch(&state, "/addgroup -200 Горы").await;
        dispatch(&state, "/setgroup -200").await;
        assert_eq!(state.target_group().await, "-200");

        let listing = dispatch(&state, "/groups").await;
        assert!(listing.contains("-200"));
    }

    #[tokio::test]
    async fn test_unknown_command_shows_help() {
        let state = test_state("unknown");
        let reply = dispatch(&state, "/frobnicate").await;
        assert!(reply.contains("/settime"));
    }
}
