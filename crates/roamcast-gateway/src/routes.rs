//! API route handlers for the gateway.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use roamcast_channels::Outcome;
use roamcast_core::error::Result;
use roamcast_core::types::{Comment, Group, Post, PostRecord};

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let missing = state.config.missing_required();
    Json(json!({
        "status": if missing.is_empty() { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "details": {
            "openai_configured": !state.config.api_key.is_empty(),
            "telegram_configured": missing.is_empty(),
            "relay_mode": state.config.delivery.relay_mode,
        }
    }))
}

/// Poll endpoint — the externally-driven scheduler tick.
///
/// Not due: nothing mutates. Due: generate, deliver (direct mode), advance
/// the schedule — one atomic decision under the post lock.
pub async fn should_post(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let _guard = state.post_lock.lock().await;
    let now = Utc::now();
    let group_id = state.target_group().await;

    match state.scheduler.is_due(&group_id, now).await {
        Ok(false) => {
            return (
                StatusCode::OK,
                Json(json!({"should_post": false, "post": null})),
            );
        }
        Ok(true) => {}
        Err(e) => {
            tracing::error!("Schedule read failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            );
        }
    }

    tracing::info!("🔔 Post due for group {group_id}");
    let post = match generate_with_context(&state, &group_id).await {
        Ok(post) => post,
        Err(e) => {
            tracing::error!("Generation failed: {e}");
            state
                .telegram
                .notify_admin(&state.config.telegram.admin_chat_id, &format!("❌ Генерация поста не удалась: {e}"))
                .await;
            // Nothing marked posted; the next poll retries.
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"ok": false, "error": e.to_string()})),
            );
        }
    };

    let outcome = match state.delivery.deliver(&group_id, &post).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Delivery failed: {e}");
            state
                .telegram
                .notify_admin(&state.config.telegram.admin_chat_id, &format!("❌ Публикация не удалась: {e}"))
                .await;
            // Delivery failed after generation: the schedule stays put so the
            // next poll tries again.
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"ok": false, "error": e.to_string()})),
            );
        }
    };

    if let Err(e) = state.scheduler.mark_posted(&group_id, Utc::now()).await {
        tracing::error!("Failed to advance schedule: {e}");
    }
    log_post(&state, &outcome).await;
    state
        .telegram
        .notify_admin(
            &state.config.telegram.admin_chat_id,
            if state.delivery.is_relay() {
                "✅ Пост сгенерирован и передан на публикацию"
            } else {
                "✅ Пост опубликован"
            },
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({"should_post": true, "post": post})),
    )
}

/// Manual generation — always generates, never touches scheduler state.
/// In direct mode the post is also published.
pub async fn generate_post(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let group_id = state.target_group().await;
    tracing::info!("📝 Manual generation requested for group {group_id}");

    let post = match generate_with_context(&state, &group_id).await {
        Ok(post) => post,
        Err(e) => {
            tracing::error!("Generation failed: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"ok": false, "error": e.to_string()})),
            );
        }
    };

    match state.delivery.deliver(&group_id, &post).await {
        Ok(outcome) => {
            log_post(&state, &outcome).await;
            (StatusCode::OK, Json(json!({"ok": true, "post": post})))
        }
        Err(e) => {
            tracing::error!("Delivery failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
        }
    }
}

/// Read-only schedule introspection.
pub async fn schedule_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let group_id = state.target_group().await;
    match state.scheduler.preview(&group_id).await {
        Ok(Some(preview)) => Json(json!({
            "ok": true,
            "group_id": group_id,
            "next_post_time": preview.next_post_time,
            "frequency_hours": preview.frequency_hours,
            "enabled": preview.enabled,
            "next_run_at": preview.next_run_at,
        })),
        Ok(None) => Json(json!({"ok": false, "error": "No schedule yet — run /settime"})),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

/// Comment ingestion — overwrites the stored latest comment for the chat.
pub async fn ingest_comment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let Some(chat_id) = field_string(&body, "chat_id") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "chat_id required"})),
        );
    };
    let text = field_string(&body, "text").unwrap_or_default();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "text required"})),
        );
    }

    let comment = Comment {
        chat_id,
        message_id: field_string(&body, "message_id").unwrap_or_default(),
        text,
        received_at: Utc::now(),
    };
    match state.store.set_latest_comment(&comment).await {
        Ok(()) => (StatusCode::OK, Json(json!({"ok": true}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "error": e.to_string()})),
        ),
    }
}

/// Recent-post summary.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.store.recent_posts(10).await {
        Ok(posts) => Json(json!({
            "ok": true,
            "total_recent": posts.len(),
            "posts": posts,
        })),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

/// Inbound Telegram webhook — admin commands go to the dispatcher, plain
/// group messages become the latest comment.
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    // Telegram expects a fast 200 regardless; malformed payloads are dropped.
    let update: roamcast_channels::telegram::TelegramUpdate = match serde_json::from_value(body) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!("Unparseable webhook update: {e}");
            return Json(json!({"ok": true}));
        }
    };

    let Some(msg) = update.text_message() else {
        return Json(json!({"ok": true}));
    };
    let chat_id = msg.chat.id.to_string();
    let text = msg.text.clone().unwrap_or_default();

    if chat_id == state.config.telegram.admin_chat_id && text.starts_with('/') {
        let reply = super::commands::dispatch(&state, &text).await;
        if let Err(e) = state.telegram.send_message(&chat_id, &reply).await {
            tracing::warn!("⚠️ Command reply failed: {e}");
        }
        return Json(json!({"ok": true}));
    }

    if msg.chat.chat_type != "private" {
        let group = Group {
            group_id: chat_id.clone(),
            title: msg.chat.title.clone().unwrap_or_default(),
        };
        if let Err(e) = state.store.upsert_group(&group).await {
            tracing::warn!("Group registration failed: {e}");
        }
        let comment = Comment {
            chat_id,
            message_id: msg.message_id.to_string(),
            text,
            received_at: Utc::now(),
        };
        if let Err(e) = state.store.set_latest_comment(&comment).await {
            tracing::warn!("Comment ingestion failed: {e}");
        }
    }

    Json(json!({"ok": true}))
}

/// Pull the latest group comment through the relevance filter, then generate.
/// A storage read failure only costs the context, never the post.
async fn generate_with_context(state: &AppState, group_id: &str) -> Result<Post> {
    let context = match state.store.get_latest_comment(group_id).await {
        Ok(Some(comment)) => state.relevance.filter(&comment.text).await,
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Comment lookup failed, generating without context: {e}");
            None
        }
    };
    state.generator.generate(context.as_deref()).await
}

/// Log a delivered/handed-off post to the stats trail.
async fn log_post(state: &AppState, outcome: &Outcome) {
    let record = match outcome {
        Outcome::Published {
            photo_message_id,
            text_message_id,
        } => PostRecord {
            post_id: photo_message_id
                .clone()
                .or_else(|| text_message_id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            photo_message_id: photo_message_id.clone(),
            text_message_id: text_message_id.clone(),
            posted_at: Utc::now(),
        },
        // Relay hand-off: the relay's message ids are never visible here.
        Outcome::Handoff => PostRecord {
            post_id: uuid::Uuid::new_v4().to_string(),
            photo_message_id: None,
            text_message_id: None,
            posted_at: Utc::now(),
        },
    };
    if let Err(e) = state.store.record_post(&record).await {
        tracing::warn!("Post log write failed: {e}");
    }
}

/// Accept both JSON strings and numbers for id-ish fields.
fn field_string(body: &Value, key: &str) -> Option<String> {
    match &body[key] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamcast_core::RoamcastConfig;
    use roamcast_storage::FileStore;

    #[test]
    fn test_field_string_accepts_numbers_and_strings() {
        let body = json!({"chat_id": -100200, "message_id": "77", "empty": ""});
        assert_eq!(field_string(&body, "chat_id").as_deref(), Some("-100200"));
        assert_eq!(field_string(&body, "message_id").as_deref(), Some("77"));
        assert_eq!(field_string(&body, "empty"), None);
        assert_eq!(field_string(&body, "missing"), None);
    }

    fn test_state(tag: &str) -> Arc<AppState> {
        let dir = std::env::temp_dir().join(format!("roamcast-routes-{tag}"));
        std::fs::remove_dir_all(&dir).ok();
        let mut config = RoamcastConfig::default();
        config.telegram.group_id = "-100".into();
        Arc::new(AppState::new(config, Arc::new(FileStore::new(&dir))))
    }

    #[tokio::test]
    async fn test_webhook_group_message_becomes_latest_comment() {
        let state = test_state("webhook");
        let update = json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": 5, "is_bot": false, "first_name": "Аня"},
                "chat": {"id": -100, "type": "supergroup", "title": "Путешествия"},
                "text": "Посоветуйте маршрут по Карелии"
            }
        });
        telegram_webhook(State(state.clone()), Json(update)).await;

        let comment = state.store.get_latest_comment("-100").await.unwrap().unwrap();
        assert_eq!(comment.text, "Посоветуйте маршрут по Карелии");
        assert_eq!(comment.message_id, "10");
        // The group got auto-registered too.
        let groups = state.store.list_groups().await.unwrap();
        assert_eq!(groups[0].title, "Путешествия");
    }

    #[tokio::test]
    async fn test_webhook_second_message_overwrites_first() {
        let state = test_state("webhook-overwrite");
        for (id, text) in [(11, "первый"), (12, "второй")] {
            let update = json!({
                "update_id": id,
                "message": {
                    "message_id": id,
                    "from": {"id": 5, "is_bot": false, "first_name": "Аня"},
                    "chat": {"id": -100, "type": "supergroup"},
                    "text": text
                }
            });
            telegram_webhook(State(state.clone()), Json(update)).await;
        }
        let comment = state.store.get_latest_comment("-100").await.unwrap().unwrap();
        assert_eq!(comment.text, "второй");
    }

    #[tokio::test]
    async fn test_ingest_comment_endpoint() {
        let state = test_state("ingest");
        let (status, _) = ingest_comment(
            State(state.clone()),
            Json(json!({"chat_id": -100, "message_id": 3, "text": "едем в Сочи"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let comment = state.store.get_latest_comment("-100").await.unwrap().unwrap();
        assert_eq!(comment.text, "едем в Сочи");

        let (status, _) =
            ingest_comment(State(state.clone()), Json(json!({"text": "без чата"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_post_quiet_when_nothing_scheduled() {
        let state = test_state("quiet");
        let (status, Json(body)) = should_post(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["should_post"], json!(false));
        assert_eq!(body["post"], json!(null));
    }

    #[tokio::test]
    async fn test_schedule_info_before_settime() {
        let state = test_state("schedinfo");
        let Json(body) = schedule_info(State(state)).await;
        assert_eq!(body["ok"], json!(false));
    }
}
