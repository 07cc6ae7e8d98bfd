//! Postgres-backed store via sqlx.
//!
//! Hosted deployments set `DATABASE_URL`; the schema is created on connect.
//! Every operation is a single-row read or upsert — no multi-record
//! transactions are needed by the scheduler contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use roamcast_core::error::{Result, RoamcastError};
use roamcast_core::types::{Comment, Group, PostRecord, Schedule};
use roamcast_core::Store;

/// How many published posts the log keeps.
const POST_LOG_CAP: i64 = 100;

pub struct PostgresStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ScheduleRow {
    group_id: String,
    post_time: Option<String>,
    frequency_hours: i32,
    enabled: bool,
    next_run_at: DateTime<Utc>,
    display_offset_minutes: Option<i32>,
    timezone_label: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ScheduleRow> for Schedule {
    fn from(r: ScheduleRow) -> Self {
        Schedule {
            group_id: r.group_id,
            post_time: r.post_time,
            frequency_hours: r.frequency_hours.max(1) as u32,
            enabled: r.enabled,
            next_run_at: r.next_run_at,
            display_offset_minutes: r.display_offset_minutes,
            timezone_label: r.timezone_label,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    chat_id: String,
    message_id: String,
    text: String,
    received_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Comment {
            chat_id: r.chat_id,
            message_id: r.message_id,
            text: r.text,
            received_at: r.received_at,
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    post_id: String,
    photo_message_id: Option<String>,
    text_message_id: Option<String>,
    posted_at: DateTime<Utc>,
}

impl From<PostRow> for PostRecord {
    fn from(r: PostRow) -> Self {
        PostRecord {
            post_id: r.post_id,
            photo_message_id: r.photo_message_id,
            text_message_id: r.text_message_id,
            posted_at: r.posted_at,
        }
    }
}

fn db_err(e: sqlx::Error) -> RoamcastError {
    RoamcastError::Storage(e.to_string())
}

impl PostgresStore {
    /// Connect and run schema migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Render hands out postgres:// URLs; sqlx accepts both schemes but
        // normalize for consistency with the rest of the ecosystem.
        let url = if let Some(rest) = database_url.strip_prefix("postgres://") {
            format!("postgresql://{rest}")
        } else {
            database_url.to_string()
        };

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&url)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schedules (
                group_id TEXT PRIMARY KEY,
                post_time VARCHAR(10),
                frequency_hours INT NOT NULL DEFAULT 24,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                next_run_at TIMESTAMPTZ NOT NULL,
                display_offset_minutes INT,
                timezone_label TEXT,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS comments (
                chat_id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                text TEXT NOT NULL,
                received_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS groups (
                group_id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                is_active BOOLEAN NOT NULL DEFAULT FALSE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id BIGSERIAL PRIMARY KEY,
                post_id TEXT NOT NULL,
                photo_message_id TEXT,
                text_message_id TEXT,
                posted_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_schedule(&self, group_id: &str) -> Result<Option<Schedule>> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT group_id, post_time, frequency_hours, enabled, next_run_at,
                    display_offset_minutes, timezone_label, updated_at
             FROM schedules WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Schedule::from))
    }

    async fn set_schedule(&self, schedule: &Schedule) -> Result<()> {
        sqlx::query(
            "INSERT INTO schedules (group_id, post_time, frequency_hours, enabled,
                                    next_run_at, display_offset_minutes, timezone_label, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             ON CONFLICT (group_id) DO UPDATE SET
                post_time = EXCLUDED.post_time,
                frequency_hours = EXCLUDED.frequency_hours,
                enabled = EXCLUDED.enabled,
                next_run_at = EXCLUDED.next_run_at,
                display_offset_minutes = EXCLUDED.display_offset_minutes,
                timezone_label = EXCLUDED.timezone_label,
                updated_at = NOW()",
        )
        .bind(&schedule.group_id)
        .bind(&schedule.post_time)
        .bind(schedule.frequency_hours as i32)
        .bind(schedule.enabled)
        .bind(schedule.next_run_at)
        .bind(schedule.display_offset_minutes)
        .bind(&schedule.timezone_label)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT group_id, post_time, frequency_hours, enabled, next_run_at,
                    display_offset_minutes, timezone_label, updated_at
             FROM schedules ORDER BY group_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    async fn get_latest_comment(&self, chat_id: &str) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT chat_id, message_id, text, received_at
             FROM comments WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Comment::from))
    }

    async fn set_latest_comment(&self, comment: &Comment) -> Result<()> {
        sqlx::query(
            "INSERT INTO comments (chat_id, message_id, text, received_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (chat_id) DO UPDATE SET
                message_id = EXCLUDED.message_id,
                text = EXCLUDED.text,
                received_at = EXCLUDED.received_at",
        )
        .bind(&comment.chat_id)
        .bind(&comment.message_id)
        .bind(&comment.text)
        .bind(comment.received_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT group_id, title FROM groups ORDER BY group_id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(group_id, title)| Group { group_id, title })
            .collect())
    }

    async fn upsert_group(&self, group: &Group) -> Result<()> {
        sqlx::query(
            "INSERT INTO groups (group_id, title) VALUES ($1, $2)
             ON CONFLICT (group_id) DO UPDATE SET title = EXCLUDED.title",
        )
        .bind(&group.group_id)
        .bind(&group.title)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn active_group(&self) -> Result<Option<String>> {
        let active: Option<(String,)> =
            sqlx::query_as("SELECT group_id FROM groups WHERE is_active LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        if let Some((id,)) = active {
            return Ok(Some(id));
        }
        let first: Option<(String,)> =
            sqlx::query_as("SELECT group_id FROM groups ORDER BY group_id LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(first.map(|(id,)| id))
    }

    async fn set_active_group(&self, group_id: &str) -> Result<()> {
        sqlx::query("UPDATE groups SET is_active = FALSE")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        let updated = sqlx::query("UPDATE groups SET is_active = TRUE WHERE group_id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            sqlx::query("INSERT INTO groups (group_id, title, is_active) VALUES ($1, '', TRUE)")
                .bind(group_id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn record_post(&self, record: &PostRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO posts (post_id, photo_message_id, text_message_id, posted_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.post_id)
        .bind(&record.photo_message_id)
        .bind(&record.text_message_id)
        .bind(record.posted_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "DELETE FROM posts WHERE id NOT IN (
                SELECT id FROM posts ORDER BY id DESC LIMIT $1
             )",
        )
        .bind(POST_LOG_CAP)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT post_id, photo_message_id, text_message_id, posted_at
             FROM posts ORDER BY id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}
