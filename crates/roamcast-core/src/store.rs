//! Storage capability contract.
//!
//! The scheduler and gateway only ever talk to this trait; whether the state
//! lives in Postgres or in flat JSON files is decided once at startup.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Comment, Group, PostRecord, Schedule};

/// Durable state access for schedules, comments, groups, and the post log.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_schedule(&self, group_id: &str) -> Result<Option<Schedule>>;
    async fn set_schedule(&self, schedule: &Schedule) -> Result<()>;
    async fn list_schedules(&self) -> Result<Vec<Schedule>>;

    /// Latest comment for a chat, if any.
    async fn get_latest_comment(&self, chat_id: &str) -> Result<Option<Comment>>;
    /// Overwrites the previous latest comment for the chat.
    async fn set_latest_comment(&self, comment: &Comment) -> Result<()>;

    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn upsert_group(&self, group: &Group) -> Result<()>;
    async fn active_group(&self) -> Result<Option<String>>;
    async fn set_active_group(&self, group_id: &str) -> Result<()>;

    async fn record_post(&self, record: &PostRecord) -> Result<()>;
    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>>;
}
