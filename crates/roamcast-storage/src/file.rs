//! File-backed store — lightweight persistence.
//! State saved as JSON files, one per concern — human-readable, git-friendly.
//! Reads/writes happen on access, not on a timer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use roamcast_core::error::{Result, RoamcastError};
use roamcast_core::types::{Comment, Group, PostRecord, Schedule};
use roamcast_core::Store;

/// How many published posts the log keeps.
const POST_LOG_CAP: usize = 100;

/// Group registry file shape.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct GroupsFile {
    groups: Vec<Group>,
    active: Option<String>,
}

/// JSON-file store rooted at a state directory.
pub struct FileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the state files.
    lock: Mutex<()>,
}

/// Expand a leading `~/` against the home directory.
pub fn expand_state_dir(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(raw)
    }
}

impl FileStore {
    /// Create a store at the given directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let file = self.dir.join(name);
        if !file.exists() {
            return T::default();
        }
        match std::fs::read_to_string(&file) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse {name}: {e}");
                T::default()
            }),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {name}: {e}");
                T::default()
            }
        }
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let file = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| RoamcastError::Storage(format!("Serialize {name}: {e}")))?;
        std::fs::write(&file, json)
            .map_err(|e| RoamcastError::Storage(format!("Write {name}: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_schedule(&self, group_id: &str) -> Result<Option<Schedule>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let schedules: HashMap<String, Schedule> = self.read_json("schedules.json");
        Ok(schedules.get(group_id).cloned())
    }

    async fn set_schedule(&self, schedule: &Schedule) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut schedules: HashMap<String, Schedule> = self.read_json("schedules.json");
        schedules.insert(schedule.group_id.clone(), schedule.clone());
        self.write_json("schedules.json", &schedules)
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let schedules: HashMap<String, Schedule> = self.read_json("schedules.json");
        let mut all: Vec<Schedule> = schedules.into_values().collect();
        all.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        Ok(all)
    }

    async fn get_latest_comment(&self, chat_id: &str) -> Result<Option<Comment>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let comments: HashMap<String, Comment> = self.read_json("comments.json");
        Ok(comments.get(chat_id).cloned())
    }

    async fn set_latest_comment(&self, comment: &Comment) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut comments: HashMap<String, Comment> = self.read_json("comments.json");
        comments.insert(comment.chat_id.clone(), comment.clone());
        self.write_json("comments.json", &comments)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let file: GroupsFile = self.read_json("groups.json");
        Ok(file.groups)
    }

    async fn upsert_group(&self, group: &Group) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut file: GroupsFile = self.read_json("groups.json");
        match file.groups.iter_mut().find(|g| g.group_id == group.group_id) {
            Some(existing) => existing.title = group.title.clone(),
            None => file.groups.push(group.clone()),
        }
        self.write_json("groups.json", &file)
    }

    async fn active_group(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let file: GroupsFile = self.read_json("groups.json");
        // Fall back to the first registered group, like the group loader
        // always has.
        Ok(file
            .active
            .or_else(|| file.groups.first().map(|g| g.group_id.clone())))
    }

    async fn set_active_group(&self, group_id: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut file: GroupsFile = self.read_json("groups.json");
        if !file.groups.iter().any(|g| g.group_id == group_id) {
            file.groups.push(Group {
                group_id: group_id.to_string(),
                title: String::new(),
            });
        }
        file.active = Some(group_id.to_string());
        self.write_json("groups.json", &file)
    }

    async fn record_post(&self, record: &PostRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut posts: Vec<PostRecord> = self.read_json("posts.json");
        posts.push(record.clone());
        if posts.len() > POST_LOG_CAP {
            let excess = posts.len() - POST_LOG_CAP;
            posts.drain(..excess);
        }
        self.write_json("posts.json", &posts)
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let posts: Vec<PostRecord> = self.read_json("posts.json");
        Ok(posts.into_iter().rev().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn temp_store(tag: &str) -> FileStore {
        let dir = std::env::temp_dir().join(format!("roamcast-test-{tag}"));
        std::fs::remove_dir_all(&dir).ok();
        FileStore::new(&dir)
    }

    #[tokio::test]
    async fn test_schedule_round_trip() {
        let store = temp_store("sched");
        let schedule = Schedule::new("-100", Utc::now());
        store.set_schedule(&schedule).await.unwrap();

        let loaded = store.get_schedule("-100").await.unwrap().unwrap();
        assert_eq!(loaded.group_id, "-100");
        assert_eq!(loaded.frequency_hours, 24);
        assert!(store.get_schedule("-200").await.unwrap().is_none());
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[tokio::test]
    async fn test_latest_comment_overwrites() {
        let store = temp_store("comments");
        let first = Comment {
            chat_id: "-100".into(),
            message_id: "1".into(),
            text: "первый".into(),
            received_at: Utc::now(),
        };
        let second = Comment {
            message_id: "2".into(),
            text: "второй".into(),
            ..first.clone()
        };
        store.set_latest_comment(&first).await.unwrap();
        store.set_latest_comment(&second).await.unwrap();

        let latest = store.get_latest_comment("-100").await.unwrap().unwrap();
        assert_eq!(latest.message_id, "2");
        assert_eq!(latest.text, "второй");
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[tokio::test]
    async fn test_active_group_defaults_to_first() {
        let store = temp_store("groups");
        assert!(store.active_group().await.unwrap().is_none());

        store
            .upsert_group(&Group { group_id: "-1".into(), title: "Путешествия".into() })
            .await
            .unwrap();
        assert_eq!(store.active_group().await.unwrap().as_deref(), Some("-1"));

        store.set_active_group("-2").await.unwrap();
        assert_eq!(store.active_group().await.unwrap().as_deref(), Some("-2"));
        // -2 was auto-registered
        assert_eq!(store.list_groups().await.unwrap().len(), 2);
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[tokio::test]
    async fn test_post_log_capped() {
        let store = temp_store("posts");
        for i in 0..(POST_LOG_CAP + 5) {
            store
                .record_post(&PostRecord {
                    post_id: i.to_string(),
                    photo_message_id: None,
                    text_message_id: Some(i.to_string()),
                    posted_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let recent = store.recent_posts(1000).await.unwrap();
        assert_eq!(recent.len(), POST_LOG_CAP);
        // Newest first, oldest entries dropped.
        assert_eq!(recent[0].post_id, (POST_LOG_CAP + 4).to_string());
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_expand_state_dir() {
        let p = expand_state_dir("~/x/state");
        assert!(p.ends_with("x/state"));
        assert_eq!(expand_state_dir("/tmp/s"), PathBuf::from("/tmp/s"));
    }
}
