//! Session registry
//!
//! In-memory record of sessions started by this process. Append-only; lives
//! as long as the process. Resume calls do not consult it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// A session started through this server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            prompt: prompt.into(),
        }
    }
}

/// Shared handle to the process-wide session map
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. An id that is already known keeps its first record.
    pub fn insert(&self, record: SessionRecord) {
        let mut sessions = self.sessions.write().unwrap();
        if sessions.contains_key(&record.id) {
            debug!(session_id = %record.id, "Session already registered");
            return;
        }
        debug!(session_id = %record.id, "Session registered");
        sessions.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sessions, oldest first
    pub fn list(&self) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> =
            self.sessions.read().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }
}
