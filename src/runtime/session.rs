use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{common::MemCache, config::RuntimeConfig, model::StepId, utils};

/// Where one conversation currently is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub conversation_id: String,
    pub step: StepId,
    pub start_time: i64,
    pub update_time: i64,
}

impl Session {
    pub fn new(
        conversation_id: &str,
        step: &str,
    ) -> Self {
        let now = utils::time::time_millis();
        Self {
            conversation_id: conversation_id.to_string(),
            step: step.to_string(),
            start_time: now,
            update_time: now,
        }
    }

    pub fn moved_to(
        &self,
        step: &str,
    ) -> Self {
        Self {
            step: step.to_string(),
            update_time: utils::time::time_millis(),
            ..self.clone()
        }
    }
}

/// Current-step pointers keyed by conversation id.
///
/// Sessions are private to their conversation. Without `session_idle_secs`
/// they live until the conversation ends or capacity forces eviction.
#[derive(Clone)]
pub struct SessionStore {
    sessions: MemCache<String, Session>,
}

impl SessionStore {
    pub fn new(config: &RuntimeConfig) -> Self {
        let sessions = match config.session_idle_secs {
            Some(secs) => MemCache::with_idle(config.session_capacity, Duration::from_secs(secs)),
            None => MemCache::new(config.session_capacity),
        };
        Self {
            sessions,
        }
    }

    pub fn get(
        &self,
        conversation_id: &str,
    ) -> Option<Session> {
        self.sessions.get(&conversation_id.to_string())
    }

    pub fn put(
        &self,
        session: Session,
    ) {
        self.sessions.set(session.conversation_id.clone(), session);
    }

    pub fn remove(
        &self,
        conversation_id: &str,
    ) {
        self.sessions.remove(&conversation_id.to_string());
    }

    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Snapshot of the live sessions, in no particular order.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.iter().map(|(_, s)| s).collect()
    }
}
