//! Events emitted by the flow runtime.
//!
//! Every evaluation of an inbound message produces one or two events, sent
//! fire-and-forget on a broadcast queue. Channel adapters and observers
//! subscribe through `Engine::subscribe`.

use serde::{Deserialize, Serialize};

use crate::model::StepId;

/// What happened to a conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEventKind {
    /// conversation placed on the start step
    Started {
        step: StepId,
    },
    /// an option matched and the conversation moved
    Moved {
        from: StepId,
        to: StepId,
        keyword: String,
    },
    /// nothing matched; `step` is where the conversation is now
    NoMatch {
        from: StepId,
        step: StepId,
    },
    /// an option matched but pointed at a missing step
    Dangling {
        step: StepId,
        keyword: String,
        next: StepId,
    },
    /// the conversation reached a terminal step and was closed
    Ended {
        step: StepId,
    },
    /// the conversation's step no longer exists
    Vanished {
        step: StepId,
    },
    /// the flow has no start step, nothing was sent
    NotExecutable,
}

/// Runtime event for one conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    pub conversation_id: String,
    pub kind: RuntimeEventKind,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

impl RuntimeEvent {
    pub fn new(
        conversation_id: &str,
        kind: RuntimeEventKind,
        timestamp: i64,
    ) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            kind,
            timestamp,
        }
    }

    /// Whether the conversation's session was closed by this event.
    pub fn is_end(&self) -> bool {
        matches!(self.kind, RuntimeEventKind::Ended { .. } | RuntimeEventKind::Vanished { .. })
    }
}
