use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::{
    ShareLock,
    common::BroadcastQueue,
    config::RuntimeConfig,
    events::{RuntimeEvent, RuntimeEventKind},
    model::FlowDocument,
    runtime::{Interpreter, Outcome, OutcomeKind, Session, SessionStore},
    utils,
};

/// Capacity of the runtime event queue.
const EVENT_QUEUE_SIZE: usize = 1024;

/// Runs conversations against the published flow document.
///
/// The document is held as an `Arc` snapshot behind a lock; `reload` swaps
/// the snapshot and every `handle` call reads it exactly once, so a single
/// evaluation never sees two versions of the flow. Live sessions survive a
/// reload and continue from their current step id.
pub struct FlowRuntime {
    doc: ShareLock<Arc<FlowDocument>>,
    interpreter: Interpreter,
    sessions: SessionStore,
    events: Arc<BroadcastQueue<RuntimeEvent>>,
}

impl FlowRuntime {
    pub fn new(
        doc: FlowDocument,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            doc: Arc::new(RwLock::new(Arc::new(doc))),
            interpreter: Interpreter::new(config),
            sessions: SessionStore::new(config),
            events: BroadcastQueue::new(EVENT_QUEUE_SIZE),
        }
    }

    /// Publishes a new document to every conversation.
    pub fn reload(
        &self,
        doc: FlowDocument,
    ) {
        trace!("runtime::reload({} steps)", doc.len());
        let mut current = self.doc.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(doc);
    }

    /// The document new evaluations run against.
    pub fn snapshot(&self) -> Arc<FlowDocument> {
        self.doc.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.events.subscribe()
    }

    /// Evaluates one inbound message for a conversation.
    ///
    /// Without a session the message is consumed as a greeting and the
    /// conversation is placed on the start step. Ended and vanished
    /// conversations lose their session, so their next message restarts.
    pub fn handle(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Outcome {
        let doc = self.snapshot();
        let session = self.sessions.get(conversation_id);

        let outcome = match &session {
            Some(session) => self.interpreter.next(&doc, &session.step, text),
            None => self.interpreter.start(&doc),
        };
        debug!("runtime::handle({}, {:?}) -> {:?}", conversation_id, text, outcome.kind);

        match (&outcome.step, outcome.ended) {
            (Some(step), false) => self.sessions.put(match &session {
                Some(session) => session.moved_to(step),
                None => Session::new(conversation_id, step),
            }),
            _ => self.sessions.remove(conversation_id),
        }

        let from = session.as_ref().map(|s| s.step.as_str());
        for kind in events_of(from, &outcome) {
            // nobody listening is fine
            let _ = self.events.send(RuntimeEvent::new(conversation_id, kind, utils::time::time_millis()));
        }

        outcome
    }
}

fn events_of(
    from: Option<&str>,
    outcome: &Outcome,
) -> Vec<RuntimeEventKind> {
    let from = from.unwrap_or_default().to_string();
    let step = outcome.step.clone().unwrap_or_default();

    let mut events = match &outcome.kind {
        OutcomeKind::Started => vec![RuntimeEventKind::Started {
            step: step.clone(),
        }],
        OutcomeKind::Matched {
            keyword,
        } => vec![RuntimeEventKind::Moved {
            from,
            to: step.clone(),
            keyword: keyword.clone(),
        }],
        OutcomeKind::NoMatch => vec![RuntimeEventKind::NoMatch {
            from,
            step: step.clone(),
        }],
        OutcomeKind::Dangling {
            keyword,
            next,
        } => vec![RuntimeEventKind::Dangling {
            step: from,
            keyword: keyword.clone(),
            next: next.clone(),
        }],
        OutcomeKind::Vanished => return vec![RuntimeEventKind::Vanished { step: from }],
        OutcomeKind::NotExecutable => return vec![RuntimeEventKind::NotExecutable],
    };

    if outcome.ended {
        events.push(RuntimeEventKind::Ended {
            step,
        });
    }
    events
}
