//! The transition function of the dialogue state machine.
//!
//! `Interpreter::next` is a pure function of (document, current step, input):
//! it never blocks, never fails and never mutates the document. Unmatched
//! input, dangling targets and vanished steps are outcomes, not errors.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::RuntimeConfig,
    model::{FlowDocument, StepId},
    runtime::MatchMode,
};

/// What happens when no option of the current step matches.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoMatchPolicy {
    /// stay on the current step and send its message again
    #[default]
    Resend,
    /// move to the configured fallback step
    Fallback,
    /// stay on the current step and send nothing
    Unhandled,
}

/// What happens on arrival at a step without options.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminalPolicy {
    /// the conversation ends; the next inbound message starts over
    #[default]
    End,
    /// the conversation stays parked on the terminal step
    Wait,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// a new conversation was placed on the start step
    Started,
    /// an option matched and its target exists
    Matched {
        keyword: String,
    },
    /// no option matched
    NoMatch,
    /// an option matched but its target does not exist
    Dangling {
        keyword: String,
        next: StepId,
    },
    /// the current step was deleted from under the conversation
    Vanished,
    /// the flow has no resolvable start step
    NotExecutable,
}

/// Result of one evaluation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// step current after the evaluation
    pub step: Option<StepId>,
    /// message to send, if any
    pub reply: Option<String>,
    /// the conversation is over and its session should be dropped
    pub ended: bool,
}

impl Outcome {
    fn over(kind: OutcomeKind) -> Self {
        Self {
            kind,
            step: None,
            reply: None,
            ended: true,
        }
    }

    /// Whether the input was consumed by a matching option.
    pub fn is_match(&self) -> bool {
        matches!(self.kind, OutcomeKind::Matched { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    match_mode: MatchMode,
    no_match: NoMatchPolicy,
    fallback_step: Option<StepId>,
    terminal: TerminalPolicy,
}

impl Interpreter {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            match_mode: config.match_mode,
            no_match: config.no_match,
            fallback_step: config.fallback_step.clone(),
            terminal: config.terminal,
        }
    }

    /// Places a new conversation on the start step.
    pub fn start(
        &self,
        doc: &FlowDocument,
    ) -> Outcome {
        match doc.start_step() {
            Some((id, _)) => self.arrive(doc, id, OutcomeKind::Started),
            None => Outcome::over(OutcomeKind::NotExecutable),
        }
    }

    /// Selects the next step for `input` received while on `current`.
    ///
    /// Options are tried in list order and the first match wins.
    pub fn next(
        &self,
        doc: &FlowDocument,
        current: &str,
        input: &str,
    ) -> Outcome {
        let Some(step) = doc.step(current) else {
            debug!("interpreter: step {} vanished", current);
            return Outcome::over(OutcomeKind::Vanished);
        };

        let Some(option) = step.options.iter().find(|t| self.match_mode.matches(&t.keyword, input)) else {
            return self.no_match(doc, current, OutcomeKind::NoMatch);
        };

        if doc.contains(&option.next) {
            debug!("interpreter: {} --[{}]--> {}", current, option.keyword, option.next);
            self.arrive(
                doc,
                &option.next,
                OutcomeKind::Matched {
                    keyword: option.keyword.clone(),
                },
            )
        } else {
            warn!("interpreter: step {} option '{}' points to missing step {}", current, option.keyword, option.next);
            self.no_match(
                doc,
                current,
                OutcomeKind::Dangling {
                    keyword: option.keyword.clone(),
                    next: option.next.clone(),
                },
            )
        }
    }

    fn no_match(
        &self,
        doc: &FlowDocument,
        current: &str,
        kind: OutcomeKind,
    ) -> Outcome {
        match self.no_match {
            NoMatchPolicy::Fallback => match self.fallback_step.as_deref().filter(|f| doc.contains(f)) {
                Some(fallback) => self.arrive(doc, fallback, kind),
                None => {
                    warn!("interpreter: fallback step {:?} missing, resending {}", self.fallback_step, current);
                    self.stay(doc, current, kind, true)
                }
            },
            NoMatchPolicy::Resend => self.stay(doc, current, kind, true),
            NoMatchPolicy::Unhandled => self.stay(doc, current, kind, false),
        }
    }

    fn stay(
        &self,
        doc: &FlowDocument,
        current: &str,
        kind: OutcomeKind,
        resend: bool,
    ) -> Outcome {
        Outcome {
            kind,
            step: Some(current.to_string()),
            reply: if resend { doc.step(current).map(|s| s.message.clone()) } else { None },
            ended: false,
        }
    }

    fn arrive(
        &self,
        doc: &FlowDocument,
        id: &str,
        kind: OutcomeKind,
    ) -> Outcome {
        let step = doc.step(id);
        Outcome {
            kind,
            step: Some(id.to_string()),
            reply: step.map(|s| s.message.clone()),
            ended: step.is_some_and(|s| s.is_terminal()) && self.terminal == TerminalPolicy::End,
        }
    }
}
