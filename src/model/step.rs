use serde::{Deserialize, Serialize};

/// step id, unique within a flow document
pub type StepId = String;

/// Placeholder message given to freshly added steps.
pub const NEW_STEP_MESSAGE: &str = "New step";

/// Visual kind of a step, as offered by the editor toolbox.
///
/// The interpreter treats every kind as a message step; the kind only
/// changes how the node is drawn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    #[default]
    Message,
    Condition,
    Delay,
    Action,
    Webhook,
    Email,
}

impl StepKind {
    fn is_message(&self) -> bool {
        *self == StepKind::Message
    }
}

/// A `(keyword, next step)` pair attached to a step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Transition {
    /// token matched against inbound text
    pub keyword: String,
    /// target step id, possibly dangling
    pub next: StepId,
}

impl Transition {
    pub fn new(
        keyword: impl Into<String>,
        next: impl Into<StepId>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            next: next.into(),
        }
    }
}

/// One node of the dialogue graph. Its id is the key it is stored under.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// visual kind
    #[serde(rename = "type", default, skip_serializing_if = "StepKind::is_message")]
    pub kind: StepKind,
    /// text sent when this step becomes current
    pub message: String,
    /// outgoing transitions, in match order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Transition>,
}

impl Step {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Message,
            message: message.into(),
            options: Vec::new(),
        }
    }

    pub fn with_kind(
        mut self,
        kind: StepKind,
    ) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_option(
        mut self,
        keyword: impl Into<String>,
        next: impl Into<StepId>,
    ) -> Self {
        self.options.push(Transition::new(keyword, next));
        self
    }

    /// A step without options has no way out.
    pub fn is_terminal(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_step_omits_defaults() {
        let step = Step::new("Bye");
        assert_eq!(serde_json::to_value(&step).unwrap(), json!({"message": "Bye"}));
    }

    #[test]
    fn test_step_kind_as_type() {
        let step = Step::new("wait").with_kind(StepKind::Delay).with_option("ok", "B");
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({"type": "delay", "message": "wait", "options": [{"keyword": "ok", "next": "B"}]})
        );

        let parsed: Step = serde_json::from_value(json!({"type": "webhook", "message": "x"})).unwrap();
        assert_eq!(parsed.kind, StepKind::Webhook);
        assert!(parsed.is_terminal());
    }

    #[test]
    fn test_step_kind_strings() {
        assert_eq!(StepKind::Email.as_ref(), "email");
        assert_eq!(StepKind::from_str("condition").unwrap(), StepKind::Condition);
        assert!(StepKind::from_str("teleport").is_err());
    }
}
