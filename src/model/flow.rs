use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value as JsonValue;

use crate::{
    Result,
    model::{Step, StepId},
};

/// The canonical dialogue definition: an ordered map of step id to step,
/// plus the explicit entry point.
///
/// Key order is insertion order. It drives the default graph layout and is
/// used once, on legacy import, to pick a start step; execution never looks
/// at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowDocument {
    #[serde(rename = "startStepId", skip_serializing_if = "Option::is_none")]
    pub(crate) start: Option<StepId>,
    pub(crate) steps: IndexMap<StepId, Step>,
}

/// Canonical input shape. The legacy shape is the bare `{ id: step }` map.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CanonicalFlow {
    #[serde(rename = "startStepId", default)]
    start: Option<StepId>,
    steps: IndexMap<StepId, Step>,
}

/// Keys that mark an object as meant to be canonical.
const CANONICAL_KEYS: [&str; 2] = ["startStepId", "steps"];

impl<'de> Deserialize<'de> for FlowDocument {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // map order survives buffering through `preserve_order`
        let value = JsonValue::deserialize(deserializer)?;

        let canonical_err = match CanonicalFlow::deserialize(&value) {
            Ok(flow) => {
                return Ok(FlowDocument {
                    start: flow.start,
                    steps: flow.steps,
                });
            }
            Err(e) => e,
        };
        match IndexMap::<StepId, Step>::deserialize(&value) {
            Ok(steps) => Ok(FlowDocument {
                start: steps.keys().next().cloned(),
                steps,
            }),
            Err(legacy_err) => {
                let canonical = value.as_object().is_some_and(|o| CANONICAL_KEYS.iter().any(|k| o.contains_key(*k)));
                Err(D::Error::custom(if canonical { canonical_err } else { legacy_err }))
            }
        }
    }
}

impl FlowDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used to assemble documents in code.
    pub fn with_step(
        mut self,
        id: impl Into<StepId>,
        step: Step,
    ) -> Self {
        let id = id.into();
        if self.start.is_none() {
            self.start = Some(id.clone());
        }
        self.steps.insert(id, step);
        self
    }

    pub fn with_start(
        mut self,
        id: impl Into<StepId>,
    ) -> Self {
        self.start = Some(id.into());
        self
    }

    /// Parses either the canonical or the legacy JSON shape.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str::<FlowDocument>(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Emits the bare `{ id: step }` map, dropping the start pointer.
    pub fn to_legacy_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.steps)?)
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// The start step, if it is set and exists.
    pub fn start_step(&self) -> Option<(&str, &Step)> {
        let id = self.start.as_ref()?;
        self.steps.get_key_value(id).map(|(k, v)| (k.as_str(), v))
    }

    /// A document runs only when its start step resolves.
    pub fn is_executable(&self) -> bool {
        self.start_step().is_some()
    }

    pub fn step(
        &self,
        id: &str,
    ) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.steps.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first_id(&self) -> Option<&str> {
        self.steps.keys().next().map(|k| k.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(|k| k.as_str())
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &Step)> {
        self.steps.iter().map(|(k, v)| (k.as_str(), v))
    }
}
