//! Referential-integrity checks over a flow document.
//!
//! Dangling transitions are legal to store but can never be followed, and
//! the graph view hides them. These checks make them visible again: the
//! editor runs them after every mutation and the engine runs them on every
//! save. None of them block a save.

use std::{collections::HashMap, fmt};

use petgraph::{graph::DiGraph, visit::Dfs};
use serde::{Deserialize, Serialize};

use crate::model::{FlowDocument, StepId};

/// A transition whose `next` does not name an existing step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DanglingTransition {
    /// step owning the transition
    pub step: StepId,
    /// position in the step's options
    pub index: usize,
    pub keyword: String,
    /// the unresolved target
    pub next: StepId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// the document has no steps at all
    EmptyDocument,
    /// a step is stored under the empty id
    EmptyStepId,
    /// no start step is set
    MissingStartStep,
    /// the start step names a step that does not exist
    UnknownStartStep(StepId),
    DanglingTransition(DanglingTransition),
}

impl fmt::Display for ValidationIssue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ValidationIssue::EmptyDocument => write!(f, "flow has no steps"),
            ValidationIssue::EmptyStepId => write!(f, "a step has an empty id"),
            ValidationIssue::MissingStartStep => write!(f, "flow has no start step"),
            ValidationIssue::UnknownStartStep(id) => write!(f, "start step '{}' does not exist", id),
            ValidationIssue::DanglingTransition(d) => {
                write!(f, "step '{}' option {} ('{}') points to missing step '{}'", d.step, d.index, d.keyword, d.next)
            }
        }
    }
}

/// Result of a validation pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(Vec<ValidationIssue>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Validation::Valid => &[],
            Validation::Invalid(issues) => issues,
        }
    }

    pub fn dangling(&self) -> impl Iterator<Item = &DanglingTransition> {
        self.issues().iter().filter_map(|issue| match issue {
            ValidationIssue::DanglingTransition(d) => Some(d),
            _ => None,
        })
    }
}

impl FlowDocument {
    /// All transitions whose target is missing, in document order.
    pub fn dangling_transitions(&self) -> Vec<DanglingTransition> {
        self.steps
            .iter()
            .flat_map(|(id, step)| {
                step.options.iter().enumerate().filter(move |(_, t)| !self.steps.contains_key(&t.next)).map(move |(index, t)| DanglingTransition {
                    step: id.clone(),
                    index,
                    keyword: t.keyword.clone(),
                    next: t.next.clone(),
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Validation {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(ValidationIssue::EmptyDocument);
        }
        if self.steps.contains_key("") {
            issues.push(ValidationIssue::EmptyStepId);
        }
        match &self.start {
            None => issues.push(ValidationIssue::MissingStartStep),
            Some(start) if !self.steps.contains_key(start) => issues.push(ValidationIssue::UnknownStartStep(start.clone())),
            Some(_) => {}
        }
        issues.extend(self.dangling_transitions().into_iter().map(ValidationIssue::DanglingTransition));

        if issues.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(issues)
        }
    }

    /// Steps no conversation can ever reach from the start step.
    ///
    /// Without a resolvable start step every step is unreachable.
    pub fn unreachable_steps(&self) -> Vec<StepId> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let indices: HashMap<&str, _> = self.steps.keys().map(|id| (id.as_str(), graph.add_node(id.as_str()))).collect();

        for (id, step) in self.steps.iter() {
            for t in step.options.iter() {
                if let Some(target) = indices.get(t.next.as_str()) {
                    graph.add_edge(indices[id.as_str()], *target, ());
                }
            }
        }

        let Some(start) = self.start.as_deref().and_then(|s| indices.get(s)) else {
            return self.steps.keys().cloned().collect();
        };

        let mut reached = vec![false; graph.node_count()];
        let mut dfs = Dfs::new(&graph, *start);
        while let Some(idx) = dfs.next(&graph) {
            reached[idx.index()] = true;
        }

        graph.node_indices().filter(|idx| !reached[idx.index()]).map(|idx| graph[idx].to_string()).collect()
    }
}
