//! Flow editor: the only way a flow document is mutated.
//!
//! Every operation validates its arguments before touching the document, so
//! a rejected operation leaves both the document and the graph unchanged.
//! After each successful mutation the graph view is re-derived and dangling
//! transitions are reported as warnings.
//!
//! One editor owns one document. Two editors saving the same flow race, and
//! the last save wins.

use std::mem;

use tracing::{trace, warn};

use crate::{
    ChatflowError, Result,
    graph::{GraphModel, flow_to_graph, graph_to_flow},
    model::{DanglingTransition, FlowDocument, NEW_STEP_MESSAGE, Step, StepId, StepKind, Transition, Validation},
};

/// Which half of an option `update_option` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OptionField {
    Keyword,
    Next,
}

pub struct FlowEditor {
    /// stored flow this editor was opened on
    flow_id: Option<String>,
    doc: FlowDocument,
    graph: GraphModel,
    selected: Option<StepId>,
}

impl Default for FlowEditor {
    fn default() -> Self {
        Self::new(FlowDocument::default())
    }
}

impl FlowEditor {
    /// Opens an editor on a document; the first step is selected.
    pub fn new(doc: FlowDocument) -> Self {
        let graph = flow_to_graph(&doc);
        let selected = doc.first_id().map(|s| s.to_string());
        let editor = Self {
            flow_id: None,
            doc,
            graph,
            selected,
        };
        editor.report();
        editor
    }

    /// Opens an editor on the document stored as `flow_id`.
    pub fn open(
        flow_id: &str,
        doc: FlowDocument,
    ) -> Self {
        Self {
            flow_id: Some(flow_id.to_string()),
            ..Self::new(doc)
        }
    }

    /// Opens an editor on a graph edited elsewhere.
    pub fn from_graph(graph: &GraphModel) -> Self {
        Self::new(graph_to_flow(graph))
    }

    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    pub fn document(&self) -> &FlowDocument {
        &self.doc
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn into_document(self) -> FlowDocument {
        self.doc
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select_step(
        &mut self,
        id: &str,
    ) -> Result<()> {
        self.require(id)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Transitions that currently point nowhere.
    pub fn warnings(&self) -> Vec<DanglingTransition> {
        self.doc.dangling_transitions()
    }

    pub fn validate(&self) -> Validation {
        self.doc.validate()
    }

    pub fn add_step(
        &mut self,
        id: &str,
    ) -> Result<()> {
        self.add_step_with(id, StepKind::Message)
    }

    /// Adds a step with a placeholder message and no options.
    pub fn add_step_with(
        &mut self,
        id: &str,
        kind: StepKind,
    ) -> Result<()> {
        trace!("editor::add_step({}, {})", id, kind.as_ref());
        if id.is_empty() {
            return Err(ChatflowError::EmptyStepId);
        }
        if self.doc.contains(id) {
            return Err(ChatflowError::DuplicateStep(id.to_string()));
        }

        self.doc.steps.insert(id.to_string(), Step::new(NEW_STEP_MESSAGE).with_kind(kind));
        if self.doc.start.is_none() {
            self.doc.start = Some(id.to_string());
        }
        if self.selected.is_none() {
            self.selected = Some(id.to_string());
        }
        // an existing dangling transition may resolve to the new step
        self.rebuild();
        Ok(())
    }

    /// Renames a step in place and rewrites every reference to it.
    pub fn rename_step(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<()> {
        trace!("editor::rename_step({}, {})", old, new);
        self.require(old)?;
        if new.is_empty() {
            return Err(ChatflowError::EmptyStepId);
        }
        if old == new {
            return Ok(());
        }
        if self.doc.contains(new) {
            return Err(ChatflowError::DuplicateStep(new.to_string()));
        }

        let steps = mem::take(&mut self.doc.steps);
        self.doc.steps = steps
            .into_iter()
            .map(|(id, mut step)| {
                step.options.iter_mut().filter(|t| t.next == old).for_each(|t| t.next = new.to_string());
                if id == old { (new.to_string(), step) } else { (id, step) }
            })
            .collect();
        if self.doc.start.as_deref() == Some(old) {
            self.doc.start = Some(new.to_string());
        }
        if self.selected.as_deref() == Some(old) {
            self.selected = Some(new.to_string());
        }
        self.rebuild();
        Ok(())
    }

    /// Replaces a step's message and options wholesale.
    pub fn update_step(
        &mut self,
        id: &str,
        message: impl Into<String>,
        options: Vec<Transition>,
    ) -> Result<()> {
        trace!("editor::update_step({})", id);
        let step = self.step_mut(id)?;
        step.message = message.into();
        step.options = options;
        self.refresh(id);
        Ok(())
    }

    pub fn update_message(
        &mut self,
        id: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        trace!("editor::update_message({})", id);
        self.step_mut(id)?.message = message.into();
        self.refresh(id);
        Ok(())
    }

    pub fn set_kind(
        &mut self,
        id: &str,
        kind: StepKind,
    ) -> Result<()> {
        trace!("editor::set_kind({}, {})", id, kind.as_ref());
        self.step_mut(id)?.kind = kind;
        self.refresh(id);
        Ok(())
    }

    /// Appends an empty option and returns its index.
    ///
    /// The new option is dangling until its target is set.
    pub fn add_option(
        &mut self,
        id: &str,
    ) -> Result<usize> {
        trace!("editor::add_option({})", id);
        let step = self.step_mut(id)?;
        step.options.push(Transition::default());
        let index = step.options.len() - 1;
        self.refresh(id);
        Ok(index)
    }

    pub fn update_option(
        &mut self,
        id: &str,
        index: usize,
        field: OptionField,
        value: impl Into<String>,
    ) -> Result<()> {
        trace!("editor::update_option({}, {}, {})", id, index, field.as_ref());
        let option = self.step_mut(id)?.options.get_mut(index).ok_or_else(|| ChatflowError::OptionNotFound {
            step: id.to_string(),
            index,
        })?;
        match field {
            OptionField::Keyword => option.keyword = value.into(),
            OptionField::Next => option.next = value.into(),
        }
        self.refresh(id);
        Ok(())
    }

    pub fn remove_option(
        &mut self,
        id: &str,
        index: usize,
    ) -> Result<Transition> {
        trace!("editor::remove_option({}, {})", id, index);
        let step = self.step_mut(id)?;
        if index >= step.options.len() {
            return Err(ChatflowError::OptionNotFound {
                step: id.to_string(),
                index,
            });
        }
        let removed = step.options.remove(index);
        self.refresh(id);
        Ok(removed)
    }

    /// Draws an edge: appends a `keyword -> target` option to `source`.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        keyword: impl Into<String>,
    ) -> Result<()> {
        trace!("editor::connect({}, {})", source, target);
        self.step_mut(source)?.options.push(Transition::new(keyword, target));
        self.refresh(source);
        Ok(())
    }

    /// Removes the option an edge of the graph view stands for.
    pub fn disconnect(
        &mut self,
        edge_id: &str,
    ) -> Result<Transition> {
        trace!("editor::disconnect({})", edge_id);
        let edge = self.graph.edge(edge_id).ok_or_else(|| ChatflowError::EdgeNotFound(edge_id.to_string()))?;
        let source = edge.source.clone();

        // the n-th edge of a source is its n-th resolvable option
        let nth = self.graph.outgoing(&source).iter().position(|e| e.id == edge_id).ok_or_else(|| ChatflowError::EdgeNotFound(edge_id.to_string()))?;
        let step = self.doc.step(&source).ok_or_else(|| ChatflowError::StepNotFound(source.clone()))?;
        let index = step
            .options
            .iter()
            .enumerate()
            .filter(|(_, t)| self.doc.contains(&t.next))
            .nth(nth)
            .map(|(i, _)| i)
            .ok_or_else(|| ChatflowError::EdgeNotFound(edge_id.to_string()))?;

        let removed = self.step_mut(&source)?.options.remove(index);
        self.refresh(&source);
        Ok(removed)
    }

    /// Deletes a step. Options elsewhere that point to it become dangling;
    /// they are reported, not removed.
    pub fn delete_step(
        &mut self,
        id: &str,
    ) -> Result<Step> {
        trace!("editor::delete_step({})", id);
        self.require(id)?;
        if self.doc.len() == 1 {
            return Err(ChatflowError::LastStep(id.to_string()));
        }

        let removed = self.doc.steps.shift_remove(id).ok_or_else(|| ChatflowError::StepNotFound(id.to_string()))?;
        let first = self.doc.first_id().map(|s| s.to_string());
        if self.doc.start.as_deref() == Some(id) {
            warn!("editor::delete_step: start step {} deleted, start moves to {:?}", id, first);
            self.doc.start = first.clone();
        }
        if self.selected.as_deref() == Some(id) {
            self.selected = first;
        }
        self.rebuild();
        Ok(removed)
    }

    pub fn set_start_step(
        &mut self,
        id: &str,
    ) -> Result<()> {
        trace!("editor::set_start_step({})", id);
        self.require(id)?;
        self.doc.start = Some(id.to_string());
        self.graph.start = Some(id.to_string());
        Ok(())
    }

    fn require(
        &self,
        id: &str,
    ) -> Result<()> {
        if self.doc.contains(id) { Ok(()) } else { Err(ChatflowError::StepNotFound(id.to_string())) }
    }

    fn step_mut(
        &mut self,
        id: &str,
    ) -> Result<&mut Step> {
        self.doc.steps.get_mut(id).ok_or_else(|| ChatflowError::StepNotFound(id.to_string()))
    }

    /// Full re-derivation, needed whenever the set of step ids changes.
    fn rebuild(&mut self) {
        self.graph = flow_to_graph(&self.doc);
        self.report();
    }

    /// Re-derives only the node and outgoing edges of `id`.
    fn refresh(
        &mut self,
        id: &str,
    ) {
        self.graph.refresh_source(&self.doc, id);
        self.report();
    }

    fn report(&self) {
        for d in self.doc.dangling_transitions() {
            warn!("editor: step {} option {} ('{}') points to missing step {}", d.step, d.index, d.keyword, d.next);
        }
    }
}
