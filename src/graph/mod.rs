//! Visual graph representation of a flow document.
//!
//! The graph is derived, never stored: nodes carry the step data plus a
//! layout position, edges exist only for transitions whose target resolves.

mod convert;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{FlowDocument, StepId, StepKind, Transition};

pub use convert::{flow_to_graph, graph_to_flow};

/// Unique identifier for an edge within a graph.
pub type EdgeId = String;

/// Top-left corner of the layout grid.
pub const GRID_ORIGIN: f32 = 50.0;
/// Horizontal distance between grid columns.
pub const GRID_COLUMN_SPACING: f32 = 250.0;
/// Vertical distance between grid rows.
pub const GRID_ROW_SPACING: f32 = 150.0;
/// Number of nodes per grid row.
pub const NODES_PER_ROW: usize = 3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Grid slot for the node at `index` in document order.
    pub fn grid(index: usize) -> Self {
        Self {
            x: GRID_ORIGIN + (index % NODES_PER_ROW) as f32 * GRID_COLUMN_SPACING,
            y: GRID_ORIGIN + (index / NODES_PER_ROW) as f32 * GRID_ROW_SPACING,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// step id
    pub id: StepId,
    /// display label, the step id
    pub label: String,
    pub kind: StepKind,
    pub message: String,
    /// every option of the step, dangling ones included
    pub options: Vec<Transition>,
    pub position: Position,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: StepId,
    pub target: StepId,
    /// keyword of the transition, shown as the edge label
    pub keyword: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    /// start step, carried so the graph converts back losslessly
    pub start: Option<StepId>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Builds `source-target-keyword`, suffixed with `#n` when already taken.
pub(crate) fn unique_edge_id(
    source: &str,
    target: &str,
    keyword: &str,
    taken: &HashSet<EdgeId>,
) -> EdgeId {
    let base = format!("{}-{}-{}", source, target, keyword);
    if !taken.contains(&base) {
        return base;
    }
    (2..).map(|n| format!("{}#{}", base, n)).find(|id| !taken.contains(id)).unwrap_or(base)
}

impl GraphModel {
    pub fn node(
        &self,
        id: &str,
    ) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(
        &self,
        id: &str,
    ) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Edges leaving `id`, in option order.
    pub fn outgoing(
        &self,
        id: &str,
    ) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    /// Recomputes the node data and the outgoing edges of one step.
    ///
    /// Edges from other sources keep their ids and order.
    pub(crate) fn refresh_source(
        &mut self,
        doc: &FlowDocument,
        id: &str,
    ) {
        let Some(step) = doc.step(id) else {
            return;
        };
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.kind = step.kind;
            node.message = step.message.clone();
            node.options = step.options.clone();
        }

        self.edges.retain(|e| e.source != id);
        let mut taken: HashSet<EdgeId> = self.edges.iter().map(|e| e.id.clone()).collect();
        for t in step.options.iter().filter(|t| doc.contains(&t.next)) {
            let edge_id = unique_edge_id(id, &t.next, &t.keyword, &taken);
            taken.insert(edge_id.clone());
            self.edges.push(GraphEdge {
                id: edge_id,
                source: id.to_string(),
                target: t.next.clone(),
                keyword: t.keyword.clone(),
            });
        }
    }

    /// Output a human-readable representation of the graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Flow Graph ===".to_string());
        lines.push(format!(
            "Start: {}, Nodes: {}, Edges: {}",
            self.start.as_deref().unwrap_or("(none)"),
            self.nodes.len(),
            self.edges.len()
        ));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for node in self.nodes.iter() {
            lines.push(format!("[{}] {} (type: {}, options: {})", node.id, node.message, node.kind.as_ref(), node.options.len()));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in self.edges.iter() {
            lines.push(format!("{} --[{}]--> {} (id: {})", edge.source, edge.keyword, edge.target, edge.id));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for node in self.nodes.iter() {
            let outgoing: Vec<String> = self.outgoing(&node.id).iter().map(|e| format!("{}({})", e.target, e.keyword)).collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}
