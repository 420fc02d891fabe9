//! Conversion between the keyed flow document and the node/edge graph.
//!
//! `graph_to_flow(flow_to_graph(doc))` reproduces every step and every
//! transition whose target exists. Dangling transitions have no edge, so
//! they do not survive the round trip.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use crate::{
    graph::{EdgeId, GraphEdge, GraphModel, GraphNode, Position, unique_edge_id},
    model::{FlowDocument, Step, StepId, Transition},
};

/// Derives the graph view of a document.
pub fn flow_to_graph(doc: &FlowDocument) -> GraphModel {
    let mut nodes = Vec::with_capacity(doc.len());
    let mut edges = Vec::new();
    let mut taken: HashSet<EdgeId> = HashSet::new();

    for (index, (id, step)) in doc.steps().enumerate() {
        nodes.push(GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            kind: step.kind,
            message: step.message.clone(),
            options: step.options.clone(),
            position: Position::grid(index),
        });

        for t in step.options.iter() {
            if !doc.contains(&t.next) {
                trace!("graph::flow_to_graph: hiding dangling transition {} --[{}]--> {}", id, t.keyword, t.next);
                continue;
            }
            let edge_id = unique_edge_id(id, &t.next, &t.keyword, &taken);
            taken.insert(edge_id.clone());
            edges.push(GraphEdge {
                id: edge_id,
                source: id.to_string(),
                target: t.next.clone(),
                keyword: t.keyword.clone(),
            });
        }
    }

    GraphModel {
        start: doc.start().map(|s| s.to_string()),
        nodes,
        edges,
    }
}

/// Reduces a graph back to a document.
///
/// Each step's options are rebuilt from the edges leaving its node, in edge
/// order; the `options` carried on node data are ignored.
pub fn graph_to_flow(graph: &GraphModel) -> FlowDocument {
    let mut steps: IndexMap<StepId, Step> = graph
        .nodes
        .iter()
        .map(|node| {
            (
                node.id.clone(),
                Step {
                    kind: node.kind,
                    message: node.message.clone(),
                    options: Vec::new(),
                },
            )
        })
        .collect();

    for edge in graph.edges.iter() {
        if !steps.contains_key(&edge.target) {
            trace!("graph::graph_to_flow: skipping edge {} with unknown target {}", edge.id, edge.target);
            continue;
        }
        if let Some(step) = steps.get_mut(&edge.source) {
            step.options.push(Transition::new(edge.keyword.clone(), edge.target.clone()));
        }
    }

    FlowDocument {
        start: graph.start.clone(),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::StepKind;

    fn scenario() -> FlowDocument {
        FlowDocument::new().with_step("A", Step::new("Hi").with_option("1", "B")).with_step("B", Step::new("Bye"))
    }

    fn option_set(step: &Step) -> HashSet<Transition> {
        step.options.iter().cloned().collect()
    }

    #[test]
    fn test_flow_to_graph() {
        let graph = flow_to_graph(&scenario());
        assert_eq!(graph.start.as_deref(), Some("A"));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].label, "A");
        assert_eq!(graph.nodes[1].position, Position { x: 300.0, y: 50.0 });
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                id: "A-B-1".into(),
                source: "A".into(),
                target: "B".into(),
                keyword: "1".into(),
            }]
        );
    }

    #[test]
    fn test_round_trip() {
        let doc = FlowDocument::new()
            .with_step("menu", Step::new("1 billing, 2 support").with_option("1", "billing").with_option("2", "support").with_option("menu", "menu"))
            .with_step("billing", Step::new("Invoice sent").with_kind(StepKind::Action).with_option("back", "menu"))
            .with_step("support", Step::new("Describe the issue").with_option("done", "bye").with_option("back", "menu"))
            .with_step("bye", Step::new("Bye"))
            .with_start("menu");

        let back = graph_to_flow(&flow_to_graph(&doc));

        assert_eq!(back.start(), doc.start());
        assert_eq!(back.ids().collect::<Vec<_>>(), doc.ids().collect::<Vec<_>>());
        for (id, step) in doc.steps() {
            let other = back.step(id).unwrap();
            assert_eq!(other.message, step.message);
            assert_eq!(other.kind, step.kind);
            assert_eq!(option_set(other), option_set(step));
        }
        // edges are emitted in option order, so the lists match too
        assert_eq!(back, doc);
    }

    #[test]
    fn test_dangling_dropped_by_round_trip() {
        let doc = FlowDocument::new()
            .with_step("A", Step::new("Hi").with_option("1", "B").with_option("2", "missing"))
            .with_step("B", Step::new("Bye"));

        let graph = flow_to_graph(&doc);
        assert_eq!(graph.outgoing("A").len(), 1);
        // node data still shows the dangling option
        assert_eq!(graph.node("A").unwrap().options.len(), 2);

        let back = graph_to_flow(&graph);
        assert_eq!(back.step("A").unwrap().options, vec![Transition::new("1", "B")]);
        assert!(back.dangling_transitions().is_empty());
    }

    #[test]
    fn test_edge_identity_includes_keyword() {
        let doc = FlowDocument::new()
            .with_step("A", Step::new("Hi").with_option("yes", "B").with_option("y", "B").with_option("no", "C"))
            .with_step("B", Step::new("b"))
            .with_step("C", Step::new("c"));
        let graph = flow_to_graph(&doc);

        let ids: Vec<_> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A-B-yes", "A-B-y", "A-C-no"]);
    }

    #[test]
    fn test_edge_identity_across_sources() {
        // "a-b" -> "c" and "a" -> "b-c" both render as a-b-c-k
        let doc = FlowDocument::new()
            .with_step("a-b", Step::new("x").with_option("k", "c"))
            .with_step("a", Step::new("y").with_option("k", "b-c"))
            .with_step("c", Step::new("c"))
            .with_step("b-c", Step::new("bc"));
        let graph = flow_to_graph(&doc);

        let ids: HashSet<_> = graph.edges.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(graph.edges[1].id, "a-b-c-k#2");
        assert_eq!(graph_to_flow(&graph), doc);
    }

    #[test]
    fn test_duplicate_transitions_get_distinct_edges() {
        let doc = FlowDocument::new().with_step("A", Step::new("Hi").with_option("1", "A").with_option("1", "A"));
        let graph = flow_to_graph(&doc);
        assert_eq!(graph.edges[0].id, "A-A-1");
        assert_eq!(graph.edges[1].id, "A-A-1#2");
        assert_eq!(graph_to_flow(&graph), doc);
    }

    #[test]
    fn test_empty_options_omitted() {
        let mut graph = flow_to_graph(&scenario());
        graph.edges.clear();
        let json = graph_to_flow(&graph).to_json().unwrap();
        assert!(!json.contains("options"));
    }

    #[test]
    fn test_graph_edges_added_in_view() {
        let mut graph = flow_to_graph(&scenario());
        graph.edges.push(GraphEdge {
            id: "B-A-again".into(),
            source: "B".into(),
            target: "A".into(),
            keyword: "again".into(),
        });
        graph.edges.push(GraphEdge {
            id: "B-nowhere-x".into(),
            source: "B".into(),
            target: "nowhere".into(),
            keyword: "x".into(),
        });

        let doc = graph_to_flow(&graph);
        assert_eq!(doc.step("B").unwrap().options, vec![Transition::new("again", "A")]);
    }
}
