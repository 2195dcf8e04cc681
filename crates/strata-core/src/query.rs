//! # Query Module
//!
//! Read-only lineage questions asked of a document.
//!
//! - Upstream: everything a node leads to, following edges forward
//! - Downstream: everything that leads to a node (impact analysis)
//! - Search: case-insensitive text match on labels and notes
//!
//! Results are detached [`Subgraph`]s holding the matching nodes and only the
//! edges whose endpoints are both in the result.

use crate::document::DiagramDocument;
use crate::types::{Edge, NodeId, Subgraph};
use std::collections::{BTreeSet, VecDeque};

/// Query operation types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    /// Follow edges forward from `start`, optionally bounded by depth.
    Upstream { start: NodeId, depth: Option<usize> },

    /// Follow edges backward from `start`, optionally bounded by depth.
    Downstream { start: NodeId, depth: Option<usize> },

    /// Nodes whose label or notes contain the text.
    Search(String),
}

/// A structured query against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub query_type: QueryType,
}

impl Query {
    #[must_use]
    pub fn new(query_type: QueryType) -> Self {
        Self { query_type }
    }

    /// Unbounded upstream helper.
    #[must_use]
    pub fn upstream(start: NodeId) -> Self {
        Self::new(QueryType::Upstream { start, depth: None })
    }

    /// Unbounded downstream helper.
    #[must_use]
    pub fn downstream(start: NodeId) -> Self {
        Self::new(QueryType::Downstream { start, depth: None })
    }

    /// Search helper.
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self::new(QueryType::Search(text.into()))
    }

    /// Limit a traversal query to `depth` hops. No effect on search.
    #[must_use]
    pub fn with_depth(mut self, limit: usize) -> Self {
        match &mut self.query_type {
            QueryType::Upstream { depth, .. } | QueryType::Downstream { depth, .. } => {
                *depth = Some(limit);
            }
            QueryType::Search(_) => {}
        }
        self
    }

    /// Run the query. A missing start node yields an empty result.
    #[must_use]
    pub fn execute(&self, doc: &DiagramDocument) -> Subgraph {
        let keep = match &self.query_type {
            QueryType::Upstream { start, depth } => {
                reachable(doc, start, *depth, |e| (&e.source, &e.target))
            }
            QueryType::Downstream { start, depth } => {
                reachable(doc, start, *depth, |e| (&e.target, &e.source))
            }
            QueryType::Search(text) => {
                let needle = text.to_lowercase();
                doc.nodes
                    .iter()
                    .filter(|n| {
                        n.data.label.to_lowercase().contains(&needle)
                            || n.data
                                .notes
                                .as_ref()
                                .is_some_and(|notes| notes.to_lowercase().contains(&needle))
                    })
                    .map(|n| n.id.clone())
                    .collect()
            }
        };
        filter(doc, &keep)
    }
}

/// Breadth-first reachability from `start`. `step` orients an edge as
/// `(from, to)`.
fn reachable<F>(
    doc: &DiagramDocument,
    start: &NodeId,
    depth: Option<usize>,
    step: F,
) -> BTreeSet<NodeId>
where
    F: Fn(&Edge) -> (&NodeId, &NodeId),
{
    let mut visited = BTreeSet::new();
    if doc.node(start).is_none() {
        return visited;
    }

    let mut queue = VecDeque::from([(start.clone(), 0usize)]);
    visited.insert(start.clone());
    while let Some((current, hops)) = queue.pop_front() {
        if depth.is_some_and(|limit| hops >= limit) {
            continue;
        }
        for edge in &doc.edges {
            let (from, to) = step(edge);
            if from == &current && !visited.contains(to) {
                visited.insert(to.clone());
                queue.push_back((to.clone(), hops + 1));
            }
        }
    }
    visited
}

fn filter(doc: &DiagramDocument, keep: &BTreeSet<NodeId>) -> Subgraph {
    let nodes = doc
        .nodes
        .iter()
        .filter(|n| keep.contains(&n.id))
        .cloned()
        .collect();
    let edges = doc
        .edges
        .iter()
        .filter(|e| keep.contains(&e.source) && keep.contains(&e.target))
        .cloned()
        .collect();
    Subgraph::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use crate::types::{NodeDataPatch, NodeKind, Position};

    /// holdco -> opco -> sub, investor -> holdco, unrelated
    fn ownership_chart() -> (DocumentStore, Vec<NodeId>) {
        let mut store = DocumentStore::new("chart");
        let ids: Vec<NodeId> = ["Holdco", "Opco", "Sub", "Investor", "Unrelated"]
            .iter()
            .map(|label| {
                let id = store.add_node(NodeKind::Corporation, Position::default()).id;
                store.update_node(
                    &id,
                    &NodeDataPatch {
                        label: Some((*label).to_string()),
                        ..NodeDataPatch::default()
                    },
                );
                id
            })
            .collect();
        store.add_edge(&ids[0], &ids[1]).expect("holdco-opco");
        store.add_edge(&ids[1], &ids[2]).expect("opco-sub");
        store.add_edge(&ids[3], &ids[0]).expect("investor-holdco");
        (store, ids)
    }

    fn labels(result: &Subgraph) -> Vec<&str> {
        result.nodes.iter().map(|n| n.data.label.as_str()).collect()
    }

    #[test]
    fn upstream_follows_edges_forward() {
        let (store, ids) = ownership_chart();
        let result = Query::upstream(ids[0].clone()).execute(store.document());
        assert_eq!(labels(&result), vec!["Holdco", "Opco", "Sub"]);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn downstream_follows_edges_backward() {
        let (store, ids) = ownership_chart();
        let result = Query::downstream(ids[1].clone()).execute(store.document());
        assert_eq!(labels(&result), vec!["Holdco", "Opco", "Investor"]);
    }

    #[test]
    fn depth_limits_traversal() {
        let (store, ids) = ownership_chart();
        let result = Query::upstream(ids[3].clone())
            .with_depth(1)
            .execute(store.document());
        assert_eq!(labels(&result), vec!["Holdco", "Investor"]);
    }

    #[test]
    fn missing_start_yields_empty() {
        let (store, _) = ownership_chart();
        let result = Query::upstream(NodeId::new("ghost")).execute(store.document());
        assert!(result.is_empty());
    }

    #[test]
    fn search_matches_labels_and_notes() {
        let (mut store, ids) = ownership_chart();
        store.update_node(
            &ids[4],
            &NodeDataPatch {
                notes: Some("Dormant OPCO shell".into()),
                ..NodeDataPatch::default()
            },
        );
        let result = Query::search("opco").execute(store.document());
        assert_eq!(labels(&result), vec!["Opco", "Unrelated"]);
    }

    #[test]
    fn traversal_terminates_on_cycles() {
        let (mut store, ids) = ownership_chart();
        store.add_edge(&ids[2], &ids[0]).expect("sub-holdco");
        let result = Query::upstream(ids[0].clone()).execute(store.document());
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 3);
    }
}
