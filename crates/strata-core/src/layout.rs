//! # Hierarchical Auto-Layout
//!
//! Layered placement of an ownership graph:
//!
//! 1. **Ranking**: longest path from a node with no incoming edge. A stalled
//!    ranking (cycle) is broken at the lowest-index unranked node, so every
//!    finite input terminates.
//! 2. **Ordering**: one top-down barycenter sweep inside each rank, ties
//!    broken by document order.
//! 3. **Placement**: ranks along the primary axis, centered rows along the
//!    secondary axis.
//! 4. **Handle pass**: each edge picks concrete handles from the geometric
//!    offset between its positioned endpoints, falling back to the
//!    direction-implied sides inside a dead zone.
//!
//! The engine is a pure function of its inputs: nothing here touches a
//! document store.

use crate::primitives::{
    DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, HANDLE_DEAD_ZONE, LAYOUT_MARGIN, NODE_SEP, RANK_SEP,
};
use crate::types::{Edge, HandleId, HandleSide, Node, NodeId, Position, StrataError, Subgraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OPTIONS
// =============================================================================

/// Flow direction of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayoutDirection {
    /// Top to bottom.
    #[default]
    Tb,
    /// Bottom to top.
    Bt,
    /// Left to right.
    Lr,
    /// Right to left.
    Rl,
}

impl LayoutDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LayoutDirection::Tb => "TB",
            LayoutDirection::Bt => "BT",
            LayoutDirection::Lr => "LR",
            LayoutDirection::Rl => "RL",
        }
    }

    /// Ranks advance along y.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, LayoutDirection::Tb | LayoutDirection::Bt)
    }

    /// Ranks advance toward decreasing coordinates.
    #[must_use]
    pub const fn is_reversed(self) -> bool {
        matches!(self, LayoutDirection::Bt | LayoutDirection::Rl)
    }

    /// `(source side, target side)` implied by the direction alone.
    #[must_use]
    pub const fn anchor_sides(self) -> (HandleSide, HandleSide) {
        match self {
            LayoutDirection::Tb => (HandleSide::Bottom, HandleSide::Top),
            LayoutDirection::Bt => (HandleSide::Top, HandleSide::Bottom),
            LayoutDirection::Lr => (HandleSide::Right, HandleSide::Left),
            LayoutDirection::Rl => (HandleSide::Left, HandleSide::Right),
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutDirection {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TB" => Ok(LayoutDirection::Tb),
            "BT" => Ok(LayoutDirection::Bt),
            "LR" => Ok(LayoutDirection::Lr),
            "RL" => Ok(LayoutDirection::Rl),
            _ => Err(StrataError::validation(
                "direction",
                format!("unknown layout direction '{s}'"),
            )),
        }
    }
}

/// Tunables for [`auto_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    pub rank_sep: f64,
    pub node_sep: f64,
    pub margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::Tb,
            node_width: DEFAULT_NODE_WIDTH,
            node_height: DEFAULT_NODE_HEIGHT,
            rank_sep: RANK_SEP,
            node_sep: NODE_SEP,
            margin: LAYOUT_MARGIN,
        }
    }
}

impl LayoutOptions {
    #[must_use]
    pub fn with_direction(direction: LayoutDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// These options with the direction replaced.
    #[must_use]
    pub fn directed(self, direction: LayoutDirection) -> Self {
        Self { direction, ..self }
    }
}

// =============================================================================
// GRAPH INDEX
// =============================================================================

/// Adjacency over node indices. Edges with a missing endpoint are skipped.
struct IndexedGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl IndexedGraph {
    fn build(nodes: &[Node], edges: &[Edge]) -> Self {
        let index: BTreeMap<&NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();
        let mut successors = vec![Vec::new(); nodes.len()];
        let mut predecessors = vec![Vec::new(); nodes.len()];
        for edge in edges {
            if let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) {
                successors[s].push(t);
                predecessors[t].push(s);
            }
        }
        Self {
            successors,
            predecessors,
        }
    }

    fn len(&self) -> usize {
        self.successors.len()
    }
}

// =============================================================================
// CYCLE DETECTION
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnStack,
    Done,
}

/// Whether the edge set contains a directed cycle (self-loops included).
///
/// Iterative depth-first search with an explicit recursion stack, so deep
/// chains cannot overflow the call stack.
#[must_use]
pub fn has_cycle(nodes: &[Node], edges: &[Edge]) -> bool {
    let graph = IndexedGraph::build(nodes, edges);
    let mut state = vec![Visit::Unvisited; graph.len()];

    for root in 0..graph.len() {
        if state[root] != Visit::Unvisited {
            continue;
        }
        // (node, next successor slot to explore)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        state[root] = Visit::OnStack;

        while let Some(frame) = stack.last_mut() {
            let (node, slot) = *frame;
            if let Some(&next) = graph.successors[node].get(slot) {
                frame.1 += 1;
                match state[next] {
                    Visit::OnStack => return true,
                    Visit::Unvisited => {
                        state[next] = Visit::OnStack;
                        stack.push((next, 0));
                    }
                    Visit::Done => {}
                }
            } else {
                state[node] = Visit::Done;
                stack.pop();
            }
        }
    }
    false
}

// =============================================================================
// RANKING
// =============================================================================

/// Longest-path rank of every node, in node order.
#[must_use]
pub fn compute_ranks(nodes: &[Node], edges: &[Edge]) -> Vec<usize> {
    rank_indexed(&IndexedGraph::build(nodes, edges))
}

fn rank_indexed(graph: &IndexedGraph) -> Vec<usize> {
    let n = graph.len();
    let mut rank = vec![0usize; n];
    let mut done = vec![false; n];
    let mut pending: Vec<usize> = graph.predecessors.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut processed = 0;

    while processed < n {
        let Some(node) = queue.pop_front().or_else(|| (0..n).find(|&i| !done[i])) else {
            break;
        };
        if done[node] {
            continue;
        }
        done[node] = true;
        processed += 1;

        for &next in &graph.successors[node] {
            if done[next] {
                continue;
            }
            rank[next] = rank[next].max(rank[node] + 1);
            pending[next] = pending[next].saturating_sub(1);
            if pending[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    rank
}

// =============================================================================
// ORDERING
// =============================================================================

/// Nodes grouped by rank, each rank ordered by predecessor barycenter.
fn order_ranks(graph: &IndexedGraph, rank: &[usize]) -> Vec<Vec<usize>> {
    let depth = rank.iter().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (node, &r) in rank.iter().enumerate() {
        layers[r].push(node);
    }

    let mut slot = vec![0usize; graph.len()];
    for layer in &mut layers {
        let mut keyed: Vec<(f64, usize)> = layer
            .iter()
            .enumerate()
            .map(|(at, &node)| {
                let placed: Vec<f64> = graph.predecessors[node]
                    .iter()
                    .filter(|&&p| rank[p] < rank[node])
                    .map(|&p| slot[p] as f64)
                    .collect();
                let key = if placed.is_empty() {
                    at as f64
                } else {
                    placed.iter().sum::<f64>() / placed.len() as f64
                };
                (key, node)
            })
            .collect();

        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        *layer = keyed.into_iter().map(|(_, node)| node).collect();
        for (at, &node) in layer.iter().enumerate() {
            slot[node] = at;
        }
    }
    layers
}

// =============================================================================
// PLACEMENT
// =============================================================================

fn place(layers: &[Vec<usize>], count: usize, options: &LayoutOptions) -> Vec<Position> {
    let vertical = options.direction.is_vertical();
    let (primary_extent, secondary_extent) = if vertical {
        (options.node_height, options.node_width)
    } else {
        (options.node_width, options.node_height)
    };
    let row_span = |k: usize| {
        if k == 0 {
            0.0
        } else {
            k as f64 * secondary_extent + (k - 1) as f64 * options.node_sep
        }
    };
    let widest = layers.iter().map(|l| row_span(l.len())).fold(0.0, f64::max);
    let last_rank = layers.len().saturating_sub(1);

    let mut positions = vec![Position::default(); count];
    for (r, layer) in layers.iter().enumerate() {
        let step = if options.direction.is_reversed() {
            last_rank - r
        } else {
            r
        };
        let primary = options.margin + step as f64 * (primary_extent + options.rank_sep);
        let offset = options.margin + (widest - row_span(layer.len())) / 2.0;

        for (at, &node) in layer.iter().enumerate() {
            let secondary = offset + at as f64 * (secondary_extent + options.node_sep);
            positions[node] = if vertical {
                Position::new(secondary, primary)
            } else {
                Position::new(primary, secondary)
            };
        }
    }
    positions
}

// =============================================================================
// HANDLE SELECTION
// =============================================================================

/// Concrete `(source, target)` handles for an edge between two placed nodes.
///
/// The dominant axis of the center-to-center offset decides, provided it
/// exceeds the dead zone; otherwise the direction-implied sides are used.
#[must_use]
pub fn select_handles(source: &Node, target: &Node, direction: LayoutDirection) -> (HandleId, HandleId) {
    handles_between(source.center(), target.center(), direction)
}

fn handles_between(from: Position, to: Position, direction: LayoutDirection) -> (HandleId, HandleId) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    let (source_side, target_side) = if dx.abs() > dy.abs() && dx.abs() > HANDLE_DEAD_ZONE {
        if dx > 0.0 {
            (HandleSide::Right, HandleSide::Left)
        } else {
            (HandleSide::Left, HandleSide::Right)
        }
    } else if dy.abs() >= dx.abs() && dy.abs() > HANDLE_DEAD_ZONE {
        if dy > 0.0 {
            (HandleSide::Bottom, HandleSide::Top)
        } else {
            (HandleSide::Top, HandleSide::Bottom)
        }
    } else {
        direction.anchor_sides()
    };
    (HandleId::source(source_side), HandleId::target(target_side))
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Lay out `nodes` and `edges`, returning repositioned copies.
///
/// Zero nodes yields an empty result. A single node is moved to the origin
/// and nothing else changes.
#[must_use]
pub fn auto_layout(nodes: &[Node], edges: &[Edge], options: &LayoutOptions) -> Subgraph {
    match nodes {
        [] => return Subgraph::new(Vec::new(), edges.to_vec()),
        [only] => {
            let mut node = only.clone();
            node.position = Position::default();
            return Subgraph::new(vec![node], edges.to_vec());
        }
        _ => {}
    }

    let graph = IndexedGraph::build(nodes, edges);
    let rank = rank_indexed(&graph);
    let layers = order_ranks(&graph, &rank);
    let positions = place(&layers, nodes.len(), options);
    let (source_side, target_side) = options.direction.anchor_sides();

    let laid_out: Vec<Node> = nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| Node {
            position,
            source_position: Some(source_side),
            target_position: Some(target_side),
            ..node.clone()
        })
        .collect();

    // Handles are chosen against the uniform slots used for placement.
    let centers: BTreeMap<&NodeId, Position> = laid_out
        .iter()
        .map(|n| {
            let center = Position::new(
                n.position.x + options.node_width / 2.0,
                n.position.y + options.node_height / 2.0,
            );
            (&n.id, center)
        })
        .collect();
    let routed: Vec<Edge> = edges
        .iter()
        .map(|edge| {
            let mut edge = edge.clone();
            if let (Some(&s), Some(&t)) = (centers.get(&edge.source), centers.get(&edge.target)) {
                let (source_handle, target_handle) = handles_between(s, t, options.direction);
                edge.source_handle = Some(source_handle);
                edge.target_handle = Some(target_handle);
            }
            edge
        })
        .collect();

    tracing::debug!(
        nodes = laid_out.len(),
        edges = routed.len(),
        ranks = layers.len(),
        direction = %options.direction,
        "auto-layout complete"
    );
    Subgraph::new(laid_out, routed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeId, NodeKind, Size};

    fn node(id: &str) -> Node {
        Node::new(NodeId::new(id), NodeKind::Corporation, Position::new(999.0, 999.0))
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge::new(
            EdgeId::new(format!("{source}-{target}")),
            NodeId::new(source),
            NodeId::new(target),
        )
    }

    fn position(result: &Subgraph, id: &str) -> Position {
        result
            .nodes
            .iter()
            .find(|n| n.id.as_str() == id)
            .expect("node")
            .position
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let result = auto_layout(&[], &[], &LayoutOptions::default());
        assert!(result.is_empty());
    }

    #[test]
    fn single_node_goes_to_origin() {
        let result = auto_layout(&[node("a")], &[], &LayoutOptions::default());
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].position, Position::new(0.0, 0.0));
        assert_eq!(result.nodes[0].source_position, None);
    }

    #[test]
    fn chain_ranks_top_to_bottom() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(position(&result, "a"), Position::new(20.0, 20.0));
        assert_eq!(position(&result, "b"), Position::new(20.0, 220.0));
        assert_eq!(position(&result, "c"), Position::new(20.0, 420.0));
        for node in &result.nodes {
            assert_eq!(node.source_position, Some(HandleSide::Bottom));
            assert_eq!(node.target_position, Some(HandleSide::Top));
        }
        for edge in &result.edges {
            assert_eq!(edge.source_handle, Some(HandleId::source(HandleSide::Bottom)));
            assert_eq!(edge.target_handle, Some(HandleId::target(HandleSide::Top)));
        }
    }

    #[test]
    fn bottom_to_top_flips_ranks() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::with_direction(LayoutDirection::Bt));
        assert!(position(&result, "a").y > position(&result, "b").y);
        assert_eq!(result.edges[0].source_handle, Some(HandleId::source(HandleSide::Top)));
    }

    #[test]
    fn left_to_right_uses_x_for_ranks() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::with_direction(LayoutDirection::Lr));
        assert_eq!(position(&result, "a"), Position::new(20.0, 20.0));
        assert_eq!(position(&result, "b"), Position::new(320.0, 20.0));
        assert_eq!(result.edges[0].source_handle, Some(HandleId::source(HandleSide::Right)));
        assert_eq!(result.edges[0].target_handle, Some(HandleId::target(HandleSide::Left)));
    }

    #[test]
    fn siblings_share_a_centered_rank() {
        let nodes = vec![node("parent"), node("left"), node("right")];
        let edges = vec![edge("parent", "left"), edge("parent", "right")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());

        let left = position(&result, "left");
        let right = position(&result, "right");
        assert_eq!(left.y, right.y);
        assert_eq!(right.x - left.x, 350.0);
        // parent centered over a 550 wide row
        assert_eq!(position(&result, "parent").x, 20.0 + 175.0);
    }

    #[test]
    fn sibling_edges_pick_geometric_handles() {
        let nodes = vec![node("parent"), node("left"), node("right")];
        let edges = vec![edge("parent", "left"), edge("parent", "right")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());

        // horizontal offset 175 < vertical offset 200, vertical wins
        for edge in &result.edges {
            assert_eq!(edge.source_handle, Some(HandleId::source(HandleSide::Bottom)));
        }
    }

    #[test]
    fn directed_keeps_other_tunables() {
        let options = LayoutOptions {
            rank_sep: 40.0,
            ..LayoutOptions::default()
        }
        .directed(LayoutDirection::Rl);
        assert_eq!(options.direction, LayoutDirection::Rl);
        assert_eq!(options.rank_sep, 40.0);
        assert_eq!(options.node_width, LayoutOptions::default().node_width);
    }

    #[test]
    fn handles_follow_slot_geometry_not_node_size() {
        let mut wide = node("wide");
        wide.size = Some(Size::new(1000.0, 100.0));
        let nodes = vec![wide, node("child")];
        let edges = vec![edge("wide", "child")];
        let options = LayoutOptions {
            node_width: 300.0,
            ..LayoutOptions::default()
        };
        let result = auto_layout(&nodes, &edges, &options);

        // Both slots share a column, so the edge runs straight down.
        assert_eq!(result.nodes[0].position.x, result.nodes[1].position.x);
        assert_eq!(result.edges[0].source_handle, Some(HandleId::source(HandleSide::Bottom)));
        assert_eq!(result.edges[0].target_handle, Some(HandleId::target(HandleSide::Top)));
    }

    #[test]
    fn handles_fall_back_inside_dead_zone() {
        let mut a = node("a");
        let mut b = node("b");
        a.position = Position::new(0.0, 0.0);
        b.position = Position::new(30.0, 20.0);
        let (s, t) = select_handles(&a, &b, LayoutDirection::Lr);
        assert_eq!(s, HandleId::source(HandleSide::Right));
        assert_eq!(t, HandleId::target(HandleSide::Left));
    }

    #[test]
    fn handles_point_backward_when_target_is_left() {
        let mut a = node("a");
        let mut b = node("b");
        a.position = Position::new(400.0, 0.0);
        b.position = Position::new(0.0, 10.0);
        let (s, t) = select_handles(&a, &b, LayoutDirection::Tb);
        assert_eq!(s, HandleId::source(HandleSide::Left));
        assert_eq!(t, HandleId::target(HandleSide::Right));
    }

    #[test]
    fn cycle_detector_finds_two_cycle() {
        let nodes = vec![node("a"), node("b")];
        assert!(has_cycle(&nodes, &[edge("a", "b"), edge("b", "a")]));
    }

    #[test]
    fn cycle_detector_accepts_chain() {
        let nodes = vec![node("a"), node("b"), node("c")];
        assert!(!has_cycle(&nodes, &[edge("a", "b"), edge("b", "c")]));
    }

    #[test]
    fn cycle_detector_finds_self_loop() {
        assert!(has_cycle(&[node("a")], &[edge("a", "a")]));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")];
        assert!(!has_cycle(&nodes, &edges));
        assert_eq!(compute_ranks(&nodes, &edges), vec![0, 1, 1, 2]);
    }

    #[test]
    fn cyclic_input_still_terminates() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let ranks = compute_ranks(&nodes, &edges);
        assert_eq!(ranks, vec![0, 1, 2]);
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());
        assert_eq!(result.nodes.len(), 3);
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "c"), edge("a", "b"), edge("b", "c")];
        assert_eq!(compute_ranks(&nodes, &edges), vec![0, 1, 2]);
    }

    #[test]
    fn dangling_edges_are_left_untouched() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "ghost")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());
        assert_eq!(result.edges[0].source_handle, None);
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("lr".parse::<LayoutDirection>().ok(), Some(LayoutDirection::Lr));
        assert!("diagonal".parse::<LayoutDirection>().is_err());
    }
}
