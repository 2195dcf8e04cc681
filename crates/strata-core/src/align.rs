//! # Alignment and Distribution
//!
//! Geometric snapping of the selected nodes.
//!
//! Alignment needs at least two selected nodes, distribution at least three;
//! below that both are no-ops that leave the document untouched. Nodes
//! without an explicit size use the default dimensions.

use crate::document::DocumentStore;
use crate::types::{Node, NodeId, Position, StrataError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OPERATION KINDS
// =============================================================================

/// Edge or center line the selection snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignType {
    Left,
    Right,
    Top,
    Bottom,
    /// Shared vertical center line (x axis).
    CenterHorizontal,
    /// Shared horizontal center line (y axis).
    CenterVertical,
}

impl AlignType {
    pub const ALL: [AlignType; 6] = [
        AlignType::Left,
        AlignType::Right,
        AlignType::Top,
        AlignType::Bottom,
        AlignType::CenterHorizontal,
        AlignType::CenterVertical,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AlignType::Left => "left",
            AlignType::Right => "right",
            AlignType::Top => "top",
            AlignType::Bottom => "bottom",
            AlignType::CenterHorizontal => "center-horizontal",
            AlignType::CenterVertical => "center-vertical",
        }
    }
}

impl fmt::Display for AlignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignType {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlignType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StrataError::validation("align", format!("unknown alignment '{s}'")))
    }
}

/// Axis along which the selection is spaced out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributeAxis {
    Horizontal,
    Vertical,
}

impl DistributeAxis {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DistributeAxis::Horizontal => "horizontal",
            DistributeAxis::Vertical => "vertical",
        }
    }
}

impl fmt::Display for DistributeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributeAxis {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(DistributeAxis::Horizontal),
            "vertical" => Ok(DistributeAxis::Vertical),
            _ => Err(StrataError::validation(
                "axis",
                format!("unknown distribution axis '{s}'"),
            )),
        }
    }
}

// =============================================================================
// POSITION COMPUTATION
// =============================================================================

/// New positions for `nodes` aligned by `ty`. Fewer than two nodes yields nothing.
#[must_use]
pub fn aligned_positions(nodes: &[&Node], ty: AlignType) -> Vec<(NodeId, Position)> {
    if nodes.len() < 2 {
        return Vec::new();
    }
    let count = nodes.len() as f64;

    let fold_min = |f: fn(&Node) -> f64| nodes.iter().map(|n| f(n)).fold(f64::INFINITY, f64::min);
    let fold_max =
        |f: fn(&Node) -> f64| nodes.iter().map(|n| f(n)).fold(f64::NEG_INFINITY, f64::max);

    match ty {
        AlignType::Left => {
            let x = fold_min(|n| n.position.x);
            place(nodes, |n| Position::new(x, n.position.y))
        }
        AlignType::Right => {
            let right = fold_max(|n| n.position.x + n.width());
            place(nodes, |n| Position::new(right - n.width(), n.position.y))
        }
        AlignType::Top => {
            let y = fold_min(|n| n.position.y);
            place(nodes, |n| Position::new(n.position.x, y))
        }
        AlignType::Bottom => {
            let bottom = fold_max(|n| n.position.y + n.height());
            place(nodes, |n| Position::new(n.position.x, bottom - n.height()))
        }
        AlignType::CenterHorizontal => {
            let center = nodes.iter().map(|n| n.center().x).sum::<f64>() / count;
            place(nodes, |n| Position::new(center - n.width() / 2.0, n.position.y))
        }
        AlignType::CenterVertical => {
            let center = nodes.iter().map(|n| n.center().y).sum::<f64>() / count;
            place(nodes, |n| Position::new(n.position.x, center - n.height() / 2.0))
        }
    }
}

fn place<F>(nodes: &[&Node], f: F) -> Vec<(NodeId, Position)>
where
    F: Fn(&Node) -> Position,
{
    nodes.iter().map(|n| (n.id.clone(), f(n))).collect()
}

/// New positions for `nodes` evenly spaced along `axis`.
///
/// Nodes are sorted by their start coordinate; the first and last stay put.
/// The free gap is `(last.start - (first.start + first.extent)) / (n - 1)`
/// and each interior node starts one gap after the previous node's end. A
/// negative gap (overlapping span) is applied as computed.
#[must_use]
pub fn distributed_positions(nodes: &[&Node], axis: DistributeAxis) -> Vec<(NodeId, Position)> {
    if nodes.len() < 3 {
        return Vec::new();
    }

    let start = |n: &Node| match axis {
        DistributeAxis::Horizontal => n.position.x,
        DistributeAxis::Vertical => n.position.y,
    };
    let extent = |n: &Node| match axis {
        DistributeAxis::Horizontal => n.width(),
        DistributeAxis::Vertical => n.height(),
    };

    let mut sorted: Vec<&Node> = nodes.to_vec();
    sorted.sort_by(|a, b| start(a).total_cmp(&start(b)));

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let gap = (start(last) - (start(first) + extent(first))) / (sorted.len() - 1) as f64;

    let mut result = Vec::with_capacity(sorted.len() - 2);
    let mut cursor = start(first) + extent(first);
    for node in &sorted[1..sorted.len() - 1] {
        let at = cursor + gap;
        let position = match axis {
            DistributeAxis::Horizontal => Position::new(at, node.position.y),
            DistributeAxis::Vertical => Position::new(node.position.x, at),
        };
        result.push((node.id.clone(), position));
        cursor = at + extent(node);
    }
    result
}

// =============================================================================
// STORE OPERATIONS
// =============================================================================

/// Align the selected nodes. Returns `false` with fewer than two selected.
pub fn align(store: &mut DocumentStore, ty: AlignType) -> bool {
    let selected: Vec<&Node> = store.selected_nodes().collect();
    let moves = aligned_positions(&selected, ty);
    apply_moves(store, moves)
}

/// Distribute the selected nodes. Returns `false` with fewer than three selected.
pub fn distribute(store: &mut DocumentStore, axis: DistributeAxis) -> bool {
    let selected: Vec<&Node> = store.selected_nodes().collect();
    let moves = distributed_positions(&selected, axis);
    apply_moves(store, moves)
}

fn apply_moves(store: &mut DocumentStore, moves: Vec<(NodeId, Position)>) -> bool {
    if moves.is_empty() {
        return false;
    }
    let moves: BTreeMap<NodeId, Position> = moves.into_iter().collect();
    store.update_nodes(|nodes| {
        for node in nodes.iter_mut() {
            if let Some(position) = moves.get(&node.id) {
                node.position = *position;
            }
        }
    });
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, Size};

    fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> Node {
        let mut node = Node::new(NodeId::new(id), NodeKind::Corporation, Position::new(x, y));
        node.size = Some(Size::new(width, height));
        node.selected = true;
        node
    }

    fn store_with(nodes: Vec<Node>) -> DocumentStore {
        let mut store = DocumentStore::new("align");
        store.set_nodes(nodes);
        store
    }

    fn position_of(store: &DocumentStore, id: &str) -> Position {
        store.node(&NodeId::new(id)).expect("node").position
    }

    #[test]
    fn align_left_uses_minimum_x() {
        let mut store = store_with(vec![
            node("a", 100.0, 0.0, 200.0, 100.0),
            node("b", 40.0, 50.0, 120.0, 100.0),
        ]);
        assert!(align(&mut store, AlignType::Left));
        assert_eq!(position_of(&store, "a").x, 40.0);
        assert_eq!(position_of(&store, "b").x, 40.0);
        assert_eq!(position_of(&store, "b").y, 50.0);
    }

    #[test]
    fn align_right_matches_right_edges() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 50.0, 0.0, 100.0, 100.0),
        ]);
        assert!(align(&mut store, AlignType::Right));
        assert_eq!(position_of(&store, "a").x, 0.0);
        assert_eq!(position_of(&store, "b").x, 100.0);
    }

    #[test]
    fn align_bottom_matches_bottom_edges() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 0.0, 10.0, 200.0, 40.0),
        ]);
        assert!(align(&mut store, AlignType::Bottom));
        assert_eq!(position_of(&store, "b").y, 60.0);
    }

    #[test]
    fn align_center_horizontal_uses_mean_center() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 200.0, 0.0, 100.0, 100.0),
        ]);
        // centers 100 and 250, mean 175
        assert!(align(&mut store, AlignType::CenterHorizontal));
        assert_eq!(position_of(&store, "a").x, 75.0);
        assert_eq!(position_of(&store, "b").x, 125.0);
    }

    #[test]
    fn align_center_vertical_uses_mean_center() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 0.0, 100.0, 200.0, 100.0),
        ]);
        assert!(align(&mut store, AlignType::CenterVertical));
        assert_eq!(position_of(&store, "a").y, 50.0);
        assert_eq!(position_of(&store, "b").y, 50.0);
    }

    #[test]
    fn align_needs_two_nodes() {
        let mut store = store_with(vec![node("a", 10.0, 10.0, 200.0, 100.0)]);
        store.take_change();
        let revision = store.revision();
        assert!(!align(&mut store, AlignType::Top));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn distribute_horizontal_spaces_interior_nodes() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 100.0, 50.0),
            node("b", 500.0, 0.0, 100.0, 50.0),
            node("c", 140.0, 0.0, 100.0, 50.0),
        ]);
        assert!(distribute(&mut store, DistributeAxis::Horizontal));
        // gap = (500 - (0 + 100)) / 2 = 200; b moves to 100 + 200 = 300
        assert_eq!(position_of(&store, "a").x, 0.0);
        assert_eq!(position_of(&store, "c").x, 300.0);
        assert_eq!(position_of(&store, "b").x, 500.0);
    }

    #[test]
    fn distribute_three_default_width_nodes() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 100.0, 0.0, 200.0, 100.0),
            node("c", 500.0, 0.0, 200.0, 100.0),
        ]);
        assert!(distribute(&mut store, DistributeAxis::Horizontal));
        assert_eq!(position_of(&store, "b").x, 350.0);
    }

    #[test]
    fn distribute_keeps_negative_gap() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 0.0, 50.0, 200.0, 100.0),
            node("c", 0.0, 60.0, 200.0, 100.0),
        ]);
        assert!(distribute(&mut store, DistributeAxis::Vertical));
        // gap = (60 - 100) / 2 = -20
        assert_eq!(position_of(&store, "b").y, 80.0);
        assert_eq!(position_of(&store, "c").y, 60.0);
    }

    #[test]
    fn distribute_equal_width_nodes() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 50.0, 50.0),
            node("b", 100.0, 0.0, 50.0, 50.0),
            node("c", 500.0, 0.0, 50.0, 50.0),
        ]);
        assert!(distribute(&mut store, DistributeAxis::Horizontal));
        assert_eq!(position_of(&store, "a").x, 0.0);
        assert_eq!(position_of(&store, "b").x, 275.0);
        assert_eq!(position_of(&store, "c").x, 500.0);
    }

    #[test]
    fn distribute_needs_three_nodes() {
        let mut store = store_with(vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 400.0, 0.0, 200.0, 100.0),
        ]);
        assert!(!distribute(&mut store, DistributeAxis::Horizontal));
    }

    #[test]
    fn parse_align_type_names() {
        for ty in AlignType::ALL {
            assert_eq!(ty.as_str().parse::<AlignType>().ok(), Some(ty));
        }
        assert!("middle".parse::<AlignType>().is_err());
    }
}
