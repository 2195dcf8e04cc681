//! # Behavior Tier Tests (B0-B4)
//!
//! End-to-end checks of the editing core through its public API.
//!
//! ## Tiers
//! - B0: History round-trips
//! - B1: Clipboard remapping
//! - B2: Alignment and distribution
//! - B3: Layout and cycle detection
//! - B4: Persistence

use strata_core::{
    AlignType, DistributeAxis, Editor, LayoutOptions, MemoryStorage, Node, NodeId, NodeKind,
    Persistence, Position, Size,
};

fn editor_with_selected(xs: &[f64], width: f64) -> (Editor, Vec<NodeId>) {
    let mut editor = Editor::new("tiers");
    let ids: Vec<NodeId> = xs
        .iter()
        .map(|&x| editor.add_node(NodeKind::Corporation, Position::new(x, 0.0)).id)
        .collect();
    let sized: Vec<Node> = editor
        .document()
        .nodes
        .iter()
        .map(|n| Node {
            size: Some(Size::new(width, 100.0)),
            ..n.clone()
        })
        .collect();
    let mut doc = editor.document().clone();
    doc.nodes = sized;
    editor.open(doc);
    editor.select_nodes(&ids);
    (editor, ids)
}

fn x_of(editor: &Editor, id: &NodeId) -> f64 {
    editor.store().node(id).expect("node").position.x
}

// =============================================================================
// TIER B0: HISTORY
// =============================================================================

mod b0_history {
    use super::*;

    /// B0.1: n mutations followed by n undos restore the starting state.
    #[test]
    fn undo_round_trip() {
        let mut editor = Editor::new("history");
        let before = editor.document().clone();

        let a = editor.add_node(NodeKind::Trust, Position::default());
        let b = editor.add_node(NodeKind::Individual, Position::new(0.0, 200.0));
        editor.add_edge(&a.id, &b.id).expect("edge");
        editor.move_node(&a.id, Position::new(300.0, 0.0));
        editor.delete_node(&b.id);

        for _ in 0..5 {
            assert!(editor.undo());
        }
        assert_eq!(editor.document().nodes, before.nodes);
        assert_eq!(editor.document().edges, before.edges);
    }

    /// B0.2: Exhausted stacks report false and leave state unchanged.
    #[test]
    fn exhausted_stacks_are_noops() {
        let mut editor = Editor::new("history");
        editor.add_node(NodeKind::Fund, Position::default());
        let snapshot = editor.document().nodes.clone();

        assert!(!editor.redo());
        assert_eq!(editor.document().nodes, snapshot);

        assert!(editor.undo());
        assert!(!editor.undo());
        assert!(editor.document().nodes.is_empty());
    }

    /// B0.3: Undo followed by redo lands back on the edited state.
    #[test]
    fn redo_reapplies() {
        let mut editor = Editor::new("history");
        let node = editor.add_node(NodeKind::Llc, Position::default());
        editor.move_node(&node.id, Position::new(50.0, 60.0));

        assert!(editor.undo());
        assert_eq!(x_of(&editor, &node.id), 0.0);
        assert!(editor.redo());
        assert_eq!(x_of(&editor, &node.id), 50.0);
    }
}

// =============================================================================
// TIER B1: CLIPBOARD
// =============================================================================

mod b1_clipboard {
    use super::*;
    use std::collections::BTreeSet;

    /// B1.1: Copy with empty selection fails and keeps the buffer.
    #[test]
    fn empty_copy_keeps_buffer() {
        let mut editor = Editor::new("clip");
        let a = editor.add_node(NodeKind::Corporation, Position::default());
        editor.select_node(Some(&a.id));
        assert!(editor.copy());

        editor.select_node(None);
        assert!(!editor.copy());
        assert_eq!(editor.clipboard().nodes()[0].id, a.id);
    }

    /// B1.2: Paste yields k fresh nodes and m edges among them.
    #[test]
    fn paste_counts_and_endpoints() {
        let mut editor = Editor::new("clip");
        let a = editor.add_node(NodeKind::Corporation, Position::default()).id;
        let b = editor.add_node(NodeKind::Llc, Position::default()).id;
        let c = editor.add_node(NodeKind::Fund, Position::default()).id;
        let outside = editor.add_node(NodeKind::Trust, Position::default()).id;
        editor.add_edge(&a, &b).expect("a-b");
        editor.add_edge(&b, &c).expect("b-c");
        editor.add_edge(&c, &outside).expect("c-outside");
        editor.select_nodes(&[a.clone(), b.clone(), c.clone()]);

        let before: BTreeSet<NodeId> = editor.document().nodes.iter().map(|n| n.id.clone()).collect();
        assert!(editor.copy());
        assert!(editor.paste());

        let fresh: BTreeSet<NodeId> = editor
            .document()
            .nodes
            .iter()
            .map(|n| n.id.clone())
            .filter(|id| !before.contains(id))
            .collect();
        assert_eq!(fresh.len(), 3);

        let new_edges: Vec<_> = editor
            .document()
            .edges
            .iter()
            .filter(|e| fresh.contains(&e.source) || fresh.contains(&e.target))
            .collect();
        assert_eq!(new_edges.len(), 2);
        for edge in new_edges {
            assert!(fresh.contains(&edge.source));
            assert!(fresh.contains(&edge.target));
        }
        editor.check_invariants().expect("invariants hold");
    }

    /// B1.3: Duplicate of a lone node adds one selected copy.
    #[test]
    fn duplicate_lone_node() {
        let mut editor = Editor::new("clip");
        let a = editor.add_node(NodeKind::Foundation, Position::default());
        editor.select_node(Some(&a.id));
        assert!(editor.duplicate());

        let doc = editor.document();
        assert_eq!(doc.nodes.len(), 2);
        let original = doc.node(&a.id).expect("original");
        assert!(!original.selected);
        assert!(doc.nodes.iter().any(|n| n.id != a.id && n.selected));
    }
}

// =============================================================================
// TIER B2: ALIGNMENT
// =============================================================================

mod b2_alignment {
    use super::*;

    /// B2.1: Left alignment snaps to the minimum x.
    #[test]
    fn align_left() {
        let (mut editor, ids) = editor_with_selected(&[10.0, 50.0, 90.0], 200.0);
        assert!(editor.align(AlignType::Left));
        for id in &ids {
            assert_eq!(x_of(&editor, id), 10.0);
        }
    }

    /// B2.2: Distribution keeps the extremes and spaces the interior.
    #[test]
    fn distribute_horizontal() {
        let (mut editor, ids) = editor_with_selected(&[0.0, 100.0, 500.0], 50.0);
        assert!(editor.distribute(DistributeAxis::Horizontal));
        assert_eq!(x_of(&editor, &ids[0]), 0.0);
        assert_eq!(x_of(&editor, &ids[1]), 275.0);
        assert_eq!(x_of(&editor, &ids[2]), 500.0);
    }

    /// B2.3: Too few nodes is a reported no-op.
    #[test]
    fn thresholds() {
        let (mut editor, _) = editor_with_selected(&[0.0, 100.0], 50.0);
        assert!(!editor.distribute(DistributeAxis::Vertical));
        let (mut editor, _) = editor_with_selected(&[0.0], 50.0);
        assert!(!editor.align(AlignType::Right));
    }
}

// =============================================================================
// TIER B3: LAYOUT
// =============================================================================

mod b3_layout {
    use super::*;
    use strata_core::{Edge, EdgeId, auto_layout, has_cycle};

    fn node(id: &str) -> Node {
        Node::new(NodeId::new(id), NodeKind::Corporation, Position::new(5.0, 5.0))
    }

    fn edge(s: &str, t: &str) -> Edge {
        Edge::new(EdgeId::new(format!("{s}{t}")), NodeId::new(s), NodeId::new(t))
    }

    /// B3.1: Degenerate inputs.
    #[test]
    fn degenerate_inputs() {
        let empty = auto_layout(&[], &[], &LayoutOptions::default());
        assert!(empty.nodes.is_empty());
        assert!(empty.edges.is_empty());

        let single = auto_layout(&[node("n")], &[], &LayoutOptions::default());
        assert_eq!(single.nodes[0].position, Position::new(0.0, 0.0));
    }

    /// B3.2: Cycle detection.
    #[test]
    fn cycles() {
        let nodes = [node("A"), node("B"), node("C")];
        assert!(has_cycle(&nodes, &[edge("A", "B"), edge("B", "A")]));
        assert!(!has_cycle(&nodes, &[edge("A", "B"), edge("B", "C")]));
    }

    /// B3.3: Layout never places two nodes at the same spot.
    #[test]
    fn positions_are_distinct() {
        let nodes: Vec<Node> = ["a", "b", "c", "d", "e"].iter().map(|id| node(id)).collect();
        let edges = [edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d"), edge("d", "a")];
        let result = auto_layout(&nodes, &edges, &LayoutOptions::default());
        for (i, x) in result.nodes.iter().enumerate() {
            for y in &result.nodes[i + 1..] {
                assert_ne!(x.position, y.position, "{} and {}", x.id, y.id);
            }
        }
    }
}

// =============================================================================
// TIER B4: PERSISTENCE
// =============================================================================

mod b4_persistence {
    use super::*;

    /// B4.1: Save then load round-trips everything but updatedAt.
    #[test]
    fn save_load_round_trip() {
        let mut editor = Editor::new("persist");
        let a = editor.add_node(NodeKind::Corporation, Position::new(1.5, 2.25));
        let b = editor.add_node(NodeKind::Individual, Position::default());
        editor.add_edge(&b.id, &a.id).expect("edge");

        let mut persistence = Persistence::new(MemoryStorage::new(), "strata-diagram");
        let first = editor.save_to(&mut persistence).expect("first save");
        let second = editor.save_to(&mut persistence).expect("second save");

        let loaded = persistence
            .load(&editor.document().id)
            .expect("load")
            .expect("present");
        assert_eq!(loaded.nodes, editor.document().nodes);
        assert_eq!(loaded.edges, editor.document().edges);
        assert_eq!(loaded.name, "persist");
        assert_eq!(loaded.metadata.created_at, first.created_at);
        assert_eq!(loaded.metadata.version, first.version);
        assert!(second.updated_at >= first.updated_at);
    }

    /// B4.2: Missing and corrupted records are absent, not errors.
    #[test]
    fn absent_records() {
        let mut storage = MemoryStorage::new();
        storage.insert_raw("strata-diagram:bad", vec![0xff, 0x00, 0x13]);
        let persistence = Persistence::new(storage, "strata-diagram");

        assert!(matches!(persistence.load("nope"), Ok(None)));
        assert!(matches!(persistence.load("bad"), Ok(None)));
    }
}
