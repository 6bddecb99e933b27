//! Graph → tree conversion.
//!
//! Resolves a general mind-map graph (cycles, multi-parent nodes,
//! disconnected components) into a strict hierarchy by a deterministic
//! priority rule: stable traversal order, first edge wins. The conversion
//! is a total function — malformed input produces lost edges and warnings,
//! never an error — and is iterative (explicit queue, visited set, and
//! parent map) so it is stack-safe on large graphs.
//!
//! ## Resolution rules
//!
//! 1. Nodes with no incoming candidate edge are natural roots. Components
//!    with no natural root (pure cycles) get a designated root: the node
//!    with the earliest creation time, tie-broken by id.
//! 2. Breadth-first traversal from all roots, out-edges in edge-id order.
//!    The first edge reaching an unvisited node becomes its parent edge.
//!    A later edge into a visited node is lost: "cycle" when it points to
//!    an ancestor of its source, "multi-parent" otherwise.
//! 3. Nodes never reached (all inbound edges lost) are force-attached
//!    under their component's root, earliest-created first, and traversed
//!    from there so dangling clusters keep their internal structure.
//!
//! Identical input always yields a byte-identical tree and loss report.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::models::{
    GraphEdge, GraphNode, LossReason, LostEdge, MapGraph, MindMapTree, TreeConversion, TreeNode,
};

/// Convert one map's graph into a tree plus loss report.
pub fn build_tree(map: &MapGraph) -> TreeConversion {
    let g = &map.graph;
    let n = g.node_count();

    let mut warnings = map.pre_warnings.clone();
    let mut lost_edges = map.pre_lost.clone();
    for lost in &map.pre_lost {
        warnings.push(lost.message.clone());
    }

    if n == 0 {
        return TreeConversion {
            tree: MindMapTree::default(),
            tree_edges: Vec::new(),
            lost_edges,
            warnings,
        };
    }

    let (component_of, component_count) = assign_components(g);

    // In-degree over candidate edges only; pre-rejected edges do not count.
    let in_degree: Vec<usize> = g
        .node_indices()
        .map(|idx| g.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    // Natural roots in creation (insertion) order, grouped by component.
    let mut roots_of_component: HashMap<u32, Vec<NodeIndex>> = HashMap::new();
    for idx in g.node_indices() {
        if in_degree[idx.index()] == 0 {
            roots_of_component
                .entry(component_of[idx.index()])
                .or_default()
                .push(idx);
        }
    }

    // Rootless components (pure cycles) get a designated root.
    for comp in 0..component_count {
        if roots_of_component.contains_key(&comp) {
            continue;
        }
        if let Some(idx) = g
            .node_indices()
            .filter(|i| component_of[i.index()] == comp)
            .min_by(|a, b| root_order(&g[*a]).cmp(&root_order(&g[*b])))
        {
            warnings.push(format!(
                "no natural root found; node '{}' designated as root",
                g[idx].id
            ));
            roots_of_component.insert(comp, vec![idx]);
        }
    }

    // Roots in component order; the first root of each component anchors
    // forced attachments for that component.
    let mut roots: Vec<NodeIndex> = Vec::new();
    let mut anchor_of_component: Vec<NodeIndex> = vec![NodeIndex::new(0); component_count as usize];
    for comp in 0..component_count {
        if let Some(comp_roots) = roots_of_component.get(&comp) {
            anchor_of_component[comp as usize] = comp_roots[0];
            roots.extend(comp_roots.iter().copied());
        }
    }

    // Per-node out-edges in edge-id order — the stable traversal order.
    let mut out_edges: Vec<Vec<EdgeIndex>> = vec![Vec::new(); n];
    for e in g.edge_indices() {
        if let Some((source, _)) = g.edge_endpoints(e) {
            out_edges[source.index()].push(e);
        }
    }
    for edges in out_edges.iter_mut() {
        edges.sort_by(|a, b| g[*a].id.cmp(&g[*b].id));
    }

    let mut visited = vec![false; n];
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
    let mut tree_edges: Vec<String> = Vec::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();

    for &root in &roots {
        visited[root.index()] = true;
        queue.push_back(root);
    }

    loop {
        while let Some(u) = queue.pop_front() {
            for &e in &out_edges[u.index()] {
                let Some((_, v)) = g.edge_endpoints(e) else {
                    continue;
                };
                let edge = &g[e];
                if !visited[v.index()] {
                    visited[v.index()] = true;
                    parent.insert(v, u);
                    children[u.index()].push(v);
                    tree_edges.push(edge.id.clone());
                    queue.push_back(v);
                } else {
                    let (reason, message) = classify_rejection(g, edge, u, v, &parent);
                    warnings.push(message.clone());
                    lost_edges.push(LostEdge::new(edge, reason, message));
                }
            }
        }

        // Anything still unvisited lost all its inbound edges. Attach the
        // earliest-created node under its component root and keep going.
        let Some(idx) = next_unvisited(g, &visited) else {
            break;
        };
        let anchor = anchor_of_component[component_of[idx.index()] as usize];
        visited[idx.index()] = true;
        parent.insert(idx, anchor);
        children[anchor.index()].push(idx);
        warnings.push(format!(
            "node '{}' was unreachable after edge resolution; attached under root '{}'",
            g[idx].id, g[anchor].id
        ));
        queue.push_back(idx);
    }

    let mut nodes: BTreeMap<String, TreeNode> = BTreeMap::new();
    for idx in g.node_indices() {
        let node = &g[idx];
        nodes.insert(
            node.id.clone(),
            TreeNode {
                id: node.id.clone(),
                kind: node.kind,
                title: node.title.clone(),
                position: node.position,
                data: node.data.clone(),
                children: children[idx.index()]
                    .iter()
                    .map(|&c| g[c].id.clone())
                    .collect(),
            },
        );
    }

    TreeConversion {
        tree: MindMapTree {
            roots: roots.iter().map(|&r| g[r].id.clone()).collect(),
            nodes,
        },
        tree_edges,
        lost_edges,
        warnings,
    }
}

/// Decide why an edge into an already-visited node is lost.
fn classify_rejection(
    g: &DiGraph<GraphNode, GraphEdge>,
    edge: &GraphEdge,
    source: NodeIndex,
    target: NodeIndex,
    parent: &HashMap<NodeIndex, NodeIndex>,
) -> (LossReason, String) {
    if is_ancestor(target, source, parent) {
        (
            LossReason::Cycle,
            format!(
                "edge '{}' from '{}' to '{}' would close a cycle",
                edge.id, g[source].id, g[target].id
            ),
        )
    } else {
        (
            LossReason::MultiParent,
            format!(
                "edge '{}' would give node '{}' a second parent ('{}')",
                edge.id, g[target].id, g[source].id
            ),
        )
    }
}

/// Whether `candidate` is an ancestor of `node` via chosen parent edges.
fn is_ancestor(
    candidate: NodeIndex,
    node: NodeIndex,
    parent: &HashMap<NodeIndex, NodeIndex>,
) -> bool {
    let mut current = Some(node);
    while let Some(idx) = current {
        if idx == candidate {
            return true;
        }
        current = parent.get(&idx).copied();
    }
    false
}

/// Earliest unvisited node by (created_at, id).
fn next_unvisited(g: &DiGraph<GraphNode, GraphEdge>, visited: &[bool]) -> Option<NodeIndex> {
    g.node_indices()
        .filter(|idx| !visited[idx.index()])
        .min_by(|a, b| root_order(&g[*a]).cmp(&root_order(&g[*b])))
}

/// Deterministic node ordering: creation time, then id (lexicographic).
fn root_order(node: &GraphNode) -> (chrono::DateTime<chrono::Utc>, &str) {
    (node.created_at, node.id.as_str())
}

/// Assign weakly connected components (edges treated as undirected).
///
/// Returns `(component_of, component_count)` indexed by `NodeIndex`.
fn assign_components(g: &DiGraph<GraphNode, GraphEdge>) -> (Vec<u32>, u32) {
    let n = g.node_count();
    let mut component_of: Vec<Option<u32>> = vec![None; n];
    let mut component_id = 0u32;

    for start in g.node_indices() {
        if component_of[start.index()].is_some() {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        component_of[start.index()] = Some(component_id);

        while let Some(current) = queue.pop_front() {
            for neighbor in g.neighbors_directed(current, Direction::Outgoing) {
                if component_of[neighbor.index()].is_none() {
                    component_of[neighbor.index()] = Some(component_id);
                    queue.push_back(neighbor);
                }
            }
            for neighbor in g.neighbors_directed(current, Direction::Incoming) {
                if component_of[neighbor.index()].is_none() {
                    component_of[neighbor.index()] = Some(component_id);
                    queue.push_back(neighbor);
                }
            }
        }
        component_id += 1;
    }

    (
        component_of.into_iter().map(|c| c.unwrap_or(0)).collect(),
        component_id,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::models::{NodeKind, Position};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn node(id: &str) -> GraphNode {
        node_at(id, 0)
    }

    /// Node with a creation offset in seconds (for root-selection tests).
    fn node_at(id: &str, offset_secs: i64) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind: NodeKind::Idea,
            title: format!("node {}", id),
            position: Position::default(),
            data: serde_json::Value::Null,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::seconds(offset_secs),
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind: "relates".to_string(),
        }
    }

    fn convert(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> TreeConversion {
        build_tree(&MapGraph::from_parts(nodes, edges))
    }

    /// Every node id appears exactly once as a child or root, and no node
    /// is reachable from itself via child links.
    fn assert_tree_invariants(conversion: &TreeConversion) {
        let tree = &conversion.tree;
        let mut seen: HashSet<&str> = HashSet::new();
        for root in &tree.roots {
            assert!(seen.insert(root), "root '{}' appears twice", root);
        }
        for tree_node in tree.nodes.values() {
            for child in &tree_node.children {
                assert!(seen.insert(child), "node '{}' has two parents", child);
            }
        }
        assert_eq!(seen.len(), tree.nodes.len(), "orphaned or duplicated nodes");

        // Walk down from each root; child links must never revisit a node.
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = tree.roots.iter().map(|s| s.as_str()).collect();
        while let Some(id) = stack.pop() {
            assert!(visited.insert(id), "cycle through node '{}'", id);
            for child in &tree.nodes[id].children {
                stack.push(child);
            }
        }
        assert_eq!(visited.len(), tree.nodes.len());
    }

    #[test]
    fn test_empty_input() {
        let conversion = convert(vec![], vec![]);
        assert!(conversion.tree.roots.is_empty());
        assert!(conversion.tree.nodes.is_empty());
        assert!(conversion.tree_edges.is_empty());
        assert!(conversion.lost_edges.is_empty());
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn test_single_node() {
        let conversion = convert(vec![node("a")], vec![]);
        assert_eq!(conversion.tree.roots, vec!["a"]);
        assert_eq!(conversion.tree.node_count(), 1);
        assert!(conversion.lost_edges.is_empty());
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_simple_chain() {
        let conversion = convert(
            vec![node("a"), node("b")],
            vec![edge("e1", "a", "b")],
        );
        assert_eq!(conversion.tree.roots, vec!["a"]);
        assert_eq!(conversion.tree.nodes["a"].children, vec!["b"]);
        assert_eq!(conversion.tree_edges, vec!["e1"]);
        assert!(conversion.lost_edges.is_empty());
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_three_node_cycle_loses_exactly_one_edge() {
        let conversion = convert(
            vec![node_at("a", 0), node_at("b", 1), node_at("c", 2)],
            vec![edge("e1", "a", "b"), edge("e2", "b", "c"), edge("e3", "c", "a")],
        );
        // Pure cycle: earliest-created node becomes the designated root.
        assert_eq!(conversion.tree.roots, vec!["a"]);
        assert_eq!(conversion.tree.node_count(), 3);
        assert_eq!(conversion.lost_edges.len(), 1);
        assert_eq!(conversion.lost_edges[0].edge_id, "e3");
        assert_eq!(conversion.lost_edges[0].reason, LossReason::Cycle);
        assert_eq!(conversion.tree_edges.len(), 2);
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_multi_parent_first_edge_wins() {
        // a → b and c → b; both a and c are roots. The edge with the
        // smaller id is processed first and wins.
        let conversion = convert(
            vec![node("a"), node("b"), node("c")],
            vec![edge("e2", "c", "b"), edge("e1", "a", "b")],
        );
        assert_eq!(conversion.tree.roots, vec!["a", "c"]);
        assert_eq!(conversion.tree.nodes["a"].children, vec!["b"]);
        assert!(conversion.tree.nodes["c"].children.is_empty());
        assert_eq!(conversion.lost_edges.len(), 1);
        assert_eq!(conversion.lost_edges[0].edge_id, "e2");
        assert_eq!(conversion.lost_edges[0].reason, LossReason::MultiParent);
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_self_loop_always_lost() {
        let conversion = convert(vec![node("a")], vec![edge("e1", "a", "a")]);
        assert_eq!(conversion.lost_edges.len(), 1);
        assert_eq!(conversion.lost_edges[0].reason, LossReason::SelfLoop);
        assert_eq!(conversion.tree.roots, vec!["a"]);
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_duplicate_edges_only_first_kept() {
        let conversion = convert(
            vec![node("a"), node("b")],
            vec![edge("e1", "a", "b"), edge("e2", "a", "b"), edge("e3", "a", "b")],
        );
        assert_eq!(conversion.tree_edges, vec!["e1"]);
        assert_eq!(conversion.lost_edges.len(), 2);
        assert!(conversion
            .lost_edges
            .iter()
            .all(|l| l.reason == LossReason::DuplicateEdge));
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_disconnected_components_each_get_a_root() {
        let conversion = convert(
            vec![node("a"), node("b"), node("x"), node("y")],
            vec![edge("e1", "a", "b"), edge("e2", "x", "y")],
        );
        assert_eq!(conversion.tree.roots, vec!["a", "x"]);
        assert_eq!(conversion.tree.node_count(), 4);
        assert!(conversion.lost_edges.is_empty());
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_pure_cycle_root_tiebreak_is_lexicographic() {
        // Identical timestamps: the lexicographically smallest id wins.
        let conversion = convert(
            vec![node("zeta"), node("beta"), node("mira")],
            vec![
                edge("e1", "zeta", "beta"),
                edge("e2", "beta", "mira"),
                edge("e3", "mira", "zeta"),
            ],
        );
        assert_eq!(conversion.tree.roots, vec!["beta"]);
        assert_tree_invariants(&conversion);
    }

    #[test]
    fn test_unreachable_cluster_force_attached() {
        // r → y is reachable; the cycle a ↔ b also feeds y, so a and b
        // have inbound edges but are never reached from r.
        let conversion = convert(
            vec![node_at("r", 0), node_at("y", 1), node_at("a", 2), node_at("b", 3)],
            vec![
                edge("e1", "r", "y"),
                edge("e2", "a", "b"),
                edge("e3", "b", "a"),
                edge("e4", "b", "y"),
            ],
        );
        assert_eq!(conversion.tree.roots, vec!["r"]);
        assert_eq!(conversion.tree.node_count(), 4);
        // a (earliest unreachable) is forced under r, then b hangs off a.
        assert!(conversion.tree.nodes["r"].children.contains(&"a".to_string()));
        assert_eq!(conversion.tree.nodes["a"].children, vec!["b"]);
        assert!(conversion
            .warnings
            .iter()
            .any(|w| w.contains("unreachable")));
        assert_tree_invariants(&conversion);
        // e3 closes the a→b cycle, e4 would re-parent y.
        assert_eq!(conversion.lost_edges.len(), 2);
    }

    #[test]
    fn test_edge_classification_is_complete() {
        let edges = vec![
            edge("e1", "a", "b"),
            edge("e2", "b", "c"),
            edge("e3", "c", "a"),
            edge("e4", "a", "a"),
            edge("e5", "a", "b"),
            edge("e6", "a", "ghost"),
        ];
        let map = MapGraph::from_parts(vec![node("a"), node("b"), node("c")], edges);
        let conversion = build_tree(&map);
        assert_eq!(
            conversion.tree_edges.len() + conversion.lost_edges.len(),
            map.input_edge_count
        );
        // No edge id classified twice.
        let mut ids: Vec<&str> = conversion
            .tree_edges
            .iter()
            .map(|s| s.as_str())
            .chain(conversion.lost_edges.iter().map(|l| l.edge_id.as_str()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), map.input_edge_count);
    }

    #[test]
    fn test_children_order_follows_edge_acceptance_order() {
        let conversion = convert(
            vec![node("root"), node("one"), node("two"), node("three")],
            vec![
                edge("e3", "root", "three"),
                edge("e1", "root", "one"),
                edge("e2", "root", "two"),
            ],
        );
        assert_eq!(
            conversion.tree.nodes["root"].children,
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let nodes = vec![node_at("a", 0), node_at("b", 1), node_at("c", 2), node_at("d", 3)];
        let edges = vec![
            edge("e1", "a", "b"),
            edge("e2", "b", "c"),
            edge("e3", "c", "a"),
            edge("e4", "d", "b"),
        ];
        let first = convert(nodes.clone(), edges.clone());
        let second = convert(nodes, edges);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_malformed_input_recorded_not_thrown() {
        let conversion = convert(
            vec![node("a"), node("")],
            vec![edge("", "a", "a"), edge("e1", "a", "missing")],
        );
        assert_eq!(conversion.tree.node_count(), 1);
        assert_eq!(conversion.lost_edges.len(), 2);
        assert!(!conversion.warnings.is_empty());
        assert_tree_invariants(&conversion);
    }
}
