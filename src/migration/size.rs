//! Serialized tree size estimation.
//!
//! Measures the byte footprint of a candidate tree in its storage
//! representation (JSON). Pure — the measurement is used by the result
//! assembler to classify a map as "large" against the configured gate.

use anyhow::Result;

use super::models::MindMapTree;

/// Default size gate in bytes (1 MiB). A policy constant, overridable
/// per call via `MigrationOptions::max_size_bytes` or configuration.
pub const DEFAULT_MAX_TREE_BYTES: usize = 1_048_576;

/// Byte length of the tree's storage (JSON) encoding.
///
/// Deterministic for identical trees: `MindMapTree` keeps its nodes in a
/// `BTreeMap`, so the encoding is byte-stable across runs.
pub fn serialized_tree_size(tree: &MindMapTree) -> Result<usize> {
    Ok(serde_json::to_vec(tree)?.len())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::models::{NodeKind, Position, TreeNode};
    use std::collections::BTreeMap;

    fn tree_with_nodes(count: usize) -> MindMapTree {
        let mut nodes = BTreeMap::new();
        for i in 0..count {
            let id = format!("n{}", i);
            nodes.insert(
                id.clone(),
                TreeNode {
                    id,
                    kind: NodeKind::Idea,
                    title: format!("node number {}", i),
                    position: Position { x: i as f64, y: 0.0 },
                    data: serde_json::Value::Null,
                    children: vec![],
                },
            );
        }
        MindMapTree {
            roots: nodes.keys().cloned().collect(),
            nodes,
        }
    }

    #[test]
    fn test_empty_tree_has_small_fixed_size() {
        let size = serialized_tree_size(&MindMapTree::default()).unwrap();
        assert!(size > 0);
        assert!(size < 64);
    }

    #[test]
    fn test_size_grows_with_node_count() {
        let small = serialized_tree_size(&tree_with_nodes(2)).unwrap();
        let large = serialized_tree_size(&tree_with_nodes(50)).unwrap();
        assert!(large > small);
    }

    #[test]
    fn test_size_is_deterministic() {
        let tree = tree_with_nodes(10);
        assert_eq!(
            serialized_tree_size(&tree).unwrap(),
            serialized_tree_size(&tree).unwrap()
        );
    }
}
