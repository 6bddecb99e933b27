//! Migration result assembly.
//!
//! Decides the terminal status for one map from its conversion outcome,
//! size measurement, and the active options. Pure — this component never
//! touches the persistence layer; the orchestrator applies the decision.

use super::models::{MigrationCounts, MigrationStatus, MindMapTree, TreeConversion};

/// Size-gating and warning-cap knobs, resolved by the orchestrator from
/// options and configuration before assembly.
#[derive(Debug, Clone, Copy)]
pub struct AssemblerGate {
    /// Skip maps whose serialized tree exceeds `max_size_bytes`
    pub skip_large_maps: bool,
    /// Size gate in bytes
    pub max_size_bytes: usize,
    /// Per-map warning cap; excess warnings are dropped silently
    pub max_warnings: usize,
}

/// The assembled outcome for one map, before persistence.
#[derive(Debug, Clone)]
pub struct MapOutcome {
    pub status: MigrationStatus,
    /// The tree to persist; `None` when the map is skipped
    pub tree: Option<MindMapTree>,
    pub warnings: Vec<String>,
    pub counts: MigrationCounts,
    pub size_bytes: usize,
}

/// Decide the terminal status for one map's conversion.
///
/// - Size gate tripped → `Skipped`, no tree, size figures in the warnings.
/// - Any lost edge → `Warning`, tree included.
/// - Otherwise → `Success`.
///
/// Warnings are truncated to `max_warnings` without error. A conversion
/// that could not even run (unreadable input) never reaches this function;
/// the orchestrator maps it to `Failed` directly.
pub fn assemble(
    conversion: TreeConversion,
    size_bytes: usize,
    node_count: usize,
    edge_count: usize,
    gate: &AssemblerGate,
) -> MapOutcome {
    let counts = MigrationCounts {
        node_count,
        edge_count,
        tree_node_count: conversion.tree.node_count(),
        lost_edge_count: conversion.lost_edges.len(),
    };

    let mut warnings = conversion.warnings;

    if gate.skip_large_maps && size_bytes > gate.max_size_bytes {
        warnings.insert(
            0,
            format!(
                "serialized tree is {} bytes, over the {} byte limit; map skipped",
                size_bytes, gate.max_size_bytes
            ),
        );
        warnings.truncate(gate.max_warnings);
        return MapOutcome {
            status: MigrationStatus::Skipped,
            tree: None,
            warnings,
            counts,
            size_bytes,
        };
    }

    warnings.truncate(gate.max_warnings);
    let status = if counts.lost_edge_count > 0 {
        MigrationStatus::Warning
    } else {
        MigrationStatus::Success
    };

    MapOutcome {
        status,
        tree: Some(conversion.tree),
        warnings,
        counts,
        size_bytes,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::models::{LossReason, LostEdge, MindMapTree};

    const GATE: AssemblerGate = AssemblerGate {
        skip_large_maps: true,
        max_size_bytes: 1024,
        max_warnings: 5,
    };

    fn clean_conversion() -> TreeConversion {
        TreeConversion {
            tree: MindMapTree::default(),
            tree_edges: vec![],
            lost_edges: vec![],
            warnings: vec![],
        }
    }

    fn lossy_conversion(lost: usize, warnings: usize) -> TreeConversion {
        TreeConversion {
            tree: MindMapTree::default(),
            tree_edges: vec![],
            lost_edges: (0..lost)
                .map(|i| LostEdge {
                    edge_id: format!("e{}", i),
                    source: "a".to_string(),
                    target: "b".to_string(),
                    reason: LossReason::MultiParent,
                    message: format!("edge e{} lost", i),
                })
                .collect(),
            warnings: (0..warnings).map(|i| format!("warning {}", i)).collect(),
        }
    }

    #[test]
    fn test_clean_conversion_is_success() {
        let outcome = assemble(clean_conversion(), 100, 3, 2, &GATE);
        assert_eq!(outcome.status, MigrationStatus::Success);
        assert!(outcome.tree.is_some());
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.counts.node_count, 3);
        assert_eq!(outcome.counts.edge_count, 2);
        assert_eq!(outcome.size_bytes, 100);
    }

    #[test]
    fn test_lost_edges_yield_warning_status() {
        let outcome = assemble(lossy_conversion(2, 2), 100, 3, 4, &GATE);
        assert_eq!(outcome.status, MigrationStatus::Warning);
        assert!(outcome.tree.is_some());
        assert_eq!(outcome.counts.lost_edge_count, 2);
    }

    #[test]
    fn test_size_gate_skips_and_drops_tree() {
        let outcome = assemble(clean_conversion(), 2048, 3, 2, &GATE);
        assert_eq!(outcome.status, MigrationStatus::Skipped);
        assert!(outcome.tree.is_none());
        assert!(outcome.warnings[0].contains("2048"));
        assert!(outcome.warnings[0].contains("1024"));
    }

    #[test]
    fn test_size_gate_disabled_lets_large_maps_through() {
        let gate = AssemblerGate {
            skip_large_maps: false,
            ..GATE
        };
        let outcome = assemble(clean_conversion(), 2048, 3, 2, &gate);
        assert_eq!(outcome.status, MigrationStatus::Success);
        assert!(outcome.tree.is_some());
    }

    #[test]
    fn test_warnings_truncated_silently() {
        let outcome = assemble(lossy_conversion(1, 20), 100, 3, 1, &GATE);
        assert_eq!(outcome.warnings.len(), 5);
        assert_eq!(outcome.warnings[0], "warning 0");
    }

    #[test]
    fn test_exact_limit_is_not_skipped() {
        let outcome = assemble(clean_conversion(), 1024, 1, 0, &GATE);
        assert_eq!(outcome.status, MigrationStatus::Success);
    }
}
