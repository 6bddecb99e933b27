//! Mind-map migration pipeline.
//!
//! Converts free-form mind-map graphs (arbitrary directed edges, cycles,
//! multiple parents allowed) into strict trees, deterministically: the same
//! input always produces the same tree and the same lost-edge report. Every
//! input edge is accounted for as either a tree edge or a classified loss.
//!
//! ## Architecture
//!
//! ```text
//! MindMapStore ──► MapContent ──► MapGraph (petgraph::DiGraph)
//!                                     │
//!                                 build_tree
//!                                     │
//!                     TreeConversion (tree + lost edges + warnings)
//!                                     │
//!                        size measurement + assemble
//!                                     │
//!                    MapOutcome (terminal status decision)
//!                                     │
//!             WorkspaceMigrator ──► MindMapStore (two-phase persist)
//! ```
//!
//! ## Modules
//!
//! - [`models`] — Data structures (GraphNode, MapGraph, MindMapTree, LostEdge,
//!   MigrationStatus, MigrationOptions, MigrationResult, BatchReport)
//! - [`builder`] — Deterministic graph → tree conversion with loss classification
//! - [`size`] — Serialized tree size measurement for the size gate
//! - [`assembler`] — Terminal-status decision (success / warning / skipped)
//! - [`engine`] — `MigrationEngine` trait and `WorkspaceMigrator` orchestrator

pub mod assembler;
pub mod builder;
pub mod engine;
pub mod models;
pub mod size;

// Re-export primary types for convenience
pub use assembler::{assemble, AssemblerGate, MapOutcome};
pub use builder::build_tree;
pub use engine::{MigrationEngine, MigrationError, WorkspaceMigrator};
pub use models::{
    BatchReport, GraphEdge, GraphNode, LossReason, LostEdge, MapGraph, MigrationCounts,
    MigrationOptions, MigrationResult, MigrationStatus, MindMapTree, NodeKind, Position,
    StatusTotals, TreeConversion, TreeNode,
};
pub use size::{serialized_tree_size, DEFAULT_MAX_TREE_BYTES};
