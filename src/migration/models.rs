//! Migration data models.
//!
//! Defines the complete type system for the mind-map → tree migration:
//!
//! ## Input types (canvas graph)
//! - [`NodeKind`] / [`GraphNode`] — freeform canvas nodes
//! - [`GraphEdge`] — directed canvas connections
//! - [`MapGraph`] — petgraph wrapper with ID ↔ NodeIndex mapping
//!
//! ## Output types (tree + loss report)
//! - [`TreeNode`] / [`MindMapTree`] — the strictly hierarchical result
//! - [`LossReason`] / [`LostEdge`] — edges that could not be represented
//! - [`TreeConversion`] — tree plus loss accounting for one map
//!
//! ## Batch types
//! - [`MigrationStatus`] — per-map status state machine
//! - [`MigrationOptions`] — per-run knobs (dry run, size gate, pagination)
//! - [`MigrationResult`] / [`BatchReport`] — per-map and aggregated outcomes

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Input types — canvas graph
// ============================================================================

/// Kind of canvas node, assigned by the mind-map editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Idea,
    Problem,
    Solution,
    Feature,
    Question,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idea => write!(f, "idea"),
            Self::Problem => write!(f, "problem"),
            Self::Solution => write!(f, "solution"),
            Self::Feature => write!(f, "feature"),
            Self::Question => write!(f, "question"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idea" => Ok(Self::Idea),
            "problem" => Ok(Self::Problem),
            "solution" => Ok(Self::Solution),
            "feature" => Ok(Self::Feature),
            "question" => Ok(Self::Question),
            other => Err(format!("unknown node kind: {}", other)),
        }
    }
}

/// Free-form canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A freeform canvas node. Immutable input to migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Canvas-assigned identifier, unique within a map
    pub id: String,
    /// Node kind (idea/problem/solution/feature/question)
    pub kind: NodeKind,
    /// Display title
    pub title: String,
    /// Free-form canvas position
    pub position: Position,
    /// Opaque editor payload carried through the migration untouched
    #[serde(default)]
    pub data: serde_json::Value,
    /// Creation timestamp, used for deterministic root selection
    pub created_at: DateTime<Utc>,
}

/// A directed canvas connection between two nodes.
///
/// Multiple edges may share a source or target, edges may form cycles,
/// and a node may have zero, one, or many incoming edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Canvas-assigned identifier, unique within a map
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Edge kind label (e.g. "relates", "blocks")
    #[serde(default)]
    pub kind: String,
}

// ============================================================================
// MapGraph — petgraph wrapper with ID mapping
// ============================================================================

/// Immutable per-conversion view of one mind map.
///
/// Wraps a `petgraph::DiGraph` with a node-ID ↔ NodeIndex map. Node
/// insertion order preserves canvas creation order; candidate edges are
/// inserted in edge-id order so traversal is reproducible. Malformed
/// edges (missing identifiers, unknown endpoints, self-loops, duplicate
/// source/target pairs) never reach the graph: they are pre-classified
/// into [`MapGraph::pre_lost`] so the builder stays a total function.
#[derive(Debug, Clone)]
pub struct MapGraph {
    /// The underlying directed graph (candidate edges only)
    pub graph: DiGraph<GraphNode, GraphEdge>,
    /// Mapping from node ID to petgraph NodeIndex
    pub id_to_index: HashMap<String, NodeIndex>,
    /// Edges rejected before traversal, with their loss reason
    pub pre_lost: Vec<LostEdge>,
    /// Warnings raised while sanitizing the input (dropped nodes, etc.)
    pub pre_warnings: Vec<String>,
    /// Number of edges in the raw input, before any classification
    pub input_edge_count: usize,
}

impl MapGraph {
    /// Build a `MapGraph` from raw canvas nodes and edges.
    ///
    /// Never fails: nodes with empty or duplicate identifiers are dropped
    /// with a warning, and structurally unusable edges are routed into
    /// `pre_lost`. Edges are sorted by edge id before classification so
    /// "first duplicate wins" is stable across runs.
    pub fn from_parts(nodes: Vec<GraphNode>, mut edges: Vec<GraphEdge>) -> Self {
        let input_edge_count = edges.len();
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        let mut pre_warnings = Vec::new();

        for node in nodes {
            if node.id.is_empty() {
                pre_warnings.push(format!(
                    "node '{}' has no identifier and was dropped",
                    node.title
                ));
                continue;
            }
            if id_to_index.contains_key(&node.id) {
                pre_warnings.push(format!(
                    "duplicate node id '{}'; later occurrence dropped",
                    node.id
                ));
                continue;
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            id_to_index.insert(id, idx);
        }

        // Stable processing order: edge id, lexicographic. The first edge
        // of a duplicate source/target pair in this order is the candidate.
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let mut pre_lost = Vec::new();
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();

        for edge in edges {
            if edge.id.is_empty() || edge.source.is_empty() || edge.target.is_empty() {
                pre_lost.push(LostEdge::new(
                    &edge,
                    LossReason::InvalidEdge,
                    "edge is missing an identifier".to_string(),
                ));
                continue;
            }
            let (source_idx, target_idx) = match (
                id_to_index.get(&edge.source),
                id_to_index.get(&edge.target),
            ) {
                (Some(&s), Some(&t)) => (s, t),
                _ => {
                    pre_lost.push(LostEdge::new(
                        &edge,
                        LossReason::MissingEndpoint,
                        format!(
                            "edge '{}' references a node that does not exist ({} -> {})",
                            edge.id, edge.source, edge.target
                        ),
                    ));
                    continue;
                }
            };
            if edge.source == edge.target {
                pre_lost.push(LostEdge::new(
                    &edge,
                    LossReason::SelfLoop,
                    format!("edge '{}' is a self-loop on node '{}'", edge.id, edge.source),
                ));
                continue;
            }
            if !seen_pairs.insert((edge.source.clone(), edge.target.clone())) {
                pre_lost.push(LostEdge::new(
                    &edge,
                    LossReason::DuplicateEdge,
                    format!(
                        "edge '{}' duplicates an earlier edge {} -> {}",
                        edge.id, edge.source, edge.target
                    ),
                ));
                continue;
            }
            graph.add_edge(source_idx, target_idx, edge);
        }

        Self {
            graph,
            id_to_index,
            pre_lost,
            pre_warnings,
            input_edge_count,
        }
    }

    /// Get a reference to a node by its ID.
    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        let idx = self.id_to_index.get(id)?;
        self.graph.node_weight(*idx)
    }

    /// Number of nodes that survived sanitization.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of candidate (traversable) edges.
    pub fn candidate_edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

// ============================================================================
// Output types — tree + loss report
// ============================================================================

/// A node of the migrated tree. Payload is copied from the source
/// [`GraphNode`]; `children` are ordered by edge acceptance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Same identifier as the source GraphNode
    pub id: String,
    pub kind: NodeKind,
    pub title: String,
    pub position: Position,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Ordered child node ids
    pub children: Vec<String>,
}

/// The strictly hierarchical representation of one mind map.
///
/// `nodes` is a `BTreeMap` so the serialized form is byte-deterministic —
/// a requirement for idempotent dry runs and size estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MindMapTree {
    /// Designated root node ids, in component order
    pub roots: Vec<String>,
    /// All tree nodes, keyed by node id
    pub nodes: BTreeMap<String, TreeNode>,
}

impl MindMapTree {
    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Why a [`GraphEdge`] could not be represented in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    /// Edge source and target are the same node
    SelfLoop,
    /// A same source/target pair was already accepted as a candidate
    DuplicateEdge,
    /// The target already has a tree parent
    MultiParent,
    /// The edge points back to an ancestor of its source
    Cycle,
    /// The edge references a node id that does not exist in the map
    MissingEndpoint,
    /// The edge is missing an identifier
    InvalidEdge,
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfLoop => write!(f, "self-loop"),
            Self::DuplicateEdge => write!(f, "duplicate edge"),
            Self::MultiParent => write!(f, "multi-parent"),
            Self::Cycle => write!(f, "cycle"),
            Self::MissingEndpoint => write!(f, "missing endpoint"),
            Self::InvalidEdge => write!(f, "invalid edge"),
        }
    }
}

/// A graph edge not represented in the tree, with the reason it was
/// dropped and a human-readable message for the migration report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostEdge {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    pub reason: LossReason,
    pub message: String,
}

impl LostEdge {
    pub fn new(edge: &GraphEdge, reason: LossReason, message: String) -> Self {
        Self {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            reason,
            message,
        }
    }
}

/// Result of converting one map's graph into a tree.
///
/// Invariant: `tree_edges.len() + lost_edges.len()` equals the raw input
/// edge count — every edge is classified exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConversion {
    /// The migrated tree (always produced, possibly empty)
    pub tree: MindMapTree,
    /// Edge ids accepted as parent → child links, in acceptance order
    pub tree_edges: Vec<String>,
    /// Edges dropped during conversion, in classification order
    pub lost_edges: Vec<LostEdge>,
    /// Human-readable warnings (lost edges, forced attachments, dropped nodes)
    pub warnings: Vec<String>,
}

// ============================================================================
// Migration status state machine
// ============================================================================

/// Per-map migration status.
///
/// Transitions:
/// - `Pending`/`Failed` → `InProgress` when a batch run starts the persist
/// - `InProgress` → `Success`/`Warning` when the persist confirms
/// - `InProgress` → `Failed` when the persist write fails (rollback)
/// - `Pending` → `Skipped` when the size gate trips
/// - `Success`/`Warning`/`Skipped` → `InProgress` only on an explicit force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Never migrated, or reset by a failure
    Pending,
    /// Persistence write started, not yet confirmed
    InProgress,
    /// Tree built with no lost edges, persisted
    Success,
    /// Tree built with one or more lost edges, persisted
    Warning,
    /// Conversion or persistence error; eligible for retry
    Failed,
    /// Excluded by the size gate or explicit policy; not retried automatically
    Skipped,
}

impl MigrationStatus {
    /// Whether a map with this status qualifies for a batch run.
    ///
    /// Unset status (never migrated) is handled at the store level and
    /// always qualifies.
    pub fn is_candidate(&self, force: bool) -> bool {
        if force {
            return true;
        }
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Whether this is a terminal status a batch call may leave behind.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for MigrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown migration status: {}", other)),
        }
    }
}

// ============================================================================
// Options / results / batch report
// ============================================================================

/// Per-run migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    /// Compute results without persisting anything (default: true)
    pub dry_run: bool,
    /// Candidate page size when no explicit limit is given (default: 10)
    pub batch_size: usize,
    /// Skip maps whose serialized tree exceeds the size gate (default: true)
    pub skip_large_maps: bool,
    /// Size gate override in bytes; falls back to the configured default
    pub max_size_bytes: Option<usize>,
    /// Optional hard cap on maps processed this call
    pub limit: Option<usize>,
    /// Re-migrate maps regardless of their current status (default: false)
    pub force: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            batch_size: 10,
            skip_large_maps: true,
            max_size_bytes: None,
            limit: None,
            force: false,
        }
    }
}

impl MigrationOptions {
    /// Maps processed this call: `limit` when set, otherwise `batch_size`.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(self.batch_size).max(1)
    }
}

/// Node/edge accounting for one migrated map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MigrationCounts {
    pub node_count: usize,
    pub edge_count: usize,
    pub tree_node_count: usize,
    pub lost_edge_count: usize,
}

/// Outcome of migrating one map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub map_id: uuid::Uuid,
    pub workspace_id: uuid::Uuid,
    pub status: MigrationStatus,
    pub counts: MigrationCounts,
    /// Human-readable warnings, truncated to the configured per-map maximum
    pub warnings: Vec<String>,
    /// Error description when `status` is `Failed`
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Serialized tree size, when a tree was built
    pub size_bytes: Option<usize>,
}

/// Per-status counters across one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusTotals {
    pub success: usize,
    pub warning: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusTotals {
    /// Tally one per-map result status.
    pub fn record(&mut self, status: MigrationStatus) {
        match status {
            MigrationStatus::Success => self.success += 1,
            MigrationStatus::Warning => self.warning += 1,
            MigrationStatus::Failed => self.failed += 1,
            MigrationStatus::Skipped => self.skipped += 1,
            // A batch call never reports Pending or InProgress as terminal.
            MigrationStatus::Pending | MigrationStatus::InProgress => {}
        }
    }
}

/// Aggregated result of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub workspace_id: uuid::Uuid,
    /// Per-map results, in candidate fetch order
    pub results: Vec<MigrationResult>,
    pub totals: StatusTotals,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// True when the over-fetch found more candidates than the effective limit
    pub has_more: bool,
    /// Lower bound on remaining candidates; present only when `has_more`
    pub remaining_count: Option<usize>,
}

// ============================================================================
// Tests
// ============================================================================
