//! Store-level records for mind maps and their migration state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::migration::models::{GraphEdge, GraphNode, MigrationStatus, MindMapTree};

/// Metadata record for one mind map, as listed by the candidate lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMapRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    /// `None` means the map was never migrated (equivalent to pending)
    pub status: Option<MigrationStatus>,
    pub created_at: DateTime<Utc>,
}

/// One map's full canvas content.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapContent {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Payload of a confirmed migration write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationUpdate {
    pub status: MigrationStatus,
    /// The migrated tree; absent for skipped/failed writes
    pub tree: Option<MindMapTree>,
    /// Capped warning list for the status report
    pub warnings: Vec<String>,
    pub lost_edge_count: usize,
    pub migrated_at: DateTime<Utc>,
}

/// Which maps qualify for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateFilter {
    /// Status in {pending, failed} or unset — the normal batch filter
    NeedsMigration,
    /// Any status — used for forced re-migration
    Any,
}

impl CandidateFilter {
    /// Apply the filter to a record's (possibly unset) status.
    pub fn matches(&self, status: Option<MigrationStatus>) -> bool {
        match self {
            Self::Any => true,
            Self::NeedsMigration => status.map_or(true, |s| s.is_candidate(false)),
        }
    }
}
