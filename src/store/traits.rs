//! MindMapStore trait definition.
//!
//! Abstract interface over the persistent store the migration engine
//! consumes. The engine only ever sees this trait (as `Arc<dyn
//! MindMapStore>`), which keeps the persistence backend swappable and the
//! orchestrator testable against the in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::models::{CandidateFilter, MapContent, MigrationUpdate, MindMapRecord};
use crate::migration::models::MigrationStatus;

/// Abstract interface for mind-map storage and migration-status writes.
#[async_trait]
pub trait MindMapStore: Send + Sync {
    // ========================================================================
    // Candidate lookup
    // ========================================================================

    /// List up to `limit` maps in a workspace that match the filter,
    /// ordered by creation time (earliest first).
    async fn list_migration_candidates(
        &self,
        workspace_id: Uuid,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<MindMapRecord>>;

    /// Get a single map's metadata record.
    async fn get_map(&self, map_id: Uuid) -> Result<Option<MindMapRecord>>;

    // ========================================================================
    // Map content
    // ========================================================================

    /// Fetch a map's full node and edge sets.
    async fn fetch_map_content(&self, map_id: Uuid) -> Result<MapContent>;

    // ========================================================================
    // Migration status persistence
    // ========================================================================

    /// Read the map's current migration status (`None` if never migrated).
    async fn read_migration_status(&self, map_id: Uuid) -> Result<Option<MigrationStatus>>;

    /// Write a bare status transition (used for `in_progress` and for
    /// rollback to `failed`).
    async fn write_migration_status(&self, map_id: Uuid, status: MigrationStatus) -> Result<()>;

    /// Write a confirmed migration: terminal status, tree payload,
    /// capped warnings, lost-edge count, and timestamp.
    async fn write_migration(&self, map_id: Uuid, update: &MigrationUpdate) -> Result<()>;
}
