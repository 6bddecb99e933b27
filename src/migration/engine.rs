//! Migration engine — orchestrates the full pipeline.
//!
//! The `MigrationEngine` trait is the single entry point for migration
//! consumers (request handlers, schedulers, CLIs). It encapsulates:
//!
//! 1. **Candidate lookup**: paged fetch via `MindMapStore`, with a one-record
//!    over-fetch to detect remaining candidates without a count query
//! 2. **Conversion**: graph → tree via the pure builder, size estimation,
//!    and terminal-status assembly
//! 3. **Persistence**: two-phase status write (`in_progress` → terminal)
//!    with rollback to `failed`, so a map is never left mid-transition
//!
//! Maps are processed strictly in fetch order, sequentially. A single
//! map's failure never aborts the batch: every per-map error is absorbed
//! into that map's result, and only a candidate-list fetch failure
//! propagates to the caller.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use super::assembler::{assemble, AssemblerGate, MapOutcome};
use super::builder::build_tree;
use super::models::{
    BatchReport, MapGraph, MigrationCounts, MigrationOptions, MigrationResult, MigrationStatus,
    StatusTotals,
};
use super::size::serialized_tree_size;
use crate::store::models::{CandidateFilter, MigrationUpdate, MindMapRecord};
use crate::store::MindMapStore;
use crate::MigrationConfig;

// ============================================================================
// Errors
// ============================================================================

/// Caller-visible migration failures.
///
/// Everything else — content fetch errors, conversion guards, persistence
/// failures — is absorbed into the affected map's `MigrationResult`.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The candidate list (or single-map lookup) could not be fetched;
    /// nothing to iterate over, so the call aborts before any per-map work.
    #[error("failed to fetch migration candidates: {0}")]
    CandidateFetch(#[source] anyhow::Error),

    /// The requested map does not exist.
    #[error("mind map {0} not found")]
    MapNotFound(Uuid),
}

// ============================================================================
// Trait
// ============================================================================

/// Migration engine trait — single entry point for mind-map migration.
///
/// Consumers use `Arc<dyn MigrationEngine>` for dependency injection.
#[async_trait]
pub trait MigrationEngine: Send + Sync {
    /// Run one migration batch over a workspace.
    ///
    /// Fetches up to `effective_limit + 1` candidates (pending/failed/unset,
    /// or any status when `force`), processes at most `effective_limit` of
    /// them in fetch order, and returns the aggregated report with
    /// `has_more` / `remaining_count` pagination hints.
    async fn migrate_workspace(
        &self,
        workspace_id: Uuid,
        options: MigrationOptions,
    ) -> Result<BatchReport, MigrationError>;

    /// Migrate a single map by id.
    ///
    /// An explicit per-map call is treated as an explicit re-run request:
    /// the candidate status filter does not apply. Honors `dry_run`.
    async fn migrate_map(
        &self,
        map_id: Uuid,
        options: MigrationOptions,
    ) -> Result<MigrationResult, MigrationError>;
}

// ============================================================================
// Concrete implementation
// ============================================================================

/// Real migration engine backed by a `MindMapStore`.
pub struct WorkspaceMigrator {
    store: Arc<dyn MindMapStore>,
    config: MigrationConfig,
}

impl WorkspaceMigrator {
    /// Create a new engine backed by the given store.
    pub fn new(store: Arc<dyn MindMapStore>, config: MigrationConfig) -> Self {
        Self { store, config }
    }

    /// Resolve the size-gate and warning-cap knobs for one run.
    fn gate(&self, options: &MigrationOptions) -> AssemblerGate {
        AssemblerGate {
            skip_large_maps: options.skip_large_maps,
            max_size_bytes: options
                .max_size_bytes
                .unwrap_or(self.config.max_size_bytes),
            max_warnings: self.config.max_warnings,
        }
    }

    /// Run the fetch → convert → assemble → persist pipeline for one map.
    ///
    /// Never fails: every error path resolves to a `failed` result with
    /// the error captured, and the persisted status is always terminal.
    async fn process_map(
        &self,
        record: &MindMapRecord,
        options: &MigrationOptions,
    ) -> MigrationResult {
        let started = Instant::now();

        let content = match self.store.fetch_map_content(record.id).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to fetch content for map {}: {}", record.id, e);
                if !options.dry_run {
                    self.write_status_best_effort(record.id, MigrationStatus::Failed)
                        .await;
                }
                return self.failed_result(record, format!("content fetch failed: {}", e), started);
            }
        };

        let node_count = content.nodes.len();
        let edge_count = content.edges.len();
        let graph = MapGraph::from_parts(content.nodes, content.edges);
        let conversion = build_tree(&graph);

        let size_bytes = match serialized_tree_size(&conversion.tree) {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!("Failed to serialize tree for map {}: {}", record.id, e);
                if !options.dry_run {
                    self.write_status_best_effort(record.id, MigrationStatus::Failed)
                        .await;
                }
                return self.failed_result(record, format!("tree serialization failed: {}", e), started);
            }
        };

        let outcome = assemble(conversion, size_bytes, node_count, edge_count, &self.gate(options));

        let mut status = outcome.status;
        let mut error = None;
        if !options.dry_run {
            match outcome.status {
                MigrationStatus::Success | MigrationStatus::Warning => {
                    if let Err(e) = self.persist_confirmed(record.id, &outcome).await {
                        status = MigrationStatus::Failed;
                        error = Some(format!("persistence failed: {}", e));
                    }
                }
                MigrationStatus::Failed | MigrationStatus::Skipped => {
                    self.write_status_best_effort(record.id, outcome.status).await;
                }
                // The assembler only produces terminal statuses.
                MigrationStatus::Pending | MigrationStatus::InProgress => {}
            }
        }

        tracing::debug!(
            "Map {} migrated with status {} ({} nodes, {} lost edges)",
            record.id,
            status,
            outcome.counts.tree_node_count,
            outcome.counts.lost_edge_count
        );

        MigrationResult {
            map_id: record.id,
            workspace_id: record.workspace_id,
            status,
            counts: outcome.counts,
            warnings: outcome.warnings,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
            size_bytes: Some(outcome.size_bytes),
        }
    }

    /// Two-phase persist: write `in_progress`, then the tree payload with
    /// its terminal status. Any failure rolls the record back to `failed`
    /// so the map is never left at `in_progress` when the call returns.
    async fn persist_confirmed(&self, map_id: Uuid, outcome: &MapOutcome) -> anyhow::Result<()> {
        if let Err(e) = self
            .store
            .write_migration_status(map_id, MigrationStatus::InProgress)
            .await
        {
            tracing::warn!("Failed to mark map {} in_progress: {}", map_id, e);
            self.write_status_best_effort(map_id, MigrationStatus::Failed)
                .await;
            return Err(e);
        }

        let update = MigrationUpdate {
            status: outcome.status,
            tree: outcome.tree.clone(),
            warnings: outcome.warnings.clone(),
            lost_edge_count: outcome.counts.lost_edge_count,
            migrated_at: Utc::now(),
        };
        if let Err(e) = self.store.write_migration(map_id, &update).await {
            tracing::warn!("Failed to persist migration for map {}: {}", map_id, e);
            self.write_status_best_effort(map_id, MigrationStatus::Failed)
                .await;
            return Err(e);
        }

        Ok(())
    }

    /// Best-effort status write. A failure here is logged and swallowed —
    /// the map stays in whatever status it last successfully reached and
    /// remains eligible for retry.
    async fn write_status_best_effort(&self, map_id: Uuid, status: MigrationStatus) {
        if let Err(e) = self.store.write_migration_status(map_id, status).await {
            tracing::warn!(
                "Failed to write status {} for map {}; keeping previous status: {}",
                status,
                map_id,
                e
            );
        }
    }

    fn failed_result(
        &self,
        record: &MindMapRecord,
        error: String,
        started: Instant,
    ) -> MigrationResult {
        MigrationResult {
            map_id: record.id,
            workspace_id: record.workspace_id,
            status: MigrationStatus::Failed,
            counts: MigrationCounts::default(),
            warnings: Vec::new(),
            error: Some(error),
            duration_ms: started.elapsed().as_millis() as u64,
            size_bytes: None,
        }
    }
}

#[async_trait]
impl MigrationEngine for WorkspaceMigrator {
    async fn migrate_workspace(
        &self,
        workspace_id: Uuid,
        options: MigrationOptions,
    ) -> Result<BatchReport, MigrationError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let effective_limit = options.effective_limit();
        let filter = if options.force {
            CandidateFilter::Any
        } else {
            CandidateFilter::NeedsMigration
        };

        // Over-fetch one extra record: its presence tells us whether more
        // candidates remain, without a second count query.
        let candidates = self
            .store
            .list_migration_candidates(workspace_id, filter, effective_limit + 1)
            .await
            .map_err(MigrationError::CandidateFetch)?;

        let has_more = candidates.len() > effective_limit;
        let remaining_count = has_more.then(|| candidates.len() - effective_limit);

        tracing::info!(
            "Starting migration batch for workspace {}: {} candidate(s), dry_run={}, force={}",
            workspace_id,
            candidates.len().min(effective_limit),
            options.dry_run,
            options.force
        );

        let mut results = Vec::new();
        let mut totals = StatusTotals::default();
        for record in candidates.into_iter().take(effective_limit) {
            let result = self.process_map(&record, &options).await;
            totals.record(result.status);
            results.push(result);
        }

        tracing::info!(
            "Migration batch for workspace {} finished: {} success, {} warning, {} failed, {} skipped",
            workspace_id,
            totals.success,
            totals.warning,
            totals.failed,
            totals.skipped
        );

        Ok(BatchReport {
            workspace_id,
            results,
            totals,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            has_more,
            remaining_count,
        })
    }

    async fn migrate_map(
        &self,
        map_id: Uuid,
        options: MigrationOptions,
    ) -> Result<MigrationResult, MigrationError> {
        let record = self
            .store
            .get_map(map_id)
            .await
            .map_err(MigrationError::CandidateFetch)?
            .ok_or(MigrationError::MapNotFound(map_id))?;
        Ok(self.process_map(&record, &options).await)
    }
}

// ============================================================================
// Tests
// ============================================================================
