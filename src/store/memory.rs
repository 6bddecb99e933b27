//! In-memory implementation of MindMapStore.
//!
//! Backs integration tests and local demos using
//! `tokio::sync::RwLock<HashMap<K, V>>` collections. Supports failure
//! injection (candidate fetch, per-map content fetch, per-map migration
//! write, per-map status write) so the orchestrator's rollback and
//! error-absorption paths are testable, and keeps a journal of every
//! status write so tests can assert the two-phase persist discipline.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{CandidateFilter, MapContent, MigrationUpdate, MindMapRecord};
use super::traits::MindMapStore;
use crate::migration::models::MigrationStatus;

/// In-memory MindMapStore with seeding helpers and failure injection.
#[derive(Default)]
pub struct MemoryMapStore {
    pub maps: RwLock<HashMap<Uuid, MindMapRecord>>,
    pub contents: RwLock<HashMap<Uuid, MapContent>>,
    /// Last confirmed migration write per map
    pub migrations: RwLock<HashMap<Uuid, MigrationUpdate>>,
    /// Every status transition, in write order (for two-phase assertions)
    pub status_journal: RwLock<Vec<(Uuid, MigrationStatus)>>,

    // Failure injection
    pub fail_candidate_fetch: AtomicBool,
    pub fail_content_fetch: RwLock<HashSet<Uuid>>,
    pub fail_migration_write: RwLock<HashSet<Uuid>>,
    pub fail_status_write: RwLock<HashSet<Uuid>>,
}

impl MemoryMapStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a map record and its content.
    pub async fn seed_map(&self, record: MindMapRecord, content: MapContent) {
        self.contents.write().await.insert(record.id, content);
        self.maps.write().await.insert(record.id, record);
    }

    /// Builder-style seeding for test setup.
    pub async fn with_map(self, record: MindMapRecord, content: MapContent) -> Self {
        self.seed_map(record, content).await;
        self
    }

    /// Current status of a map, bypassing failure injection.
    pub async fn status_of(&self, map_id: Uuid) -> Option<MigrationStatus> {
        self.maps.read().await.get(&map_id).and_then(|r| r.status)
    }
}

#[async_trait]
impl MindMapStore for MemoryMapStore {
    async fn list_migration_candidates(
        &self,
        workspace_id: Uuid,
        filter: CandidateFilter,
        limit: usize,
    ) -> Result<Vec<MindMapRecord>> {
        if self.fail_candidate_fetch.load(Ordering::SeqCst) {
            bail!("injected candidate fetch failure");
        }
        let maps = self.maps.read().await;
        let mut candidates: Vec<MindMapRecord> = maps
            .values()
            .filter(|r| r.workspace_id == workspace_id && filter.matches(r.status))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn get_map(&self, map_id: Uuid) -> Result<Option<MindMapRecord>> {
        Ok(self.maps.read().await.get(&map_id).cloned())
    }

    async fn fetch_map_content(&self, map_id: Uuid) -> Result<MapContent> {
        if self.fail_content_fetch.read().await.contains(&map_id) {
            bail!("injected content fetch failure for map {}", map_id);
        }
        self.contents
            .read()
            .await
            .get(&map_id)
            .cloned()
            .ok_or_else(|| anyhow!("no content stored for map {}", map_id))
    }

    async fn read_migration_status(&self, map_id: Uuid) -> Result<Option<MigrationStatus>> {
        Ok(self.maps.read().await.get(&map_id).and_then(|r| r.status))
    }

    async fn write_migration_status(&self, map_id: Uuid, status: MigrationStatus) -> Result<()> {
        if self.fail_status_write.read().await.contains(&map_id) {
            bail!("injected status write failure for map {}", map_id);
        }
        let mut maps = self.maps.write().await;
        let record = maps
            .get_mut(&map_id)
            .ok_or_else(|| anyhow!("unknown map {}", map_id))?;
        record.status = Some(status);
        self.status_journal.write().await.push((map_id, status));
        Ok(())
    }

    async fn write_migration(&self, map_id: Uuid, update: &MigrationUpdate) -> Result<()> {
        if self.fail_migration_write.read().await.contains(&map_id) {
            bail!("injected migration write failure for map {}", map_id);
        }
        let mut maps = self.maps.write().await;
        let record = maps
            .get_mut(&map_id)
            .ok_or_else(|| anyhow!("unknown map {}", map_id))?;
        record.status = Some(update.status);
        self.migrations.write().await.insert(map_id, update.clone());
        self.status_journal
            .write()
            .await
            .push((map_id, update.status));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(workspace_id: Uuid, title: &str, offset_secs: i64) -> MindMapRecord {
        MindMapRecord {
            id: Uuid::new_v4(),
            workspace_id,
            title: title.to_string(),
            status: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_candidates_ordered_by_creation_and_limited() {
        let store = MemoryMapStore::new();
        let ws = Uuid::new_v4();
        let late = record(ws, "late", 100);
        let early = record(ws, "early", 0);
        let mid = record(ws, "mid", 50);
        for r in [&late, &early, &mid] {
            store.seed_map(r.clone(), MapContent::default()).await;
        }

        let all = store
            .list_migration_candidates(ws, CandidateFilter::NeedsMigration, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, early.id);
        assert_eq!(all[1].id, mid.id);
        assert_eq!(all[2].id, late.id);

        let page = store
            .list_migration_candidates(ws, CandidateFilter::NeedsMigration, 2)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, early.id);
    }

    #[tokio::test]
    async fn test_filter_excludes_terminal_statuses() {
        let store = MemoryMapStore::new();
        let ws = Uuid::new_v4();
        let mut done = record(ws, "done", 0);
        done.status = Some(MigrationStatus::Success);
        let retry = {
            let mut r = record(ws, "retry", 1);
            r.status = Some(MigrationStatus::Failed);
            r
        };
        let fresh = record(ws, "fresh", 2);
        for r in [&done, &retry, &fresh] {
            store.seed_map(r.clone(), MapContent::default()).await;
        }

        let normal = store
            .list_migration_candidates(ws, CandidateFilter::NeedsMigration, 10)
            .await
            .unwrap();
        assert_eq!(normal.len(), 2);
        assert!(normal.iter().all(|r| r.id != done.id));

        let forced = store
            .list_migration_candidates(ws, CandidateFilter::Any, 10)
            .await
            .unwrap();
        assert_eq!(forced.len(), 3);
    }

    #[tokio::test]
    async fn test_status_writes_journaled() {
        let store = MemoryMapStore::new();
        let ws = Uuid::new_v4();
        let map = record(ws, "map", 0);
        store.seed_map(map.clone(), MapContent::default()).await;

        store
            .write_migration_status(map.id, MigrationStatus::InProgress)
            .await
            .unwrap();
        store
            .write_migration_status(map.id, MigrationStatus::Failed)
            .await
            .unwrap();

        let journal = store.status_journal.read().await;
        assert_eq!(
            *journal,
            vec![
                (map.id, MigrationStatus::InProgress),
                (map.id, MigrationStatus::Failed)
            ]
        );
        assert_eq!(store.status_of(map.id).await, Some(MigrationStatus::Failed));
        assert_eq!(
            store.read_migration_status(map.id).await.unwrap(),
            Some(MigrationStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryMapStore::new();
        let ws = Uuid::new_v4();
        let map = record(ws, "map", 0);
        store.seed_map(map.clone(), MapContent::default()).await;

        store.fail_content_fetch.write().await.insert(map.id);
        assert!(store.fetch_map_content(map.id).await.is_err());

        store.fail_candidate_fetch.store(true, Ordering::SeqCst);
        assert!(store
            .list_migration_candidates(ws, CandidateFilter::Any, 10)
            .await
            .is_err());
    }
}
