//! Generic flat-resource sync engine
//!
//! Flat resources (segments, reports, send/open/click events, mailing
//! approvals) have no nested children and never change once recorded, so
//! syncing is a pure set difference: everything already persisted (by
//! natural key) is skipped, everything else inserts, nothing updates or
//! deletes. Running the same listing twice therefore inserts zero rows the
//! second time.

use crate::models::NaturalKey;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use tracing::info;

/// Persistence seam for flat resources
#[async_trait]
pub trait FlatEntity: NaturalKey + Sized + Send + Sync {
    /// Table name, for logging
    const TABLE: &'static str;

    /// Load every persisted row of this type
    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>>;

    /// Insert one row inside the sync transaction
    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()>;
}

/// Outcome of one flat sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatSyncReport {
    pub fetched: usize,
    pub inserted: usize,
}

/// Diff an incoming listing against the persisted set and insert the
/// difference in one transaction.
///
/// Dedup is two-layered: batch-internal (the same key twice in one listing
/// keeps the first occurrence) and against the store.
pub async fn sync_flat<E: FlatEntity>(pool: &SqlitePool, incoming: Vec<E>) -> Result<FlatSyncReport> {
    let fetched = incoming.len();

    let existing: HashSet<E::Key> = E::load_all(pool)
        .await?
        .iter()
        .map(NaturalKey::natural_key)
        .collect();

    let mut seen: HashSet<E::Key> = HashSet::new();
    let fresh: Vec<E> = incoming
        .into_iter()
        .filter(|item| {
            let key = item.natural_key();
            !existing.contains(&key) && seen.insert(key)
        })
        .collect();

    let inserted = fresh.len();
    if inserted > 0 {
        let mut tx = pool.begin().await?;
        for item in &fresh {
            item.insert(&mut tx).await?;
        }
        tx.commit().await?;
    }

    info!(table = E::TABLE, fetched, inserted, "Flat sync complete");

    Ok(FlatSyncReport { fetched, inserted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use databridge_common::db::init_memory_database;

    fn segment(id: i64, name: &str) -> Segment {
        Segment {
            segment_id: id,
            name: Some(name.to_string()),
            description: None,
            member_count: None,
        }
    }

    #[tokio::test]
    async fn inserts_only_the_difference() {
        let pool = init_memory_database().await.unwrap();

        let first = sync_flat(&pool, vec![segment(1, "a"), segment(2, "b")])
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);

        let second = sync_flat(&pool, vec![segment(1, "a"), segment(2, "b"), segment(3, "c")])
            .await
            .unwrap();
        assert_eq!(second.fetched, 3);
        assert_eq!(second.inserted, 1);
    }

    #[tokio::test]
    async fn identical_rerun_inserts_nothing() {
        let pool = init_memory_database().await.unwrap();
        let listing = || vec![segment(42, "answer")];

        assert_eq!(sync_flat(&pool, listing()).await.unwrap().inserted, 1);
        assert_eq!(sync_flat(&pool, listing()).await.unwrap().inserted, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn batch_internal_duplicates_collapse() {
        let pool = init_memory_database().await.unwrap();

        let report = sync_flat(&pool, vec![segment(7, "x"), segment(7, "x")])
            .await
            .unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn empty_listing_is_a_noop() {
        let pool = init_memory_database().await.unwrap();
        let report = sync_flat::<Segment>(&pool, Vec::new()).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.inserted, 0);
    }
}
