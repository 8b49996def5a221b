//! Roster persistence: per group, display name -> (stable id, last known metric).
//!
//! Every operation is a single store call that is atomic for its row, so the
//! reconciliation loop and command handlers can run against the same store
//! concurrently without lost updates.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::StoreLocation,
    domain::{GroupId, LegacyRecord, StableId, TrackedEntity},
    Result,
};

mod document;
pub mod json;
pub mod sqlite;

pub use json::JsonRosterStore;
pub use sqlite::SqliteRosterStore;

#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Entities of a group, ordered by display name. Legacy rows are not listed.
    async fn list(&self, group: &GroupId) -> Result<Vec<TrackedEntity>>;

    /// Insert or overwrite an entity (stable id and metric unconditionally).
    async fn upsert(&self, group: &GroupId, entity: TrackedEntity) -> Result<()>;

    /// Delete an entity. Returns false when it was not present.
    async fn remove(&self, group: &GroupId, display_name: &str) -> Result<bool>;

    /// Every group that currently owns at least one row.
    async fn all_group_ids(&self) -> Result<Vec<GroupId>>;

    /// Replace the stored metric of an existing entity and return the value it
    /// replaced.
    ///
    /// `stable_id` is the player the metric was fetched for. Returns `None` (and
    /// writes nothing) when the entity is gone or now points at another player.
    async fn record_metric(
        &self,
        group: &GroupId,
        display_name: &str,
        stable_id: &StableId,
        metric: i64,
    ) -> Result<Option<i64>>;

    /// Rows still in the pre-upgrade shape (metric only, no stable id).
    async fn legacy_records(&self) -> Result<Vec<LegacyRecord>>;
}

/// Open the store described by `ROSTER_STORE_URL`.
pub async fn open(location: &StoreLocation) -> Result<Arc<dyn RosterStore>> {
    let store: Arc<dyn RosterStore> = match location {
        StoreLocation::Json(path) => Arc::new(JsonRosterStore::open(path).await?),
        StoreLocation::Sqlite(path) => Arc::new(SqliteRosterStore::open(path).await?),
        StoreLocation::Memory => Arc::new(JsonRosterStore::in_memory()),
    };
    Ok(store)
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share.

    use super::*;

    fn entity(name: &str, id: &str, metric: i64) -> TrackedEntity {
        TrackedEntity::new(name, StableId(id.to_string()), metric)
    }

    pub async fn exercise(store: &dyn RosterStore) {
        let g = GroupId("-100".into());
        let other = GroupId("7".into());

        assert!(store.list(&g).await.unwrap().is_empty());
        assert!(store.all_group_ids().await.unwrap().is_empty());

        store.upsert(&g, entity("bob", "id-b", 2000)).await.unwrap();
        store.upsert(&g, entity("Alice", "id-a", 1800)).await.unwrap();
        store.upsert(&other, entity("carol", "id-c", 900)).await.unwrap();

        // Ordered by display name, case-sensitive.
        let names: Vec<_> = store
            .list(&g)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.display_name)
            .collect();
        assert_eq!(names, vec!["Alice", "bob"]);
        assert_eq!(store.all_group_ids().await.unwrap(), vec![g.clone(), other.clone()]);

        // Re-registration overwrites instead of duplicating.
        store.upsert(&g, entity("Alice", "id-a2", 1850)).await.unwrap();
        let listed = store.list(&g).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], entity("Alice", "id-a2", 1850));

        // A value fetched for the previous player must not land on the new one.
        assert_eq!(
            store
                .record_metric(&g, "Alice", &StableId("id-a".into()), 1700)
                .await
                .unwrap(),
            None
        );
        assert_eq!(store.list(&g).await.unwrap()[0], entity("Alice", "id-a2", 1850));

        let bob = StableId("id-b".into());
        assert_eq!(store.record_metric(&g, "bob", &bob, 2015).await.unwrap(), Some(2000));
        assert_eq!(store.record_metric(&g, "bob", &bob, 2015).await.unwrap(), Some(2015));
        assert_eq!(
            store.record_metric(&g, "ghost", &StableId("id-g".into()), 1).await.unwrap(),
            None
        );
        assert!(store.list(&g).await.unwrap().iter().all(|e| e.display_name != "ghost"));

        assert!(store.remove(&g, "bob").await.unwrap());
        assert!(!store.remove(&g, "bob").await.unwrap());
        assert_eq!(store.record_metric(&g, "bob", &bob, 3000).await.unwrap(), None);
        assert_eq!(store.list(&g).await.unwrap().len(), 1);

        assert!(store.remove(&other, "carol").await.unwrap());
        assert_eq!(store.all_group_ids().await.unwrap(), vec![g]);
    }
}
