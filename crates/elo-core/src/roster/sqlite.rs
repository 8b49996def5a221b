use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::RosterStore;
use crate::{
    domain::{GroupId, LegacyRecord, StableId, TrackedEntity},
    Error, Result,
};

/// Rows with a NULL `stable_id` are legacy (metric-only) records.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roster (
    group_id     TEXT    NOT NULL,
    display_name TEXT    NOT NULL,
    stable_id    TEXT,
    metric       INTEGER NOT NULL,
    updated_at   TEXT    NOT NULL,
    PRIMARY KEY (group_id, display_name)
);
"#;

/// SQLite-backed roster.
///
/// `rusqlite` is blocking, so every call runs on the blocking pool while holding
/// the connection mutex; each call is one statement or one transaction.
#[derive(Clone)]
pub struct SqliteRosterStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRosterStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(&path)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(path = %path.display(), journal_mode = %mode, "sqlite roster opened");
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|e| Error::Storage(format!("sqlite open task failed: {e}")))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database (tests, throwaway runs).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("sqlite connection mutex poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("sqlite task failed: {e}")))?
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn list(&self, group: &GroupId) -> Result<Vec<TrackedEntity>> {
        let group = group.0.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT display_name, stable_id, metric FROM roster
                 WHERE group_id = ?1 AND stable_id IS NOT NULL
                 ORDER BY display_name",
            )?;
            let rows = stmt.query_map(params![group], |row| {
                Ok(TrackedEntity::new(
                    row.get::<_, String>(0)?,
                    StableId(row.get(1)?),
                    row.get(2)?,
                ))
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn upsert(&self, group: &GroupId, entity: TrackedEntity) -> Result<()> {
        let group = group.0.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO roster (group_id, display_name, stable_id, metric, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(group_id, display_name) DO UPDATE SET
                    stable_id = excluded.stable_id,
                    metric = excluded.metric,
                    updated_at = excluded.updated_at",
                params![
                    group,
                    entity.display_name,
                    entity.stable_id.0,
                    entity.last_known_metric,
                    now()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, group: &GroupId, display_name: &str) -> Result<bool> {
        let group = group.0.clone();
        let name = display_name.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM roster WHERE group_id = ?1 AND display_name = ?2",
                params![group, name],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn all_group_ids(&self) -> Result<Vec<GroupId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT group_id FROM roster ORDER BY group_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0).map(GroupId))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn record_metric(
        &self,
        group: &GroupId,
        display_name: &str,
        stable_id: &StableId,
        metric: i64,
    ) -> Result<Option<i64>> {
        let group = group.0.clone();
        let name = display_name.to_string();
        let id = stable_id.0.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let previous: Option<i64> = tx
                .query_row(
                    "SELECT metric FROM roster
                     WHERE group_id = ?1 AND display_name = ?2 AND stable_id = ?3",
                    params![group, name, id],
                    |row| row.get(0),
                )
                .optional()?;
            if previous.is_some() {
                tx.execute(
                    "UPDATE roster SET metric = ?4, updated_at = ?5
                     WHERE group_id = ?1 AND display_name = ?2 AND stable_id = ?3",
                    params![group, name, id, metric, now()],
                )?;
            }
            tx.commit()?;
            Ok(previous)
        })
        .await
    }

    async fn legacy_records(&self) -> Result<Vec<LegacyRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT group_id, display_name, metric FROM roster
                 WHERE stable_id IS NULL
                 ORDER BY group_id, display_name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(LegacyRecord {
                    group: GroupId(row.get(0)?),
                    display_name: row.get(1)?,
                    metric: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}
