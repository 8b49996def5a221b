use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::{document::RosterDocument, RosterStore};
use crate::{
    domain::{GroupId, LegacyRecord, StableId, TrackedEntity},
    Error, Result,
};

/// Roster kept as one JSON document.
///
/// All operations go through a single async lock; mutations are applied to a
/// copy, written with write-then-rename, and only then become visible. Without a
/// path the store lives in memory only.
#[derive(Debug)]
pub struct JsonRosterStore {
    path: Option<PathBuf>,
    doc: Mutex<RosterDocument>,
}

impl JsonRosterStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::Storage(format!(
                        "failed to create roster directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let doc = load_document(&path).await?;
        tracing::debug!(path = %path.display(), "json roster opened");

        Ok(Self {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(RosterDocument::default()),
        }
    }

    /// Apply `op` to a copy of the document, persist it, then publish it.
    async fn mutate<T>(&self, op: impl FnOnce(&mut RosterDocument) -> T) -> Result<T> {
        let mut guard = self.doc.lock().await;
        let mut next = guard.clone();
        let out = op(&mut next);
        if next != *guard {
            if let Some(path) = &self.path {
                save_document(path, &next).await?;
            }
            *guard = next;
        }
        Ok(out)
    }
}

async fn load_document(path: &Path) -> Result<RosterDocument> {
    if !path.exists() {
        return Ok(RosterDocument::default());
    }
    let txt = fs::read_to_string(path).await?;
    if txt.trim().is_empty() {
        return Ok(RosterDocument::default());
    }
    serde_json::from_str(&txt).map_err(|e| {
        Error::Storage(format!("corrupt roster file {}: {e}", path.display()))
    })
}

async fn save_document(path: &Path, doc: &RosterDocument) -> Result<()> {
    let txt = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, txt).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl RosterStore for JsonRosterStore {
    async fn list(&self, group: &GroupId) -> Result<Vec<TrackedEntity>> {
        Ok(self.doc.lock().await.list(group))
    }

    async fn upsert(&self, group: &GroupId, entity: TrackedEntity) -> Result<()> {
        self.mutate(|doc| doc.upsert(group, entity)).await
    }

    async fn remove(&self, group: &GroupId, display_name: &str) -> Result<bool> {
        self.mutate(|doc| doc.remove(group, display_name)).await
    }

    async fn all_group_ids(&self) -> Result<Vec<GroupId>> {
        Ok(self.doc.lock().await.group_ids())
    }

    async fn record_metric(
        &self,
        group: &GroupId,
        display_name: &str,
        stable_id: &StableId,
        metric: i64,
    ) -> Result<Option<i64>> {
        self.mutate(|doc| doc.record_metric(group, display_name, stable_id, metric))
            .await
    }

    async fn legacy_records(&self) -> Result<Vec<LegacyRecord>> {
        Ok(self.doc.lock().await.legacy_records())
    }
}
