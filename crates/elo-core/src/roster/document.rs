use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{GroupId, LegacyRecord, StableId, TrackedEntity};

/// On-disk shape: `{ "<group>": { "<name>": {"id": "...", "elo": 1800} } }`.
///
/// Older files stored a bare integer per name; those still deserialize and are
/// reported through `legacy_records` until the startup migration upgrades them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct RosterDocument {
    groups: BTreeMap<String, BTreeMap<String, StoredRecord>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current { id: String, elo: i64 },
    Legacy(i64),
}

impl RosterDocument {
    pub fn list(&self, group: &GroupId) -> Vec<TrackedEntity> {
        let Some(players) = self.groups.get(group.as_str()) else {
            return Vec::new();
        };
        players
            .iter()
            .filter_map(|(name, rec)| match rec {
                StoredRecord::Current { id, elo } => Some(TrackedEntity::new(
                    name.clone(),
                    StableId(id.clone()),
                    *elo,
                )),
                StoredRecord::Legacy(_) => None,
            })
            .collect()
    }

    pub fn upsert(&mut self, group: &GroupId, entity: TrackedEntity) {
        self.groups.entry(group.0.clone()).or_default().insert(
            entity.display_name,
            StoredRecord::Current {
                id: entity.stable_id.0,
                elo: entity.last_known_metric,
            },
        );
    }

    pub fn remove(&mut self, group: &GroupId, display_name: &str) -> bool {
        let Some(players) = self.groups.get_mut(group.as_str()) else {
            return false;
        };
        let removed = players.remove(display_name).is_some();
        if players.is_empty() {
            self.groups.remove(group.as_str());
        }
        removed
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.keys().cloned().map(GroupId).collect()
    }

    pub fn record_metric(
        &mut self,
        group: &GroupId,
        display_name: &str,
        stable_id: &StableId,
        metric: i64,
    ) -> Option<i64> {
        let rec = self.groups.get_mut(group.as_str())?.get_mut(display_name)?;
        match rec {
            StoredRecord::Current { id, elo } if *id == stable_id.0 => {
                Some(std::mem::replace(elo, metric))
            }
            _ => None,
        }
    }

    pub fn legacy_records(&self) -> Vec<LegacyRecord> {
        let mut out = Vec::new();
        for (group, players) in &self.groups {
            for (name, rec) in players {
                if let StoredRecord::Legacy(metric) = rec {
                    out.push(LegacyRecord {
                        group: GroupId(group.clone()),
                        display_name: name.clone(),
                        metric: *metric,
                    });
                }
            }
        }
        out
    }
}
