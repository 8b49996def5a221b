use serde::{Deserialize, Serialize};

/// Chat / group id as the roster stores it (opaque string).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for GroupId {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl TryFrom<&GroupId> for ChatId {
    type Error = crate::Error;

    fn try_from(group: &GroupId) -> crate::Result<Self> {
        group
            .0
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| crate::Error::Delivery(format!("group id is not a chat id: {group}")))
    }
}

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Provider-issued player id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(pub String);

impl StableId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A player tracked in one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedEntity {
    pub display_name: String,
    pub stable_id: StableId,
    pub last_known_metric: i64,
}

impl TrackedEntity {
    pub fn new(display_name: impl Into<String>, stable_id: StableId, metric: i64) -> Self {
        Self {
            display_name: display_name.into(),
            stable_id,
            last_known_metric: metric,
        }
    }
}

/// Result of resolving a nickname at the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPlayer {
    pub stable_id: StableId,
    pub metric: i64,
}

/// One row of a pre-upgrade roster: only the metric was stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyRecord {
    pub group: GroupId,
    pub display_name: String,
    pub metric: i64,
}

/// A match from the provider's history endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSummary {
    pub match_id: String,
    pub finished_at: Option<i64>,
    pub room_url: Option<String>,
}

/// One page of match history, newest first.
#[derive(Clone, Debug, Default)]
pub struct MatchPage {
    pub items: Vec<MatchSummary>,
}
