use async_trait::async_trait;

use crate::{
    domain::{MatchPage, ResolvedPlayer, StableId},
    Result,
};

/// Hexagonal port for the rating provider.
///
/// Implementations are thin one-shot request wrappers: no retries, no caching,
/// bounded by a timeout. Errors are reported as `Error::NotFound` (player unknown
/// or not eligible) or `Error::Unavailable` (anything transient).
#[async_trait]
pub trait MetricFetcher: Send + Sync {
    /// Look a player up by nickname and return the id + current metric.
    async fn resolve(&self, display_name: &str) -> Result<ResolvedPlayer>;

    /// Provider id of an existing player, whether or not they are rated in the
    /// tracked game. `Error::NotFound` only when the player does not exist.
    async fn resolve_id(&self, display_name: &str) -> Result<StableId>;

    /// Current metric for an already-resolved player.
    async fn fetch(&self, stable_id: &StableId) -> Result<i64>;

    /// One page of the player's match history, newest first.
    async fn match_history(&self, stable_id: &StableId, offset: u32, limit: u32)
        -> Result<MatchPage>;
}
