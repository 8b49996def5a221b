//! Command semantics, independent of the chat transport.
//!
//! The Telegram adapter parses an update into a [`Command`] and sends back
//! whatever [`CommandService::handle`] returns; every known command yields
//! exactly one reply.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    domain::{GroupId, MatchSummary, TrackedEntity},
    formatting::escape_html,
    messaging::types::Command,
    ports::MetricFetcher,
    reconcile::fetch_all,
    report::{format_stats, rank, Change, RankedEntry},
    roster::RosterStore,
    Error, Result,
};

/// Outcome of `/stats`.
#[derive(Clone, Debug, Default)]
pub struct StatsOutcome {
    pub entries: Vec<RankedEntry>,
    /// Players whose refresh failed (left out of `entries`).
    pub omitted: usize,
}

pub struct CommandService {
    store: Arc<dyn RosterStore>,
    fetcher: Arc<dyn MetricFetcher>,
    fetch_timeout: Duration,
    game_label: String,
}

impl CommandService {
    pub fn new(
        store: Arc<dyn RosterStore>,
        fetcher: Arc<dyn MetricFetcher>,
        fetch_timeout: Duration,
        game: &str,
    ) -> Self {
        Self {
            store,
            fetcher,
            fetch_timeout,
            game_label: game.to_uppercase(),
        }
    }

    /// Resolve `name` at the provider and (re)register it in `group`.
    pub async fn register(&self, group: &GroupId, name: &str) -> Result<TrackedEntity> {
        let resolved = self.fetcher.resolve(name).await?;
        let entity = TrackedEntity::new(name, resolved.stable_id, resolved.metric);
        self.store.upsert(group, entity.clone()).await?;
        Ok(entity)
    }

    /// Returns false when `name` was not on the roster.
    pub async fn unregister(&self, group: &GroupId, name: &str) -> Result<bool> {
        self.store.remove(group, name).await
    }

    /// Refresh every player of `group`, advance their baselines and rank them.
    ///
    /// `None` when the roster is empty.
    pub async fn stats(&self, group: &GroupId) -> Result<Option<StatsOutcome>> {
        let entities = self.store.list(group).await?;
        if entities.is_empty() {
            return Ok(None);
        }

        let results = fetch_all(&self.fetcher, &entities, self.fetch_timeout).await;

        let mut current = Vec::with_capacity(entities.len());
        let mut omitted = 0usize;
        for (entity, result) in entities.into_iter().zip(results) {
            let metric = match result {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(
                        group = %group,
                        player = %entity.display_name,
                        error = %e,
                        "stats refresh failed"
                    );
                    omitted += 1;
                    continue;
                }
            };

            // Removed or re-registered concurrently: drop it from the reply.
            let Some(previous) = self
                .store
                .record_metric(group, &entity.display_name, &entity.stable_id, metric)
                .await?
            else {
                continue;
            };
            current.push(Change::new(entity.display_name, metric, metric - previous));
        }

        Ok(Some(StatsOutcome {
            entries: rank(current),
            omitted,
        }))
    }

    /// Most recent match of a player registered in `group`.
    pub async fn last_match(&self, group: &GroupId, name: &str) -> Result<Option<MatchSummary>> {
        let entity = self
            .store
            .list(group)
            .await?
            .into_iter()
            .find(|e| e.display_name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let page = self.fetcher.match_history(&entity.stable_id, 0, 1).await?;
        Ok(page.items.into_iter().next())
    }

    /// Run a command and build its reply. `None` for commands this bot does not know.
    pub async fn handle(&self, cmd: &Command, bot_username: Option<&str>) -> Option<String> {
        let group = cmd.group();
        let reply = match cmd.name.as_str() {
            "start" | "help" => self.start_reply(cmd.is_private, bot_username),
            "register" => match cmd.first_arg() {
                Some(name) => self.register_reply(&group, name).await,
                None => "⚠️ Usage: /register &lt;nickname&gt;".to_string(),
            },
            "unregister" => match cmd.first_arg() {
                Some(name) => self.unregister_reply(&group, name).await,
                None => "⚠️ Usage: /unregister &lt;nickname&gt;".to_string(),
            },
            "stats" | "list" => self.stats_reply(&group).await,
            "last" => match cmd.first_arg() {
                Some(name) => self.last_reply(&group, name).await,
                None => "⚠️ Usage: /last &lt;nickname&gt;".to_string(),
            },
            _ => return None,
        };

        tracing::info!(group = %group, command = %cmd.name, "command handled");
        Some(reply)
    }

    fn start_reply(&self, is_private: bool, bot_username: Option<&str>) -> String {
        if is_private {
            let mut body = format!(
                "👋 Hi! I track FACEIT {} ELO for players in group chats.\n\
Add me to a group to follow your friends' progress.",
                self.game_label
            );
            if let Some(bot) = bot_username {
                body.push_str(&format!(
                    "\n\n➕ https://t.me/{}?startgroup=true",
                    escape_html(bot)
                ));
            }
            return body;
        }

        "👋 Hi, I'm now tracking players in this group!\n\n\
<b>📋 Commands:</b>\n\
/register &lt;nickname&gt; - Start tracking a player\n\
/unregister &lt;nickname&gt; - Stop tracking a player\n\
/stats - Current ranking with changes\n\
/last &lt;nickname&gt; - Most recent match"
            .to_string()
    }

    async fn register_reply(&self, group: &GroupId, name: &str) -> String {
        let shown = escape_html(name);
        match self.register(group, name).await {
            Ok(entity) => format!(
                "✅ {shown} added to the list. 🎯 {} ELO",
                entity.last_known_metric
            ),
            Err(Error::NotFound(_)) => format!(
                "🚫 Player {shown} not found or has no {} profile.",
                self.game_label
            ),
            Err(e) => failure_reply(group, "register", e),
        }
    }

    async fn unregister_reply(&self, group: &GroupId, name: &str) -> String {
        let shown = escape_html(name);
        match self.unregister(group, name).await {
            Ok(true) => format!("🗑 {shown} removed from the list."),
            Ok(false) => format!("🚫 {shown} is not on the list."),
            Err(e) => failure_reply(group, "unregister", e),
        }
    }

    async fn stats_reply(&self, group: &GroupId) -> String {
        match self.stats(group).await {
            Ok(None) => "📭 The list is empty. Add players with /register &lt;nickname&gt;".to_string(),
            Ok(Some(out)) => format_stats(&out.entries, out.omitted),
            Err(e) => failure_reply(group, "stats", e),
        }
    }

    async fn last_reply(&self, group: &GroupId, name: &str) -> String {
        let shown = escape_html(name);
        match self.last_match(group, name).await {
            Ok(Some(m)) => format_last_match(&shown, &m),
            Ok(None) => format!("📭 {shown} has no {} matches yet.", self.game_label),
            Err(Error::NotFound(_)) => format!("🚫 {shown} is not on the list."),
            Err(e) => failure_reply(group, "last", e),
        }
    }
}

fn failure_reply(group: &GroupId, command: &str, e: Error) -> String {
    match e {
        Error::Unavailable(_) => {
            tracing::info!(group = %group, command, error = %e, "provider unavailable");
            "⚠️ FACEIT is not responding right now, try again later.".to_string()
        }
        other if other.is_storage() => {
            tracing::warn!(group = %group, command, error = %other, "roster storage failed");
            "⚠️ Something went wrong, try again later.".to_string()
        }
        other => {
            tracing::warn!(group = %group, command, error = %other, "command failed");
            "⚠️ Something went wrong, try again later.".to_string()
        }
    }
}

fn format_last_match(shown_name: &str, m: &MatchSummary) -> String {
    let mut lines = vec![format!("🎮 <b>Last match of {shown_name}</b>")];
    lines.push(format!("Match: <code>{}</code>", escape_html(&m.match_id)));
    if let Some(finished) = m.finished_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        lines.push(format!("Finished: {}", finished.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(url) = &m.room_url {
        lines.push(escape_html(url));
    }
    lines.join("\n")
}
