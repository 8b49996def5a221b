//! FACEIT Data API adapter.
//!
//! Implements the core `MetricFetcher` port over `https://open.faceit.com/data/v4`.
//! Every call is a single bearer-authenticated GET bounded by the client timeout.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

use elo_core::{
    domain::{MatchPage, MatchSummary, ResolvedPlayer, StableId},
    errors::Error,
    ports::MetricFetcher,
    Result,
};

const MAX_HISTORY_PAGE: u32 = 100;

#[derive(Clone, Debug)]
pub struct FaceitClient {
    api_key: String,
    base_url: String,
    game: String,
    http: reqwest::Client,
}

impl FaceitClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        game: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            game: game.into(),
            http,
        })
    }

    pub fn from_config(cfg: &elo_core::config::Config) -> Result<Self> {
        Self::new(
            cfg.faceit_api_key.clone(),
            cfg.faceit_api_base.clone(),
            cfg.game.clone(),
            cfg.fetch_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Player details by nickname; 404 is `NotFound`.
    async fn lookup(&self, display_name: &str) -> Result<PlayerDetails> {
        let resp = self
            .get(
                self.url("/players"),
                &[("nickname", display_name.to_string())],
            )
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(display_name.to_string()));
        }
        let body = read_success_body(resp).await?;
        parse_details(&body)
    }

    async fn get(&self, url: String, query: &[(&str, String)]) -> Result<reqwest::Response> {
        tracing::debug!(%url, "faceit GET");
        self.http
            .get(url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("faceit request error: {e}")))
    }
}

#[async_trait]
impl MetricFetcher for FaceitClient {
    async fn resolve(&self, display_name: &str) -> Result<ResolvedPlayer> {
        let details = self.lookup(display_name).await?;
        rated_player(details, &self.game)
            .ok_or_else(|| Error::NotFound(display_name.to_string()))
    }

    async fn resolve_id(&self, display_name: &str) -> Result<StableId> {
        Ok(StableId(self.lookup(display_name).await?.player_id))
    }

    async fn fetch(&self, stable_id: &StableId) -> Result<i64> {
        let resp = self
            .get(self.url(&format!("/players/{}", stable_id.0)), &[])
            .await?;
        let body = read_success_body(resp).await?;
        let player = parse_player(&body, &self.game)?.ok_or_else(|| {
            Error::Unavailable(format!("no {} rating for {}", self.game, stable_id.0))
        })?;
        Ok(player.metric)
    }

    async fn match_history(
        &self,
        stable_id: &StableId,
        offset: u32,
        limit: u32,
    ) -> Result<MatchPage> {
        let limit = limit.clamp(1, MAX_HISTORY_PAGE);
        let resp = self
            .get(
                self.url(&format!("/players/{}/history", stable_id.0)),
                &[
                    ("game", self.game.clone()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let body = read_success_body(resp).await?;
        parse_history(&body)
    }
}

async fn read_success_body(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Unavailable(format!(
            "faceit returned {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    resp.text()
        .await
        .map_err(|e| Error::Unavailable(format!("faceit body error: {e}")))
}

#[derive(Debug, Deserialize)]
struct PlayerDetails {
    player_id: String,
    #[serde(default)]
    games: HashMap<String, GameDetails>,
}

#[derive(Debug, Deserialize)]
struct GameDetails {
    faceit_elo: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    match_id: String,
    finished_at: Option<i64>,
    faceit_url: Option<String>,
}

fn parse_details(body: &str) -> Result<PlayerDetails> {
    serde_json::from_str(body).map_err(|e| Error::Unavailable(format!("faceit json error: {e}")))
}

/// `None` when the player has no rated profile for `game`.
fn rated_player(details: PlayerDetails, game: &str) -> Option<ResolvedPlayer> {
    let metric = details.games.get(game).and_then(|g| g.faceit_elo)?;
    Some(ResolvedPlayer {
        stable_id: StableId(details.player_id),
        metric,
    })
}

fn parse_player(body: &str, game: &str) -> Result<Option<ResolvedPlayer>> {
    Ok(rated_player(parse_details(body)?, game))
}

fn parse_history(body: &str) -> Result<MatchPage> {
    let page: HistoryPage = serde_json::from_str(body)
        .map_err(|e| Error::Unavailable(format!("faceit json error: {e}")))?;

    Ok(MatchPage {
        items: page
            .items
            .into_iter()
            .map(|item| MatchSummary {
                match_id: item.match_id,
                finished_at: item.finished_at,
                room_url: item.faceit_url.map(|u| u.replace("{lang}", "en")),
            })
            .collect(),
    })
}
