//! Hand-written fakes for the core ports.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MatchPage, MatchSummary, MessageId, MessageRef, ResolvedPlayer, StableId},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    ports::MetricFetcher,
    Error, Result,
};

#[derive(Clone, Debug)]
pub enum FetchBehavior {
    Value(i64),
    Unavailable,
    Hang,
}

#[derive(Default)]
pub struct FakeFetcher {
    players: Mutex<HashMap<String, ResolvedPlayer>>,
    unrated: Mutex<HashMap<String, StableId>>,
    fetches: Mutex<HashMap<StableId, FetchBehavior>>,
    history: Mutex<HashMap<StableId, Vec<MatchSummary>>>,
    unavailable_resolve: Mutex<HashSet<String>>,
    fetch_calls: AtomicUsize,
}

impl FakeFetcher {
    /// Register a player the provider knows about; `fetch` returns `metric` too.
    pub fn with_player(self, name: &str, id: &str, metric: i64) -> Self {
        self.set_player(name, id, metric);
        self
    }

    pub fn set_player(&self, name: &str, id: &str, metric: i64) {
        let stable_id = StableId(id.to_string());
        self.players.lock().unwrap().insert(
            name.to_lowercase(),
            ResolvedPlayer {
                stable_id: stable_id.clone(),
                metric,
            },
        );
        self.set_fetch(id, FetchBehavior::Value(metric));
    }

    /// A player who exists at the provider but has no rating for the game.
    pub fn with_unrated_player(self, name: &str, id: &str) -> Self {
        self.unrated
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), StableId(id.to_string()));
        self
    }

    pub fn set_fetch(&self, id: &str, behavior: FetchBehavior) {
        self.fetches
            .lock()
            .unwrap()
            .insert(StableId(id.to_string()), behavior);
    }

    pub fn set_resolve_unavailable(&self, name: &str) {
        self.unavailable_resolve
            .lock()
            .unwrap()
            .insert(name.to_lowercase());
    }

    pub fn set_history(&self, id: &str, items: Vec<MatchSummary>) {
        self.history
            .lock()
            .unwrap()
            .insert(StableId(id.to_string()), items);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricFetcher for FakeFetcher {
    async fn resolve(&self, display_name: &str) -> Result<ResolvedPlayer> {
        let key = display_name.to_lowercase();
        if self.unavailable_resolve.lock().unwrap().contains(&key) {
            return Err(Error::Unavailable("fake resolve outage".to_string()));
        }
        self.players
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(display_name.to_string()))
    }

    async fn resolve_id(&self, display_name: &str) -> Result<StableId> {
        match self.resolve(display_name).await {
            Ok(player) => Ok(player.stable_id),
            Err(Error::NotFound(_)) => self
                .unrated
                .lock()
                .unwrap()
                .get(&display_name.to_lowercase())
                .cloned()
                .ok_or_else(|| Error::NotFound(display_name.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, stable_id: &StableId) -> Result<i64> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.fetches.lock().unwrap().get(stable_id).cloned();
        match behavior {
            Some(FetchBehavior::Value(v)) => Ok(v),
            Some(FetchBehavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Unavailable("hung".to_string()))
            }
            Some(FetchBehavior::Unavailable) | None => {
                Err(Error::Unavailable(format!("fake outage for {}", stable_id.0)))
            }
        }
    }

    async fn match_history(
        &self,
        stable_id: &StableId,
        offset: u32,
        limit: u32,
    ) -> Result<MatchPage> {
        let all = self
            .history
            .lock()
            .unwrap()
            .get(stable_id)
            .cloned()
            .ok_or_else(|| Error::Unavailable("no history".to_string()))?;
        Ok(MatchPage {
            items: all
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sends: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<HashSet<i64>>,
}

impl FakeMessenger {
    pub fn fail_chat(&self, chat_id: i64) {
        self.failing.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sends.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| c.0 == chat_id)
            .map(|(_, html)| html)
            .collect()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        if self.failing.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::Delivery(format!("bot was kicked from {}", chat_id.0)));
        }
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        })
    }
}
