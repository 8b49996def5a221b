use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two sends (bot-wide flood limit).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Earliest next send, bot-wide and per chat.
#[derive(Debug)]
struct SendSchedule {
    cfg: ThrottleConfig,
    global_next: Instant,
    chat_next: HashMap<ChatId, Instant>,
}

impl SendSchedule {
    fn new(cfg: ThrottleConfig, now: Instant) -> Self {
        Self {
            cfg,
            global_next: now,
            chat_next: HashMap::new(),
        }
    }

    /// Book the first instant at or after `now` free on both schedules.
    fn book(&mut self, chat_id: ChatId, now: Instant) -> Instant {
        // Chats whose slot is already past carry no constraint.
        self.chat_next.retain(|_, next| *next > now);

        let chat_next = self.chat_next.get(&chat_id).copied().unwrap_or(now);
        let at = now.max(self.global_next).max(chat_next);

        self.global_next = at + self.cfg.global_min_interval;
        self.chat_next
            .insert(chat_id, at + self.cfg.per_chat_min_interval);
        at
    }
}

/// MessagingPort decorator that spaces outbound sends.
///
/// A reconciliation cycle can fan out reports to many groups at once; this keeps
/// the burst under Telegram's flood limits. The adapter still retries once on 429.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    schedule: Mutex<SendSchedule>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            schedule: Mutex::new(SendSchedule::new(cfg, Instant::now())),
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let at = self.schedule.lock().await.book(chat_id, Instant::now());
        sleep_until(at).await;
        self.inner.send_html(chat_id, html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ThrottleConfig {
        ThrottleConfig {
            global_min_interval: Duration::from_millis(100),
            per_chat_min_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn same_chat_waits_for_its_own_interval() {
        let t0 = Instant::now();
        let mut s = SendSchedule::new(cfg(), t0);

        assert_eq!(s.book(ChatId(1), t0), t0);
        assert_eq!(s.book(ChatId(1), t0), t0 + Duration::from_secs(1));
        assert_eq!(s.book(ChatId(1), t0), t0 + Duration::from_secs(2));
    }

    #[test]
    fn different_chats_only_share_the_global_spacing() {
        let t0 = Instant::now();
        let mut s = SendSchedule::new(cfg(), t0);

        assert_eq!(s.book(ChatId(1), t0), t0);
        assert_eq!(s.book(ChatId(2), t0), t0 + Duration::from_millis(100));
        assert_eq!(s.book(ChatId(3), t0), t0 + Duration::from_millis(200));
    }

    #[test]
    fn idle_chats_are_forgotten() {
        let t0 = Instant::now();
        let mut s = SendSchedule::new(cfg(), t0);
        for id in 0..50 {
            s.book(ChatId(id), t0);
        }
        assert_eq!(s.chat_next.len(), 50);

        let later = t0 + Duration::from_secs(60);
        assert_eq!(s.book(ChatId(7), later), later);
        assert_eq!(s.chat_next.len(), 1);
    }
}
