use std::sync::Arc;

use crate::{
    domain::{ChatId, GroupId},
    formatting::split_lines,
    messaging::port::MessagingPort,
    report::{format_update, rank, Change},
    Result,
};

/// Formats change lists into ranked reports and delivers them to groups.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn MessagingPort>,
    safe_limit: usize,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn MessagingPort>, safe_limit: usize) -> Self {
        Self {
            messenger,
            safe_limit,
        }
    }

    /// Send a ranked update report for `changes` to `group`.
    ///
    /// Errors are returned to the caller; the reconciliation loop logs and drops them.
    pub async fn notify(&self, group: &GroupId, changes: Vec<Change>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let chat_id = ChatId::try_from(group)?;
        let html = format_update(&rank(changes));
        self.send_html(chat_id, &html).await
    }

    /// Send arbitrary HTML, split to the messenger's limit.
    pub async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        let limit = self
            .safe_limit
            .min(self.messenger.capabilities().max_message_len)
            .max(200);
        for chunk in split_lines(html, limit) {
            self.messenger.send_html(chat_id, &chunk).await?;
        }
        Ok(())
    }
}
