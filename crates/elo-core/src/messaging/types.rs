use crate::domain::{ChatId, GroupId};

/// Transport-agnostic incoming command.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub is_private: bool,
    pub name: String,
    pub args: String,
    /// `botname` from `/cmd@botname`, if present.
    pub addressee: Option<String>,
}

impl Command {
    /// Parse `/cmd@botname arg1 ...` into a command. Returns `None` for plain text.
    pub fn parse(chat_id: ChatId, is_private: bool, text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("").trim();
        let args = parts.next().unwrap_or("").trim().to_string();

        let mut head = first.trim_start_matches('/').splitn(2, '@');
        let name = head.next().unwrap_or("").to_lowercase();
        if name.is_empty() {
            return None;
        }
        let addressee = head
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Some(Self {
            chat_id,
            is_private,
            name,
            args,
            addressee,
        })
    }

    /// False when the command names a different bot (`/stats@other_bot`).
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (&self.addressee, bot_username) {
            (Some(target), Some(me)) => target.eq_ignore_ascii_case(me),
            _ => true,
        }
    }

    pub fn group(&self) -> GroupId {
        GroupId::from(self.chat_id.0)
    }

    /// First whitespace-separated argument, if any.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.split_whitespace().next()
    }
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
