//! Telegram update handlers.
//!
//! Only text commands are handled; everything else is ignored. Command
//! semantics live in `elo_core::commands`; this layer parses the update and
//! sends the reply back.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use elo_core::{domain::ChatId, messaging::types::Command};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let Some(reply) = reply_for(&state, chat_id, msg.chat.is_private(), msg.text()).await else {
        return Ok(());
    };

    if let Err(e) = state.replies.send_html(chat_id, &reply).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "reply delivery failed");
    }
    Ok(())
}

/// Reply to a message, or `None` when the bot should stay silent.
async fn reply_for(
    state: &AppState,
    chat_id: ChatId,
    is_private: bool,
    text: Option<&str>,
) -> Option<String> {
    let cmd = Command::parse(chat_id, is_private, text?)?;
    if !cmd.is_addressed_to(state.bot_username.as_deref()) {
        return None;
    }

    let reply = state
        .commands
        .handle(&cmd, state.bot_username.as_deref())
        .await;
    if reply.is_none() {
        tracing::debug!(chat_id = chat_id.0, command = %cmd.name, "unknown command ignored");
    }
    reply
}
