//! Telegram client using teloxide.

use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::fanout::Deliver;

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send an HTML message. Returns the new message id.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| format!("Failed to send: {e}"))
    }
}

impl Deliver for TelegramClient {
    fn deliver(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<(), String>> + Send {
        async move { self.send_message(chat_id, text).await.map(|_| ()) }
    }
}
