//! Telegram adapter (teloxide).
//!
//! This crate implements the `scb-core` MessagingPort over Telegram Bot API
//! and routes incoming updates into the quiz conversation.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use scb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MessagingCapabilities, ReplyKeyboard, ReplyMarkup},
    },
    Result,
};

/// Telegram's hard limit for a single text message.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_keyboard(keyboard: &ReplyKeyboard) -> KeyboardMarkup {
        let rows: Vec<Vec<KeyboardButton>> = keyboard
            .rows
            .iter()
            .map(|row| row.iter().map(KeyboardButton::new).collect())
            .collect();
        KeyboardMarkup::new(rows)
            .resize_keyboard(true)
            .one_time_keyboard(keyboard.one_time)
    }

    fn tg_markup(markup: &ReplyMarkup) -> Option<teloxide::types::ReplyMarkup> {
        match markup {
            ReplyMarkup::Keep => None,
            ReplyMarkup::Keyboard(k) => {
                Some(teloxide::types::ReplyMarkup::Keyboard(Self::tg_keyboard(k)))
            }
            ReplyMarkup::Remove => Some(teloxide::types::ReplyMarkup::KeyboardRemove(
                KeyboardRemove::new(),
            )),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::warn!(retry_after = ?d, "telegram rate limit hit, retrying");
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_reply_keyboards: true,
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<MessageRef> {
        let tg_markup = Self::tg_markup(&markup);
        let msg = self
            .with_retry(|| {
                let req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                match &tg_markup {
                    Some(m) => req.reply_markup(m.clone()),
                    None => req,
                }
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
