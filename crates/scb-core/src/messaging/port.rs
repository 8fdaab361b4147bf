use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{MessagingCapabilities, ReplyMarkup},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; adapters without reply keyboards
/// report that through [`MessagingCapabilities`] and the conversation layer
/// falls back to plain text hints.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<MessageRef>;
}
