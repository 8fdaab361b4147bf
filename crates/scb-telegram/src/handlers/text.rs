use teloxide::types::Message;

use scb_core::{
    domain::{ChatId, UserId},
    messaging::types::{IncomingUpdate, TextMessage},
};

/// Plain text is always treated as an answer; the quiz decides what it means.
pub(super) fn to_update(msg: &Message, text: &str) -> Option<IncomingUpdate> {
    let user = msg.from()?;
    Some(IncomingUpdate::Text(TextMessage {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        text: text.to_string(),
    }))
}
