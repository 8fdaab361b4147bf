use crate::{
    answer::Answer,
    domain::{ChatId, UserId},
};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields should live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
}

impl IncomingUpdate {
    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(c) => c.chat_id,
            IncomingUpdate::Text(t) => t.chat_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            IncomingUpdate::Command(c) => c.user_id,
            IncomingUpdate::Text(t) => t.user_id,
        }
    }

    pub fn username(&self) -> &str {
        let name = match self {
            IncomingUpdate::Command(c) => c.username.as_deref(),
            IncomingUpdate::Text(t) => t.username.as_deref(),
        };
        name.unwrap_or("unknown")
    }
}

/// Reply keyboard shown in place of the text input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
    /// Hide the keyboard once a button was pressed.
    pub one_time: bool,
}

impl ReplyKeyboard {
    /// Single row with "Yes" and "No", dismissed after one use.
    pub fn yes_no() -> Self {
        Self {
            rows: vec![vec![
                Answer::Yes.label().to_string(),
                Answer::No.label().to_string(),
            ]],
            one_time: true,
        }
    }
}

/// What to do with the reply keyboard when sending a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// Leave whatever the client currently shows.
    #[default]
    Keep,
    Keyboard(ReplyKeyboard),
    Remove,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_reply_keyboards: bool,
    pub max_message_len: usize,
}
