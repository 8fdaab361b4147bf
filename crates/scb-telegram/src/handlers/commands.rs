use teloxide::types::Message;

use scb_core::{
    domain::{ChatId, UserId},
    messaging::types::{Command, IncomingUpdate},
};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(super) fn to_update(msg: &Message, text: &str) -> Option<IncomingUpdate> {
    let user = msg.from()?;
    let (name, args) = parse_command(text);
    Some(IncomingUpdate::Command(Command {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        name,
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bot_suffix_and_lowercases() {
        assert_eq!(
            parse_command("/Start@InsomniaBot"),
            ("start".to_string(), String::new())
        );
    }

    #[test]
    fn keeps_arguments() {
        assert_eq!(
            parse_command("  /cancel   now please "),
            ("cancel".to_string(), "now please".to_string())
        );
    }
}
