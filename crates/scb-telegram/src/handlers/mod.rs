//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - validates auth + rate limits
//! - converts the Telegram message into a cross-messenger update
//! - hands it to the quiz conversation under the sender's lock

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use scb_core::{
    domain::UserId, messaging::types::IncomingUpdate, security::is_authorized, utils::AuditEvent,
};

use crate::router::AppState;

mod commands;
mod text;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Contact the bot owner for access.";
const FAILURE_MESSAGE: &str = "Something went wrong. Send /start to try again.";
const UNSUPPORTED_MESSAGE: &str = "Please reply with text: Yes or No.";

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let username = user
        .username
        .clone()
        .unwrap_or_else(|| "unknown".to_string());

    if !is_authorized(Some(UserId(user_id)), &state.cfg.telegram_allowed_users) {
        state
            .audit
            .record(AuditEvent::auth(user_id, &username, false));
        let _ = bot.send_message(msg.chat.id, UNAUTHORIZED_MESSAGE).await;
        return Ok(());
    }

    let (allowed, retry_after) = state.rate_limiter.lock().await.check(UserId(user_id));
    if !allowed {
        let secs = retry_after.map(|d| d.as_secs_f64()).unwrap_or(0.0);
        tracing::warn!(user = user_id, retry_after = secs, "rate limited");
        state
            .audit
            .record(AuditEvent::rate_limit(user_id, &username, secs));
        let _ = bot
            .send_message(
                msg.chat.id,
                format!("Slow down a little. Try again in {:.0}s.", secs.ceil()),
            )
            .await;
        return Ok(());
    }

    let update = match msg.text() {
        Some(t) if t.starts_with('/') => commands::to_update(&msg, t),
        Some(t) => text::to_update(&msg, t),
        None => None,
    };
    let Some(update) = update else {
        let _ = bot.send_message(msg.chat.id, UNSUPPORTED_MESSAGE).await;
        return Ok(());
    };

    // Sequentialize updates per user so answers land on the right question.
    let _guard = state.user_locks.lock_user(user_id).await;
    dispatch(&bot, &msg, &state, update, &username).await;
    Ok(())
}

async fn dispatch(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    update: IncomingUpdate,
    username: &str,
) {
    let user_id = update.user_id();
    if let Err(e) = state.conversation.handle(update).await {
        tracing::error!(user = user_id.0, "conversation failed: {e}");
        state
            .audit
            .record(AuditEvent::error(user_id.0, username, &e.to_string()));
        let _ = bot.send_message(msg.chat.id, FAILURE_MESSAGE).await;
    }
}
