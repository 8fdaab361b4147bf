use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use tokio::sync::{Mutex, OwnedMutexGuard};

use scb_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use scb_core::{
    config::Config, conversation::QuizConversation, messaging::port::MessagingPort,
    quiz::QuizManager, security::RateLimiter, utils::AuditLogger,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub conversation: Arc<QuizConversation>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub user_locks: Arc<UserLocks>,
    pub audit: Arc<AuditLogger>,
}

/// One async lock per user so a user's answers are applied in arrival order.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Start the insomnia questionnaire"),
        BotCommand::new("cancel", "Cancel the current questionnaire"),
        BotCommand::new("status", "Show your progress"),
        BotCommand::new("help", "Show help"),
    ]
}

pub async fn run_polling(cfg: Arc<Config>, quiz: Arc<QuizManager>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = %me.username(), "insomnia bot started"),
        Err(e) => tracing::warn!("getMe failed: {e}"),
    }
    tracing::info!(
        questions = quiz.catalog().len(),
        threshold = quiz.threshold(),
        policy = ?quiz.policy(),
        allowed_users = cfg.telegram_allowed_users.len(),
        "quiz configured"
    );

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!("failed to register bot commands: {e}");
    }

    // Throttle on top of the adapter's own RetryAfter handling.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let audit = Arc::new(AuditLogger::new(
        cfg.audit_log_path.clone(),
        cfg.audit_log_json,
    ));
    let conversation = Arc::new(QuizConversation::new(quiz, messenger).with_audit(audit.clone()));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        conversation,
        rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
            cfg.rate_limit_enabled,
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        ))),
        user_locks: Arc::new(UserLocks::default()),
        audit,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn registers_every_conversation_command() {
        let names: Vec<String> = bot_commands().into_iter().map(|c| c.command).collect();
        assert_eq!(names, vec!["start", "cancel", "status", "help"]);
    }

    #[tokio::test]
    async fn user_lock_serializes_same_user_only() {
        let locks = Arc::new(UserLocks::default());
        let guard = locks.lock_user(1).await;

        // A different user is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock_user(2)).await;
        assert!(other.is_ok());

        // The same user waits until the first guard is released.
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock_user(1)).await;
        assert!(same.is_err());

        drop(guard);
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock_user(1)).await;
        assert!(same.is_ok());
    }
}
