use std::sync::Arc;

use scb_core::{config::Config, quiz::QuizManager, store::SessionStore};

#[tokio::main]
async fn main() -> Result<(), scb_core::Error> {
    scb_core::logging::init("scb")?;

    let cfg = Arc::new(Config::load()?);

    let quiz = Arc::new(QuizManager::new(
        cfg.catalog.clone(),
        cfg.insomnia_threshold,
        cfg.answer_policy,
        Arc::new(SessionStore::new()),
    )?);
    tracing::info!(audit_log = %cfg.audit_log_path.display(), "starting insomnia quiz bot");

    scb_telegram::router::run_polling(cfg, quiz)
        .await
        .map_err(|e| scb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
