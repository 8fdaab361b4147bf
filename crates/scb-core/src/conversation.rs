use std::sync::Arc;

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Command, IncomingUpdate, ReplyKeyboard, ReplyMarkup, TextMessage},
    },
    quiz::{Question, QuizManager, Step},
    utils::{AuditEvent, AuditLogger},
    Result,
};

pub const WELCOME_MESSAGE: &str = "Welcome to the Insomnia Detection Bot! I'm here to help you determine if you have symptoms of insomnia. Please answer a few questions. Let's begin!";
pub const RESTARTED_NOTICE: &str = "Your previous answers were discarded; starting over.";
pub const CANCELED_MESSAGE: &str = "Quiz canceled.";
pub const NO_SESSION_MESSAGE: &str = "No quiz in progress. Send /start to begin.";
pub const INVALID_ANSWER_MESSAGE: &str = "Please answer Yes or No.";
pub const HELP_MESSAGE: &str = "Insomnia Detection Bot\n\n\
/start - Start (or restart) the questionnaire\n\
/cancel - Cancel the current questionnaire\n\
/status - Show your progress\n\
/help - Show this message\n\n\
Answer each question with Yes or No.";

/// Who sent an update and where replies go.
#[derive(Clone, Copy, Debug)]
struct Peer<'a> {
    chat_id: ChatId,
    user_id: UserId,
    username: &'a str,
}

/// Turns inbound chat events into quiz operations and renders the replies.
pub struct QuizConversation {
    quiz: Arc<QuizManager>,
    messenger: Arc<dyn MessagingPort>,
    audit: Option<Arc<AuditLogger>>,
}

impl QuizConversation {
    pub fn new(quiz: Arc<QuizManager>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            quiz,
            messenger,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn quiz(&self) -> &QuizManager {
        &self.quiz
    }

    pub async fn handle(&self, update: IncomingUpdate) -> Result<()> {
        let peer = Peer {
            chat_id: update.chat_id(),
            user_id: update.user_id(),
            username: update.username(),
        };
        match &update {
            IncomingUpdate::Command(cmd) => self.on_command(peer, cmd).await,
            IncomingUpdate::Text(msg) => self.on_text(peer, msg).await,
        }
    }

    async fn on_command(&self, peer: Peer<'_>, cmd: &Command) -> Result<()> {
        match cmd.name.as_str() {
            "start" => self.on_start(peer).await,
            "cancel" => self.on_cancel(peer).await,
            "status" => self.on_status(peer).await,
            "help" => self.send(peer, HELP_MESSAGE, ReplyMarkup::Keep).await,
            other => {
                let msg = format!("Unknown command: /{other}\nSend /help for the command list.");
                self.send(peer, &msg, ReplyMarkup::Keep).await
            }
        }
    }

    async fn on_start(&self, peer: Peer<'_>) -> Result<()> {
        let started = self.quiz.start(peer.user_id).await;
        tracing::info!(
            user = peer.user_id.0,
            restarted = started.restarted,
            "quiz started"
        );
        self.audit(AuditEvent::quiz_start(
            peer.user_id.0,
            peer.username,
            started.restarted,
        ));

        let welcome = if started.restarted {
            format!("{WELCOME_MESSAGE}\n\n{RESTARTED_NOTICE}")
        } else {
            WELCOME_MESSAGE.to_string()
        };
        self.send(peer, &welcome, ReplyMarkup::Keep).await?;
        self.send_question(peer, &started.question).await
    }

    async fn on_cancel(&self, peer: Peer<'_>) -> Result<()> {
        let had_session = self.quiz.cancel(peer.user_id).await;
        tracing::info!(user = peer.user_id.0, had_session, "quiz canceled");
        self.audit(AuditEvent::quiz_cancel(
            peer.user_id.0,
            peer.username,
            had_session,
        ));
        self.send(peer, CANCELED_MESSAGE, ReplyMarkup::Remove).await
    }

    async fn on_status(&self, peer: Peer<'_>) -> Result<()> {
        let msg = match self.quiz.progress(peer.user_id).await {
            Some(p) => format!(
                "Question {} of {} ({} answered).",
                p.answered + 1,
                p.total,
                p.answered
            ),
            None => NO_SESSION_MESSAGE.to_string(),
        };
        self.send(peer, &msg, ReplyMarkup::Keep).await
    }

    async fn on_text(&self, peer: Peer<'_>, msg: &TextMessage) -> Result<()> {
        match self.quiz.submit_answer(peer.user_id, &msg.text).await {
            Ok(Step::Next(question)) => {
                self.audit(AuditEvent::answer(
                    peer.user_id.0,
                    peer.username,
                    question.index.saturating_sub(1),
                    &msg.text,
                ));
                self.send_question(peer, &question).await
            }
            Ok(Step::Finished(outcome)) => {
                self.audit(AuditEvent::answer(
                    peer.user_id.0,
                    peer.username,
                    outcome.answered.saturating_sub(1),
                    &msg.text,
                ));
                self.audit(AuditEvent::quiz_result(
                    peer.user_id.0,
                    peer.username,
                    &outcome,
                ));
                self.send(peer, outcome.diagnosis.message(), ReplyMarkup::Remove).await
            }
            Err(Error::SessionNotFound { .. }) => {
                tracing::debug!(user = peer.user_id.0, "answer without an active quiz");
                self.send(peer, NO_SESSION_MESSAGE, ReplyMarkup::Remove).await
            }
            Err(Error::InvalidAnswer { text }) => {
                tracing::debug!(user = peer.user_id.0, %text, "rejected answer");
                self.send(peer, INVALID_ANSWER_MESSAGE, ReplyMarkup::Keep).await?;
                match self.quiz.current_question(peer.user_id).await {
                    Some(question) => self.send_question(peer, &question).await,
                    None => Ok(()),
                }
            }
            Err(e) => {
                self.audit(AuditEvent::error(
                    peer.user_id.0,
                    peer.username,
                    &e.to_string(),
                ));
                Err(e)
            }
        }
    }

    async fn send_question(&self, peer: Peer<'_>, question: &Question) -> Result<()> {
        if self.messenger.capabilities().supports_reply_keyboards {
            let markup = ReplyMarkup::Keyboard(ReplyKeyboard::yes_no());
            return self.send(peer, &question.text, markup).await;
        }
        let text = format!("{}\n\n(Answer Yes or No)", question.text);
        self.send(peer, &text, ReplyMarkup::Keep).await
    }

    async fn send(&self, peer: Peer<'_>, text: &str, markup: ReplyMarkup) -> Result<()> {
        self.messenger
            .send_text(peer.chat_id, text, markup)
            .await
            .map(|_| ())
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        answer::AnswerPolicy,
        catalog::{QuestionCatalog, DEFAULT_INSOMNIA_THRESHOLD},
        diagnosis::{NEGATIVE_MESSAGE, POSITIVE_MESSAGE},
        domain::{MessageId, MessageRef},
        messaging::types::MessagingCapabilities,
        store::SessionStore,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeMessenger {
        keyboards: bool,
        sends: Mutex<Vec<(ChatId, String, ReplyMarkup)>>,
    }

    impl FakeMessenger {
        fn new(keyboards: bool) -> Arc<Self> {
            Arc::new(Self {
                keyboards,
                sends: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(ChatId, String, ReplyMarkup)> {
            self.sends.lock().unwrap().clone()
        }

        fn last(&self) -> (ChatId, String, ReplyMarkup) {
            self.sent().pop().unwrap()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_reply_keyboards: self.keyboards,
                max_message_len: 4096,
            }
        }

        async fn send_text(
            &self,
            chat_id: ChatId,
            text: &str,
            markup: ReplyMarkup,
        ) -> Result<MessageRef> {
            let mut sends = self.sends.lock().unwrap();
            sends.push((chat_id, text.to_string(), markup));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sends.len() as i32),
            })
        }
    }

    fn conversation(
        catalog: QuestionCatalog,
        threshold: usize,
        messenger: Arc<FakeMessenger>,
    ) -> QuizConversation {
        let quiz = QuizManager::new(
            catalog,
            threshold,
            AnswerPolicy::Lenient,
            Arc::new(SessionStore::new()),
        )
        .unwrap();
        QuizConversation::new(Arc::new(quiz), messenger)
    }

    fn command(user: i64, name: &str) -> IncomingUpdate {
        IncomingUpdate::Command(Command {
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: Some(format!("user{user}")),
            name: name.to_string(),
            args: String::new(),
        })
    }

    fn text(user: i64, text: &str) -> IncomingUpdate {
        IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: None,
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn start_sends_welcome_then_first_question_with_keyboard() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?", "b?"]).unwrap(), 1, fake.clone());

        conv.handle(command(1, "start")).await.unwrap();

        let sent = fake.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, WELCOME_MESSAGE);
        assert_eq!(sent[1].1, "a?");
        assert_eq!(sent[1].2, ReplyMarkup::Keyboard(ReplyKeyboard::yes_no()));
    }

    #[tokio::test]
    async fn full_insomnia_run_yields_positive_diagnosis() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(
            QuestionCatalog::insomnia(),
            DEFAULT_INSOMNIA_THRESHOLD,
            fake.clone(),
        );

        conv.handle(command(10, "start")).await.unwrap();
        for i in 0..57 {
            let reply = if i < 35 { "Yes" } else { "No" };
            conv.handle(text(10, reply)).await.unwrap();
        }

        let (chat, msg, markup) = fake.last();
        assert_eq!(chat, ChatId(10));
        assert_eq!(msg, POSITIVE_MESSAGE);
        assert_eq!(markup, ReplyMarkup::Remove);
        assert!(conv.quiz().progress(UserId(10)).await.is_none());
    }

    #[tokio::test]
    async fn one_short_of_threshold_is_negative() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(
            QuestionCatalog::new(["1?", "2?", "3?"]).unwrap(),
            2,
            fake.clone(),
        );

        conv.handle(command(1, "start")).await.unwrap();
        for reply in ["yes", "no", "no"] {
            conv.handle(text(1, reply)).await.unwrap();
        }
        assert_eq!(fake.last().1, NEGATIVE_MESSAGE);
    }

    #[tokio::test]
    async fn cancel_after_three_answers_clears_session() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(
            QuestionCatalog::insomnia(),
            DEFAULT_INSOMNIA_THRESHOLD,
            fake.clone(),
        );

        conv.handle(command(2, "start")).await.unwrap();
        for _ in 0..3 {
            conv.handle(text(2, "Yes")).await.unwrap();
        }
        conv.handle(command(2, "cancel")).await.unwrap();

        let (_, msg, markup) = fake.last();
        assert_eq!(msg, CANCELED_MESSAGE);
        assert_eq!(markup, ReplyMarkup::Remove);
        assert!(conv.quiz().progress(UserId(2)).await.is_none());

        // Answers after cancel are not recorded anywhere.
        conv.handle(text(2, "Yes")).await.unwrap();
        assert_eq!(fake.last().1, NO_SESSION_MESSAGE);
        assert!(conv.quiz().progress(UserId(2)).await.is_none());
    }

    #[tokio::test]
    async fn cancel_without_session_still_acknowledges() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?"]).unwrap(), 1, fake.clone());

        conv.handle(command(3, "cancel")).await.unwrap();
        assert_eq!(fake.last().1, CANCELED_MESSAGE);
    }

    #[tokio::test]
    async fn restart_mid_quiz_notes_discarded_progress() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?", "b?"]).unwrap(), 1, fake.clone());

        conv.handle(command(4, "start")).await.unwrap();
        conv.handle(text(4, "yes")).await.unwrap();
        conv.handle(command(4, "start")).await.unwrap();

        let sent = fake.sent();
        let welcome = &sent[sent.len() - 2].1;
        assert!(welcome.ends_with(RESTARTED_NOTICE));
        assert_eq!(sent[sent.len() - 1].1, "a?");
    }

    #[tokio::test]
    async fn strict_policy_reprompts_current_question() {
        let fake = FakeMessenger::new(true);
        let quiz = QuizManager::new(
            QuestionCatalog::new(["a?", "b?"]).unwrap(),
            1,
            AnswerPolicy::Strict,
            Arc::new(SessionStore::new()),
        )
        .unwrap();
        let conv = QuizConversation::new(Arc::new(quiz), fake.clone());

        conv.handle(command(5, "start")).await.unwrap();
        conv.handle(text(5, "dunno")).await.unwrap();

        let sent = fake.sent();
        assert_eq!(sent[sent.len() - 2].1, INVALID_ANSWER_MESSAGE);
        assert_eq!(sent[sent.len() - 1].1, "a?");
        assert_eq!(conv.quiz().progress(UserId(5)).await.unwrap().answered, 0);
    }

    #[tokio::test]
    async fn status_and_unknown_commands() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?", "b?", "c?"]).unwrap(), 1, fake.clone());

        conv.handle(command(6, "status")).await.unwrap();
        assert_eq!(fake.last().1, NO_SESSION_MESSAGE);

        conv.handle(command(6, "start")).await.unwrap();
        conv.handle(text(6, "no")).await.unwrap();
        conv.handle(command(6, "status")).await.unwrap();
        assert_eq!(fake.last().1, "Question 2 of 3 (1 answered).");

        conv.handle(command(6, "frobnicate")).await.unwrap();
        assert!(fake.last().1.starts_with("Unknown command: /frobnicate"));
    }

    #[tokio::test]
    async fn falls_back_to_text_hint_without_keyboards() {
        let fake = FakeMessenger::new(false);
        let conv = conversation(QuestionCatalog::new(["a?"]).unwrap(), 1, fake.clone());

        conv.handle(command(7, "start")).await.unwrap();
        let (_, msg, markup) = fake.last();
        assert_eq!(msg, "a?\n\n(Answer Yes or No)");
        assert_eq!(markup, ReplyMarkup::Keep);
    }

    #[tokio::test]
    async fn interleaved_users_stay_isolated() {
        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?", "b?"]).unwrap(), 2, fake.clone());

        conv.handle(command(1, "start")).await.unwrap();
        conv.handle(command(2, "start")).await.unwrap();
        conv.handle(text(1, "yes")).await.unwrap();
        conv.handle(text(2, "no")).await.unwrap();
        conv.handle(text(1, "yes")).await.unwrap();
        conv.handle(text(2, "no")).await.unwrap();

        let results: Vec<_> = fake
            .sent()
            .into_iter()
            .filter(|(_, _, markup)| *markup == ReplyMarkup::Remove)
            .map(|(chat, msg, _)| (chat, msg))
            .collect();
        assert_eq!(
            results,
            vec![
                (ChatId(1), POSITIVE_MESSAGE.to_string()),
                (ChatId(2), NEGATIVE_MESSAGE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn audit_log_records_quiz_lifecycle() {
        let path = std::path::PathBuf::from(format!(
            "/tmp/scb-conversation-audit-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let fake = FakeMessenger::new(true);
        let conv = conversation(QuestionCatalog::new(["a?"]).unwrap(), 1, fake.clone())
            .with_audit(Arc::new(AuditLogger::new(path.clone(), true)));

        conv.handle(command(8, "start")).await.unwrap();
        conv.handle(text(8, "yes")).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let events: Vec<String> = written
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["event"].to_string())
            .collect();
        assert_eq!(events, vec!["\"quiz_start\"", "\"answer\"", "\"quiz_result\""]);

        let _ = std::fs::remove_file(&path);
    }
}
