use std::sync::Arc;

use crate::{
    answer::AnswerPolicy,
    catalog::QuestionCatalog,
    diagnosis::{self, Diagnosis, Outcome},
    domain::UserId,
    errors::Error,
    store::{SessionState, SessionStore},
    Result,
};

/// A question ready to be shown to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub index: usize,
    pub total: usize,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Started {
    pub question: Question,
    /// An in-progress quiz was discarded.
    pub restarted: bool,
}

/// What follows a recorded answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Next(Question),
    Finished(Outcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

/// Drives users through the question catalog and scores the result.
///
/// Sessions live in the injected [`SessionStore`]; the catalog and threshold
/// are fixed for the lifetime of the manager.
pub struct QuizManager {
    catalog: QuestionCatalog,
    threshold: usize,
    policy: AnswerPolicy,
    store: Arc<SessionStore>,
}

impl QuizManager {
    pub fn new(
        catalog: QuestionCatalog,
        threshold: usize,
        policy: AnswerPolicy,
        store: Arc<SessionStore>,
    ) -> Result<Self> {
        catalog.validate_threshold(threshold)?;
        Ok(Self {
            catalog,
            threshold,
            policy,
            store,
        })
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn policy(&self) -> AnswerPolicy {
        self.policy
    }

    /// Begin (or restart) a quiz for `user` and return the first question.
    pub async fn start(&self, user: UserId) -> Started {
        let replaced = self.store.insert(user, SessionState::new()).await;
        tracing::debug!(user = user.0, restarted = replaced.is_some(), "quiz started");
        Started {
            question: Question {
                index: 0,
                total: self.catalog.len(),
                text: self.catalog.first().to_string(),
            },
            restarted: replaced.is_some(),
        }
    }

    /// Record an answer for the question under the cursor.
    ///
    /// Completing the last question finalizes the quiz and clears the session.
    pub async fn submit_answer(&self, user: UserId, raw: &str) -> Result<Step> {
        let policy = self.policy;
        self.store
            .modify(user, |state| {
                if state.cursor() < self.catalog.len() {
                    let answer = match policy.normalize(raw) {
                        Ok(a) => a,
                        Err(e) => return (Err(e), false),
                    };
                    let index = state.record(answer);
                    tracing::debug!(user = user.0, index, %answer, "answer recorded");
                }

                match self.question_at(state.cursor()) {
                    Some(q) => (Ok(Step::Next(q)), false),
                    None => (Ok(Step::Finished(self.outcome(state))), true),
                }
            })
            .await
            .ok_or(Error::SessionNotFound { user })?
    }

    /// Score the user's recorded answers and clear the session.
    pub async fn finalize(&self, user: UserId) -> Result<Outcome> {
        let state = self
            .store
            .remove(user)
            .await
            .ok_or(Error::SessionNotFound { user })?;
        Ok(self.outcome(&state))
    }

    /// Drop the user's session. Returns whether one existed.
    pub async fn cancel(&self, user: UserId) -> bool {
        self.store.remove(user).await.is_some()
    }

    pub async fn progress(&self, user: UserId) -> Option<Progress> {
        let state = self.store.get(user).await?;
        Some(Progress {
            answered: state.cursor(),
            total: self.catalog.len(),
        })
    }

    /// The question the user is expected to answer next.
    pub async fn current_question(&self, user: UserId) -> Option<Question> {
        let state = self.store.get(user).await?;
        self.question_at(state.cursor())
    }

    fn question_at(&self, index: usize) -> Option<Question> {
        self.catalog.get(index).map(|text| Question {
            index,
            total: self.catalog.len(),
            text: text.to_string(),
        })
    }

    fn outcome(&self, state: &SessionState) -> Outcome {
        let score = diagnosis::score(state.answers().values());
        let diagnosis = Diagnosis::from_score(score, self.threshold);
        tracing::info!(
            answered = state.cursor(),
            score,
            threshold = self.threshold,
            ?diagnosis,
            "quiz finalized"
        );
        Outcome {
            score,
            answered: state.cursor(),
            total: self.catalog.len(),
            threshold: self.threshold,
            diagnosis,
        }
    }
}
