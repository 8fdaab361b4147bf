use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use crate::{answer::Answer, domain::UserId};

/// Progress of one user through the catalog.
///
/// Answers are keyed by question index, the same key used for scoring.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    cursor: usize,
    answers: BTreeMap<usize, Answer>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next unanswered question.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn answers(&self) -> &BTreeMap<usize, Answer> {
        &self.answers
    }

    pub fn answer_at(&self, index: usize) -> Option<Answer> {
        self.answers.get(&index).copied()
    }

    /// Record `answer` for the question under the cursor and advance.
    ///
    /// Returns the index the answer was recorded against.
    pub(crate) fn record(&mut self, answer: Answer) -> usize {
        let index = self.cursor;
        self.answers.insert(index, answer);
        self.cursor += 1;
        index
    }
}

/// In-memory table of active sessions (user id -> state).
///
/// Every mutation runs under a single lock acquisition with no await point in
/// between, so a read-modify-write can never interleave with another one.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a session. Returns the replaced session, if any.
    pub async fn insert(&self, user: UserId, state: SessionState) -> Option<SessionState> {
        self.inner.lock().await.insert(user, state)
    }

    /// Snapshot of a user's session.
    pub async fn get(&self, user: UserId) -> Option<SessionState> {
        self.inner.lock().await.get(&user).cloned()
    }

    pub async fn contains(&self, user: UserId) -> bool {
        self.inner.lock().await.contains_key(&user)
    }

    pub async fn remove(&self, user: UserId) -> Option<SessionState> {
        self.inner.lock().await.remove(&user)
    }

    /// Run `f` against the user's session, if one exists.
    ///
    /// `f` returns the value to hand back plus whether the session should be
    /// dropped afterwards.
    pub async fn modify<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut SessionState) -> (R, bool),
    ) -> Option<R> {
        let mut map = self.inner.lock().await;
        let state = map.get_mut(&user)?;
        let (out, remove) = f(state);
        if remove {
            map.remove(&user);
        }
        Some(out)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
