// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user FSM driving the "compose a generation request" conversation.
//!
//! Each user goes through states: Idle -> AwaitingPrompt -> AwaitingDimension
//! -> AwaitingImprove -> Idle. An event that does not match the current state
//! is ignored without side effects. Idle users have no entry in the map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pixrelay_core::UserId;
use pixrelay_core::types::{Dimension, GenerationRequest};
use tokio::time::Instant;
use tracing::debug;

/// States in the session FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No conversation in progress.
    Idle,
    /// `/gen` received, waiting for the prompt text.
    AwaitingPrompt,
    /// Prompt stored, waiting for a dimension choice.
    AwaitingDimension,
    /// Dimension stored, waiting for the improve choice.
    AwaitingImprove,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AwaitingPrompt => write!(f, "awaiting_prompt"),
            SessionState::AwaitingDimension => write!(f, "awaiting_dimension"),
            SessionState::AwaitingImprove => write!(f, "awaiting_improve"),
        }
    }
}

/// Result of offering free text to a user's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The text was stored as the prompt; the session now awaits a dimension.
    Accepted(String),
    /// Session awaits a prompt but the text was blank. Nothing changed.
    Blank,
    /// Session was not awaiting a prompt. Nothing changed.
    Ignored,
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    prompt: Option<String>,
    dimension: Option<Dimension>,
    touched: Instant,
}

impl Session {
    fn fresh() -> Self {
        Self {
            state: SessionState::AwaitingPrompt,
            prompt: None,
            dimension: None,
            touched: Instant::now(),
        }
    }
}

/// Session map keyed by user id, guarded for read-modify-write.
///
/// The lock is never held across an await point.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// Creates a store. `ttl` of `None` keeps sessions until they complete.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates a store from a TTL in seconds, where `0` disables expiry.
    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    // A panicking handler must not make every later session call fail.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.ttl
            .is_some_and(|ttl| session.touched.elapsed() >= ttl)
    }

    /// Returns the live session for `user`, evicting it first if it expired.
    fn live<'a>(
        &self,
        sessions: &'a mut HashMap<UserId, Session>,
        user: UserId,
    ) -> Option<&'a mut Session> {
        let expired = sessions.get(&user).is_some_and(|s| self.is_expired(s));
        if expired {
            sessions.remove(&user);
            debug!(user_id = user.0, "session expired");
            return None;
        }
        sessions.get_mut(&user)
    }

    /// Current state of `user`'s session.
    pub fn state(&self, user: UserId) -> SessionState {
        let mut sessions = self.lock();
        self.live(&mut sessions, user)
            .map_or(SessionState::Idle, |s| s.state)
    }

    /// Starts (or restarts) the conversation, discarding any scratch data.
    pub fn begin(&self, user: UserId) {
        self.lock().insert(user, Session::fresh());
        debug!(user_id = user.0, "session started");
    }

    /// Offers free text as the prompt.
    pub fn submit_prompt(&self, user: UserId, text: &str) -> PromptOutcome {
        let mut sessions = self.lock();
        let Some(session) = self.live(&mut sessions, user) else {
            return PromptOutcome::Ignored;
        };
        if session.state != SessionState::AwaitingPrompt {
            return PromptOutcome::Ignored;
        }
        let prompt = text.trim();
        if prompt.is_empty() {
            return PromptOutcome::Blank;
        }
        session.prompt = Some(prompt.to_string());
        session.state = SessionState::AwaitingDimension;
        session.touched = Instant::now();
        PromptOutcome::Accepted(prompt.to_string())
    }

    /// Records the dimension. Returns false when the session was not
    /// waiting for one.
    pub fn select_dimension(&self, user: UserId, dimension: Dimension) -> bool {
        let mut sessions = self.lock();
        match self.live(&mut sessions, user) {
            Some(session) if session.state == SessionState::AwaitingDimension => {
                session.dimension = Some(dimension);
                session.state = SessionState::AwaitingImprove;
                session.touched = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Records the improve flag and hands out the completed request.
    ///
    /// The session is back to `Idle` once this returns `Some`, so a repeated
    /// improve selection cannot start a second generation.
    pub fn select_improve(&self, user: UserId, improve: bool) -> Option<GenerationRequest> {
        let mut sessions = self.lock();
        let session = self.live(&mut sessions, user)?;
        if session.state != SessionState::AwaitingImprove {
            return None;
        }
        let (Some(prompt), Some(dimension)) = (session.prompt.take(), session.dimension) else {
            sessions.remove(&user);
            return None;
        };
        sessions.remove(&user);
        Some(GenerationRequest {
            prompt,
            dimension,
            improve,
        })
    }

    /// Forgets `user`'s session.
    pub fn reset(&self, user: UserId) {
        self.lock().remove(&user);
    }

    /// Number of conversations in progress, not counting expired ones.
    pub fn active(&self) -> usize {
        let mut sessions = self.lock();
        sessions.retain(|_, s| !self.is_expired(s));
        sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(10);
    const BOB: UserId = UserId(20);

    fn walk_to_improve(store: &SessionStore, user: UserId) {
        store.begin(user);
        assert_eq!(
            store.submit_prompt(user, "  a red fox  "),
            PromptOutcome::Accepted("a red fox".into())
        );
        assert!(store.select_dimension(user, Dimension::Tall));
    }

    #[test]
    fn full_walk_yields_request_and_returns_to_idle() {
        let store = SessionStore::default();
        walk_to_improve(&store, ALICE);
        assert_eq!(store.state(ALICE), SessionState::AwaitingImprove);

        let request = store.select_improve(ALICE, true).unwrap();
        assert_eq!(
            request,
            GenerationRequest {
                prompt: "a red fox".into(),
                dimension: Dimension::Tall,
                improve: true,
            }
        );
        assert_eq!(store.state(ALICE), SessionState::Idle);
        assert!(store.select_improve(ALICE, true).is_none());
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let store = SessionStore::default();
        assert!(!store.select_dimension(ALICE, Dimension::Wide));
        assert!(store.select_improve(ALICE, false).is_none());
        assert_eq!(store.submit_prompt(ALICE, "hello"), PromptOutcome::Ignored);
        assert_eq!(store.state(ALICE), SessionState::Idle);

        store.begin(ALICE);
        assert!(!store.select_dimension(ALICE, Dimension::Wide));
        assert!(store.select_improve(ALICE, false).is_none());
        assert_eq!(store.state(ALICE), SessionState::AwaitingPrompt);
    }

    #[test]
    fn blank_prompt_keeps_waiting() {
        let store = SessionStore::default();
        store.begin(ALICE);
        assert_eq!(store.submit_prompt(ALICE, "   \n\t"), PromptOutcome::Blank);
        assert_eq!(store.state(ALICE), SessionState::AwaitingPrompt);
    }

    #[test]
    fn text_after_prompt_is_ignored() {
        let store = SessionStore::default();
        store.begin(ALICE);
        store.submit_prompt(ALICE, "first");
        assert_eq!(store.submit_prompt(ALICE, "second"), PromptOutcome::Ignored);
        assert!(store.select_dimension(ALICE, Dimension::Square));
        assert_eq!(store.select_improve(ALICE, false).unwrap().prompt, "first");
    }

    #[test]
    fn begin_discards_scratch_data() {
        let store = SessionStore::default();
        walk_to_improve(&store, ALICE);
        store.begin(ALICE);
        assert_eq!(store.state(ALICE), SessionState::AwaitingPrompt);
        assert!(!store.select_dimension(ALICE, Dimension::Wide));
    }

    #[test]
    fn users_are_independent() {
        let store = SessionStore::default();
        walk_to_improve(&store, ALICE);
        store.begin(BOB);
        assert_eq!(store.state(BOB), SessionState::AwaitingPrompt);
        assert_eq!(store.state(ALICE), SessionState::AwaitingImprove);
        assert_eq!(store.active(), 2);
        store.reset(BOB);
        assert_eq!(store.active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_session_expires() {
        let store = SessionStore::with_ttl_secs(60);
        walk_to_improve(&store, ALICE);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.state(ALICE), SessionState::AwaitingImprove);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.select_improve(ALICE, true).is_none());
        assert_eq!(store.state(ALICE), SessionState::Idle);
        assert_eq!(store.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_never_expires() {
        let store = SessionStore::with_ttl_secs(0);
        walk_to_improve(&store, ALICE);
        tokio::time::advance(Duration::from_secs(86_400 * 30)).await;
        assert!(store.select_improve(ALICE, false).is_some());
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::AwaitingImprove.to_string(), "awaiting_improve");
    }
}
