// src/quiz/store.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::Mutex as AsyncMutex;

use crate::config;
use crate::models::question::PublicQuestion;
use crate::models::session::{
    AdvanceResponse, AnswerResponse, QuizResult, SessionView, StartQuizResponse,
};
use crate::quiz::bank::QuestionBank;
use crate::quiz::clock::SessionClock;
use crate::quiz::machine::{AdvanceOutcome, MachineError, MachineState, QuizMachine};

/// One live quiz attempt: the state machine plus its countdown and a
/// freshness deadline. All access goes through the session's async mutex,
/// so timer callbacks and user actions never interleave mid-update.
pub struct ActiveSession {
    machine: QuizMachine,
    clock: SessionClock,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    NotFound,
    NotFinished,
    Machine(MachineError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "session not found or expired"),
            SessionError::NotFinished => write!(f, "quiz is not finished"),
            SessionError::Machine(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<MachineError> for SessionError {
    fn from(e: MachineError) -> Self {
        SessionError::Machine(e)
    }
}

type SessionCell = Arc<AsyncMutex<ActiveSession>>;

struct StoreInner {
    bank: Arc<QuestionBank>,
    sessions: Mutex<HashMap<String, SessionCell>>,
}

/// In-memory registry of active sessions, keyed by an opaque id handed to
/// the client. Cloning shares the underlying map; the countdown tasks hold
/// a clone so an expiry can drive the session it belongs to.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                bank,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn fresh_deadline() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::minutes(config::SESSION_TTL_MINUTES)
    }

    fn new_session_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionCell>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates a session, starts the machine on question 0 and arms the
    /// first countdown.
    pub async fn start(&self) -> Result<StartQuizResponse, SessionError> {
        let now = Self::now_ms();
        let mut machine = QuizMachine::new(Arc::clone(&self.inner.bank));
        let question = PublicQuestion::from(machine.start(now)?);
        let total = machine.total_questions();

        let session_id = Self::new_session_id();
        let cell = Arc::new(AsyncMutex::new(ActiveSession {
            machine,
            clock: SessionClock::new(),
            expires_at: Self::fresh_deadline(),
        }));
        self.sessions().insert(session_id.clone(), Arc::clone(&cell));

        {
            let mut session = cell.lock().await;
            self.arm_clock(&session_id, &mut session);
        }

        Ok(StartQuizResponse {
            session_id,
            question,
            question_number: 1,
            total_questions: total,
            seconds_per_question: config::QUESTION_SECONDS,
        })
    }

    fn lookup(&self, session_id: &str) -> Option<SessionCell> {
        self.sessions().get(session_id).cloned()
    }

    /// Fetches a session cell, evicting it when its freshness window has
    /// lapsed.
    async fn checked(&self, session_id: &str) -> Result<SessionCell, SessionError> {
        let cell = self.lookup(session_id).ok_or(SessionError::NotFound)?;
        let expired = { cell.lock().await.expires_at < Utc::now() };
        if expired {
            self.remove(session_id).await;
            return Err(SessionError::NotFound);
        }
        Ok(cell)
    }

    /// Records the answer for the current question. The countdown is done
    /// the instant an answer exists; advancing stays a separate action.
    pub async fn select_answer(
        &self,
        session_id: &str,
        option_index: usize,
    ) -> Result<AnswerResponse, SessionError> {
        let cell = self.checked(session_id).await?;
        let mut session = cell.lock().await;
        let outcome = session.machine.select_answer(option_index, Self::now_ms())?;
        session.clock.cancel();
        session.expires_at = Self::fresh_deadline();
        Ok(AnswerResponse {
            is_correct: outcome.is_correct,
            correct_option_index: outcome.correct_option_index,
            explanation: outcome.explanation,
        })
    }

    /// Moves past the current question, re-arming the countdown for the
    /// next one or tearing the clock down on finish.
    pub async fn advance(
        &self,
        session_id: &str,
        skip: bool,
    ) -> Result<AdvanceResponse, SessionError> {
        let cell = self.checked(session_id).await?;
        let mut session = cell.lock().await;
        let outcome = session.machine.advance(skip, Self::now_ms())?;
        session.expires_at = Self::fresh_deadline();
        let total = session.machine.total_questions();
        match outcome {
            AdvanceOutcome::Next { index } => {
                self.arm_clock(session_id, &mut session);
                let question = session.machine.current_question().map(PublicQuestion::from);
                Ok(AdvanceResponse {
                    finished: false,
                    question,
                    question_number: Some(index + 1),
                    total_questions: total,
                    result: None,
                })
            }
            AdvanceOutcome::Finished(result) => {
                session.clock.cancel();
                Ok(AdvanceResponse {
                    finished: true,
                    question: None,
                    question_number: None,
                    total_questions: total,
                    result: Some(result),
                })
            }
        }
    }

    /// Explicit restart in place: back to `NotStarted`, then a fresh run on
    /// question 0 with a new countdown.
    pub async fn restart(&self, session_id: &str) -> Result<StartQuizResponse, SessionError> {
        let cell = self.checked(session_id).await?;
        let mut session = cell.lock().await;
        session.clock.cancel();
        session.machine.reset();
        let question = PublicQuestion::from(session.machine.start(Self::now_ms())?);
        session.expires_at = Self::fresh_deadline();
        self.arm_clock(session_id, &mut session);
        Ok(StartQuizResponse {
            session_id: session_id.to_string(),
            question,
            question_number: 1,
            total_questions: session.machine.total_questions(),
            seconds_per_question: config::QUESTION_SECONDS,
        })
    }

    pub async fn view(&self, session_id: &str) -> Result<SessionView, SessionError> {
        let cell = self.checked(session_id).await?;
        let session = cell.lock().await;
        let now = Self::now_ms();
        let (state, question_number) = match session.machine.state() {
            MachineState::NotStarted => ("not_started", None),
            MachineState::InProgress { index } => ("in_progress", Some(index + 1)),
            MachineState::Finished => ("finished", None),
        };
        Ok(SessionView {
            state,
            question_number,
            total_questions: session.machine.total_questions(),
            question: session.machine.current_question().map(PublicQuestion::from),
            remaining_seconds: session.clock.remaining_seconds(now),
            answered: session.machine.current_answered(),
            selected_option_index: session.machine.current_selection(),
            started_at_epoch_ms: session.machine.started_at_ms(),
            result: session.machine.result().cloned(),
        })
    }

    /// The finished session's result, required for registration.
    pub async fn finished_result(&self, session_id: &str) -> Result<QuizResult, SessionError> {
        let cell = self.checked(session_id).await?;
        let session = cell.lock().await;
        session
            .machine
            .result()
            .cloned()
            .ok_or(SessionError::NotFinished)
    }

    /// Tears the session down, cancelling any live countdown. Idempotent.
    pub async fn remove(&self, session_id: &str) {
        let cell = { self.sessions().remove(session_id) };
        if let Some(cell) = cell {
            cell.lock().await.clock.cancel();
        }
    }

    fn arm_clock(&self, session_id: &str, session: &mut ActiveSession) {
        let now = Self::now_ms();
        let generation = session
            .clock
            .prepare(now + config::QUESTION_SECONDS * 1000);
        let store = self.clone();
        let id = session_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(config::QUESTION_SECONDS as u64)).await;
            store.handle_expiry(&id, generation).await;
        });
        session.clock.attach(handle);
    }

    /// Expiry callback. Verifies the countdown is still the live one before
    /// touching the machine, then records the implicit skip (when needed)
    /// and advances, re-arming for the next question.
    async fn handle_expiry(&self, session_id: &str, generation: u64) {
        let Some(cell) = self.lookup(session_id) else {
            return;
        };
        let mut session = cell.lock().await;
        if session.clock.generation() != generation {
            // superseded by an answer, a manual advance or a teardown
            return;
        }
        if session.expires_at < Utc::now() {
            drop(session);
            self.remove(session_id).await;
            return;
        }
        match session.machine.expire(Self::now_ms()) {
            Some(AdvanceOutcome::Next { .. }) => self.arm_clock(session_id, &mut session),
            Some(AdvanceOutcome::Finished(_)) => session.clock.cancel(),
            None => {}
        }
    }
}
