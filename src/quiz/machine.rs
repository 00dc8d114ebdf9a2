// src/quiz/machine.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::models::question::Question;
use crate::models::session::{Answer, QuizResult};
use crate::quiz::bank::QuestionBank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    NotStarted,
    InProgress { index: usize },
    Finished,
}

/// Rejected transitions. These are interface guards, not failures: the
/// machine never corrupts its state on bad input.
#[derive(Debug, PartialEq, Eq)]
pub enum MachineError {
    EmptyBank,
    AlreadyStarted,
    NotInProgress,
    InvalidOption,
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::EmptyBank => write!(f, "question bank is empty"),
            MachineError::AlreadyStarted => write!(f, "quiz is already in progress"),
            MachineError::NotInProgress => write!(f, "quiz is not in progress"),
            MachineError::InvalidOption => write!(f, "selected option does not exist"),
        }
    }
}

impl std::error::Error for MachineError {}

/// Outcome of recording an answer, echoed back so the client can render
/// the explanation panel.
#[derive(Debug)]
pub struct SelectOutcome {
    pub is_correct: bool,
    pub correct_option_index: usize,
    pub explanation: String,
}

#[derive(Debug)]
pub enum AdvanceOutcome {
    Next { index: usize },
    Finished(QuizResult),
}

/// Drives one user through the fixed question set.
///
/// Pure state: callers supply wall-clock timestamps, and all I/O (timers,
/// persistence) lives outside. `NotStarted → InProgress → Finished`, with
/// `reset` as the only way back out of `Finished`.
pub struct QuizMachine {
    bank: Arc<QuestionBank>,
    state: MachineState,
    answers: HashMap<i64, Answer>,
    /// Transient UI selection for the current question; cleared on advance.
    current_selection: Option<usize>,
    started_at_ms: i64,
    question_shown_at_ms: i64,
    result: Option<QuizResult>,
}

impl QuizMachine {
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self {
            bank,
            state: MachineState::NotStarted,
            answers: HashMap::new(),
            current_selection: None,
            started_at_ms: 0,
            question_shown_at_ms: 0,
            result: None,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, MachineState::InProgress { .. })
    }

    pub fn total_questions(&self) -> usize {
        self.bank.len()
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            MachineState::InProgress { index } => self.bank.get(index),
            _ => None,
        }
    }

    /// Whether the current question already has a recorded answer.
    pub fn current_answered(&self) -> bool {
        self.current_question()
            .map(|q| self.answers.contains_key(&q.id))
            .unwrap_or(false)
    }

    /// The option picked for the current question, for UI restore on
    /// reload. Cleared on advance.
    pub fn current_selection(&self) -> Option<usize> {
        self.current_selection
    }

    /// `Some` once the machine has finished, until the next `start`/`reset`.
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    /// Starts a fresh run on question 0. Valid from `NotStarted` or
    /// `Finished`; an empty bank is rejected rather than crashing later.
    pub fn start(&mut self, now_ms: i64) -> Result<&Question, MachineError> {
        if self.is_in_progress() {
            return Err(MachineError::AlreadyStarted);
        }
        if self.bank.is_empty() {
            return Err(MachineError::EmptyBank);
        }
        self.answers.clear();
        self.result = None;
        self.current_selection = None;
        self.started_at_ms = now_ms;
        self.question_shown_at_ms = now_ms;
        self.state = MachineState::InProgress { index: 0 };
        match self.bank.get(0) {
            Some(q) => Ok(q),
            None => Err(MachineError::EmptyBank),
        }
    }

    /// Records (or overwrites) the answer for the current question. Does
    /// not advance; the caller cancels the countdown and the user moves on
    /// explicitly once they have read the explanation.
    pub fn select_answer(
        &mut self,
        option_index: usize,
        now_ms: i64,
    ) -> Result<SelectOutcome, MachineError> {
        let index = match self.state {
            MachineState::InProgress { index } => index,
            _ => return Err(MachineError::NotInProgress),
        };
        let bank = Arc::clone(&self.bank);
        let question = bank.get(index).ok_or(MachineError::NotInProgress)?;
        if option_index >= question.options.len() {
            return Err(MachineError::InvalidOption);
        }
        let is_correct = option_index == question.correct_option_index;
        self.answers.insert(
            question.id,
            Answer {
                question_id: question.id,
                selected_option_index: Some(option_index),
                is_correct,
                time_spent_seconds: self.elapsed_seconds(now_ms),
                answered_at_epoch_ms: now_ms,
            },
        );
        self.current_selection = Some(option_index);
        Ok(SelectOutcome {
            is_correct,
            correct_option_index: question.correct_option_index,
            explanation: question.explanation.clone(),
        })
    }

    /// Moves to the next question or finishes the run.
    ///
    /// With `skip` the current question's recorded answer (if any) is
    /// discarded and the question counts toward neither correct nor wrong.
    /// Otherwise the elapsed wall-clock time is stamped onto the retained
    /// answer. Finishing builds the result exactly once per `start`.
    pub fn advance(&mut self, skip: bool, now_ms: i64) -> Result<AdvanceOutcome, MachineError> {
        let index = match self.state {
            MachineState::InProgress { index } => index,
            _ => return Err(MachineError::NotInProgress),
        };
        let bank = Arc::clone(&self.bank);
        let question = bank.get(index).ok_or(MachineError::NotInProgress)?;
        let elapsed = self.elapsed_seconds(now_ms);
        if skip {
            self.answers.remove(&question.id);
        } else if let Some(answer) = self.answers.get_mut(&question.id) {
            answer.time_spent_seconds = elapsed;
        }
        self.current_selection = None;
        if index + 1 == self.bank.len() {
            self.state = MachineState::Finished;
            let result = self.build_result();
            self.result = Some(result.clone());
            Ok(AdvanceOutcome::Finished(result))
        } else {
            self.state = MachineState::InProgress { index: index + 1 };
            self.question_shown_at_ms = now_ms;
            Ok(AdvanceOutcome::Next { index: index + 1 })
        }
    }

    /// Countdown expiry: records an implicit skip when the question is
    /// still unanswered, then advances with whatever answer is on record.
    /// One of the two, never both, never neither.
    ///
    /// Returns `None` when the session is not in progress (stale fire).
    pub fn expire(&mut self, now_ms: i64) -> Option<AdvanceOutcome> {
        let index = match self.state {
            MachineState::InProgress { index } => index,
            _ => return None,
        };
        let bank = Arc::clone(&self.bank);
        let question = bank.get(index)?;
        if !self.answers.contains_key(&question.id) {
            self.answers.insert(
                question.id,
                Answer {
                    question_id: question.id,
                    selected_option_index: None,
                    is_correct: false,
                    time_spent_seconds: self.elapsed_seconds(now_ms),
                    answered_at_epoch_ms: now_ms,
                },
            );
        }
        self.advance(false, now_ms).ok()
    }

    /// Returns to `NotStarted`, dropping all recorded state.
    pub fn reset(&mut self) {
        self.state = MachineState::NotStarted;
        self.answers.clear();
        self.current_selection = None;
        self.result = None;
    }

    fn elapsed_seconds(&self, now_ms: i64) -> i64 {
        (now_ms - self.question_shown_at_ms).max(0) / 1000
    }

    fn build_result(&self) -> QuizResult {
        let answers: Vec<Answer> = self
            .bank
            .questions()
            .iter()
            .filter_map(|q| self.answers.get(&q.id).cloned())
            .collect();
        let correct_count = answers.iter().filter(|a| a.is_correct).count();
        let wrong_count = answers.len() - correct_count;
        let total_questions = self.bank.len();
        let total_time: i64 = answers.iter().map(|a| a.time_spent_seconds).sum();
        let average = if answers.is_empty() {
            0.0
        } else {
            total_time as f64 / answers.len() as f64
        };
        let score_percent = if total_questions == 0 {
            0.0
        } else {
            100.0 * correct_count as f64 / total_questions as f64
        };
        QuizResult {
            total_questions,
            correct_count,
            wrong_count,
            score_percent,
            answers,
            total_time_spent_seconds: total_time,
            average_time_spent_seconds: average,
        }
    }
}
