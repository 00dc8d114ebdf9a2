// src/models/session.rs

use serde::{Deserialize, Serialize};

use crate::models::question::PublicQuestion;

/// One recorded answer. At most one per question per session; a later
/// answer for the same question replaces the earlier one.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question_id: i64,

    /// `None` for the implicit skip recorded when the countdown expires
    /// with no option selected.
    pub selected_option_index: Option<usize>,

    pub is_correct: bool,

    /// Wall-clock seconds between the question being shown and the session
    /// advancing past it. Stamped on advance.
    pub time_spent_seconds: i64,

    pub answered_at_epoch_ms: i64,
}

/// Immutable summary produced exactly once when a session finishes.
///
/// Questions skipped by the user (discarded answers) count toward neither
/// `correct_count` nor `wrong_count`; questions that timed out untouched
/// carry a skip-answer and count as wrong.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub total_questions: usize,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub score_percent: f64,
    pub answers: Vec<Answer>,
    pub total_time_spent_seconds: i64,
    pub average_time_spent_seconds: f64,
}

/// DTO returned when a session is created or restarted.
#[derive(Debug, Serialize)]
pub struct StartQuizResponse {
    pub session_id: String,
    pub question: PublicQuestion,
    /// 1-based position of the served question.
    pub question_number: usize,
    pub total_questions: usize,
    pub seconds_per_question: i64,
}

/// DTO for recording an answer to the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option_index: usize,
}

/// DTO echoing the verdict so the client can render the explanation panel.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub is_correct: bool,
    pub correct_option_index: usize,
    pub explanation: String,
}

/// DTO for moving past the current question. `skip` discards any recorded
/// answer first.
#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default)]
    pub skip: bool,
}

#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QuizResult>,
}

/// Snapshot of a live session, served on page reloads.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: &'static str,
    pub question_number: Option<usize>,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    /// Whether the current question already has a recorded answer.
    pub answered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_index: Option<usize>,
    pub started_at_epoch_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QuizResult>,
}
