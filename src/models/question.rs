// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Difficulty label carried by every question. Informational only; scoring
/// does not weight by difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One entry of the question bank, loaded from the questions file at
/// startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub prompt: String,

    /// Exactly four choices, in display order.
    pub options: Vec<String>,

    /// Index into `options` of the correct choice.
    pub correct_option_index: usize,

    /// Shown to the user after they answer (or run out of time).
    pub explanation: String,

    pub difficulty: Difficulty,
}

/// DTO for sending a question to the client (excludes the correct index and
/// the explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            prompt: q.prompt.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
        }
    }
}
