// src/quiz/bank.rs

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::models::question::Question;

/// The ordered, immutable question bank. Loaded once at process start;
/// sessions hold a shared handle and never observe changes.
#[derive(Debug)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

#[derive(Debug)]
pub enum BankError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankError::Io(e) => write!(f, "failed to read questions file: {}", e),
            BankError::Parse(e) => write!(f, "failed to parse questions file: {}", e),
            BankError::Invalid(msg) => write!(f, "invalid question bank: {}", msg),
        }
    }
}

impl std::error::Error for BankError {}

impl From<std::io::Error> for BankError {
    fn from(e: std::io::Error) -> Self {
        BankError::Io(e)
    }
}

impl From<serde_json::Error> for BankError {
    fn from(e: serde_json::Error) -> Self {
        BankError::Parse(e)
    }
}

impl QuestionBank {
    /// Builds a bank from already-parsed questions, validating each entry.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id) {
                return Err(BankError::Invalid(format!("duplicate question id {}", q.id)));
            }
            if q.prompt.trim().is_empty() {
                return Err(BankError::Invalid(format!(
                    "question {} has an empty prompt",
                    q.id
                )));
            }
            if q.options.len() != 4 {
                return Err(BankError::Invalid(format!(
                    "question {} must have exactly 4 options, found {}",
                    q.id,
                    q.options.len()
                )));
            }
            if q.correct_option_index >= q.options.len() {
                return Err(BankError::Invalid(format!(
                    "question {} correct_option_index {} is out of range",
                    q.id, q.correct_option_index
                )));
            }
        }
        Ok(Self { questions })
    }

    /// Loads the bank from a JSON file containing an array of questions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let raw = fs::read_to_string(path)?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        Self::from_questions(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}
