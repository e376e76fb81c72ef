//! Question bank and grading.
//!
//! The bank is built once at startup and shared read-only by every
//! session, so all clients see the same questions in the same order.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Points awarded for each correct answer
pub const POINTS_PER_QUESTION: u32 = 20;

/// A quiz prompt paired with its canonical answer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub answer: String,
}

impl Question {
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }

    /// Check a submitted answer, ignoring surrounding whitespace and case.
    pub fn is_correct(&self, submitted: &str) -> bool {
        submitted.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }
}

/// The built-in question set
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new("What is the capital of South Korea?", "Seoul"),
        Question::new("What is the capital of Australia?", "Canberra"),
        Question::new("What is 34 + 785?", "819"),
        Question::new("What is the solution to the equation x + 8 = 7?", "-1"),
        Question::new("What is the color of the sky on a clear day?", "Blue"),
    ]
}

/// Shared, immutable question sequence
pub type QuestionBank = Arc<[Question]>;

/// Running or final score of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub earned: u32,
    pub max: u32,
}

impl Score {
    /// Start a zero score for a quiz of `question_count` questions.
    pub fn new(question_count: usize) -> Self {
        let count = u32::try_from(question_count).unwrap_or(u32::MAX);
        Self {
            earned: 0,
            max: count.saturating_mul(POINTS_PER_QUESTION),
        }
    }

    pub fn record(&mut self, correct: bool) {
        if correct {
            self.earned += POINTS_PER_QUESTION;
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.earned, self.max)
    }
}
