use serde::{Deserialize, Serialize};

/// One attempt to be scored: the encoded ink layer for a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub lesson_id: String,
    /// PNG data URI of the ink layer.
    pub image: String,
}

/// JSON body of `POST /api/submit_attempt/{lesson_id}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmitAttemptBody<'a> {
    pub image: &'a str,
}

/// Scoring service reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub correct: bool,
    /// Percentage in 0..=100.
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScoreResponse {
    pub fn scored(correct: bool, accuracy: Option<f64>, feedback: impl Into<String>) -> Self {
        Self {
            success: true,
            correct,
            accuracy,
            feedback: Some(feedback.into()),
            error: None,
        }
    }

    pub fn server_error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
