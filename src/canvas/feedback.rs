use crate::canvas::client::SubmitError;
use crate::canvas::messages::ScoreResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCategory {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackView {
    pub category: FeedbackCategory,
    pub message: String,
    pub accuracy: Option<f64>,
}

impl FeedbackView {
    pub fn from_response(response: &ScoreResponse) -> Self {
        if !response.success {
            let error = response.error.as_deref().unwrap_or("unknown error");
            return Self::failure(format!("Error: {error}"));
        }
        Self {
            category: if response.correct {
                FeedbackCategory::Success
            } else {
                FeedbackCategory::Failure
            },
            message: response.feedback.clone().unwrap_or_default(),
            accuracy: response.accuracy,
        }
    }

    pub fn from_transport_error(error: &SubmitError) -> Self {
        Self::failure(format!("An error occurred: {error}"))
    }

    fn failure(message: String) -> Self {
        Self {
            category: FeedbackCategory::Failure,
            message,
            accuracy: None,
        }
    }

    /// Accuracy to one decimal place, e.g. `87.4%`.
    pub fn accuracy_text(&self) -> Option<String> {
        self.accuracy.map(|accuracy| format!("{accuracy:.1}%"))
    }

    pub fn accuracy_annotation(&self) -> Option<String> {
        self.accuracy_text().map(|text| format!("Accuracy: {text}"))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedbackState {
    #[default]
    Hidden,
    Visible(FeedbackView),
}

impl FeedbackState {
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible(_))
    }

    pub fn category(&self) -> Option<FeedbackCategory> {
        match self {
            Self::Hidden => None,
            Self::Visible(view) => Some(view.category),
        }
    }

    pub fn view(&self) -> Option<&FeedbackView> {
        match self {
            Self::Hidden => None,
            Self::Visible(view) => Some(view),
        }
    }
}
