use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::canvas::client::{ScoringClient, SubmitError};
use crate::canvas::encode::png_data_uri;
use crate::canvas::feedback::{FeedbackCategory, FeedbackState, FeedbackView};
use crate::canvas::layer::RgbaLayer;
use crate::canvas::messages::{ScoreResponse, SubmissionRequest};

pub const SUBMIT_LABEL: &str = "Submit";
pub const CHECKING_LABEL: &str = "Checking...";

type ScoreResult = Result<ScoreResponse, SubmitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Settled(FeedbackCategory),
}

/// What the host should render for the submit control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTrigger {
    pub enabled: bool,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Dispatched,
    /// A request is already in flight; nothing was sent.
    AlreadyPending,
    /// Settled immediately without reaching the scoring client.
    Settled(FeedbackCategory),
}

/// Drives one request at a time to the scoring client and the feedback shown
/// for its result.
///
/// The request runs on a worker thread; [`SubmissionController::poll`] must be
/// called from the owning thread to pick up the result.
pub struct SubmissionController {
    lesson_id: String,
    client: Arc<dyn ScoringClient>,
    phase: SubmissionPhase,
    feedback: FeedbackState,
    pending: Option<Receiver<ScoreResult>>,
    scroll_requested: bool,
    requests_issued: u64,
}

impl SubmissionController {
    pub fn new(lesson_id: impl Into<String>, client: Arc<dyn ScoringClient>) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            client,
            phase: SubmissionPhase::Idle,
            feedback: FeedbackState::Hidden,
            pending: None,
            scroll_requested: false,
            requests_issued: 0,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == SubmissionPhase::Submitting
    }

    pub fn feedback(&self) -> &FeedbackState {
        &self.feedback
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    pub fn trigger(&self) -> SubmitTrigger {
        if self.is_submitting() {
            SubmitTrigger {
                enabled: false,
                label: CHECKING_LABEL,
            }
        } else {
            SubmitTrigger {
                enabled: true,
                label: SUBMIT_LABEL,
            }
        }
    }

    /// Returns true once after each settlement; the host scrolls the
    /// feedback into view when it sees it.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn submit(&mut self, ink: &RgbaLayer) -> SubmitOutcome {
        if self.is_submitting() {
            tracing::debug!("submit ignored; lesson {} already pending", self.lesson_id);
            return SubmitOutcome::AlreadyPending;
        }

        let image = match png_data_uri(ink) {
            Ok(image) => image,
            Err(e) => {
                let category = self.settle(Err(SubmitError::Encode(format!("{e:#}"))));
                return SubmitOutcome::Settled(category);
            }
        };
        let request = SubmissionRequest {
            lesson_id: self.lesson_id.clone(),
            image,
        };

        let (tx, rx) = mpsc::channel();
        let client = Arc::clone(&self.client);
        thread::spawn(move || {
            let result = client.submit(&request);
            let _ = tx.send(result);
        });

        self.pending = Some(rx);
        self.phase = SubmissionPhase::Submitting;
        self.requests_issued += 1;
        tracing::info!("submitted attempt for lesson {}", self.lesson_id);
        SubmitOutcome::Dispatched
    }

    /// Settles the in-flight request if its result has arrived.
    pub fn poll(&mut self) -> Option<FeedbackCategory> {
        let result = match self.pending.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(SubmitError::WorkerGone),
        };
        Some(self.settle(result))
    }

    /// Blocks up to `timeout` for the in-flight request to settle.
    pub fn wait(&mut self, timeout: Duration) -> Option<FeedbackCategory> {
        let result = match self.pending.as_ref()?.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(SubmitError::WorkerGone),
        };
        Some(self.settle(result))
    }

    /// Hides feedback after the ink was cleared. An in-flight request keeps
    /// running and still settles.
    pub fn reset(&mut self) {
        self.feedback = FeedbackState::Hidden;
        self.scroll_requested = false;
        if let SubmissionPhase::Settled(_) = self.phase {
            self.phase = SubmissionPhase::Idle;
        }
    }

    fn settle(&mut self, result: ScoreResult) -> FeedbackCategory {
        let view = match &result {
            Ok(response) => FeedbackView::from_response(response),
            Err(error) => FeedbackView::from_transport_error(error),
        };
        match &result {
            Ok(response) if response.success => tracing::info!(
                "lesson {} scored: correct={} accuracy={:?}",
                self.lesson_id,
                response.correct,
                response.accuracy
            ),
            Ok(response) => tracing::warn!(
                "lesson {} rejected by scoring service: {:?}",
                self.lesson_id,
                response.error
            ),
            Err(error) => tracing::warn!("lesson {} submission failed: {error}", self.lesson_id),
        }

        let category = view.category;
        self.pending = None;
        self.phase = SubmissionPhase::Settled(category);
        self.feedback = FeedbackState::Visible(view);
        self.scroll_requested = true;
        category
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixed {
        result: ScoreResult,
        calls: AtomicUsize,
        gate: Option<Mutex<Receiver<()>>>,
    }

    impl Fixed {
        fn new(result: ScoreResult) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    impl ScoringClient for Fixed {
        fn submit(&self, _request: &SubmissionRequest) -> ScoreResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _ = gate.lock().expect("gate lock").recv();
            }
            self.result.clone()
        }
    }

    fn ink() -> RgbaLayer {
        RgbaLayer::new(16, 8)
    }

    #[test]
    fn trigger_is_disabled_only_while_submitting() {
        let (release, gate) = mpsc::channel();
        let client = Arc::new(Fixed {
            gate: Some(Mutex::new(gate)),
            ..Fixed::new(Ok(ScoreResponse::scored(true, None, "ok")))
        });
        let mut controller = SubmissionController::new("1", client);
        assert_eq!(
            controller.trigger(),
            SubmitTrigger {
                enabled: true,
                label: SUBMIT_LABEL
            }
        );

        assert_eq!(controller.submit(&ink()), SubmitOutcome::Dispatched);
        assert_eq!(
            controller.trigger(),
            SubmitTrigger {
                enabled: false,
                label: CHECKING_LABEL
            }
        );
        assert_eq!(controller.poll(), None);

        release.send(()).expect("release");
        assert_eq!(controller.wait(WAIT), Some(FeedbackCategory::Success));
        assert!(controller.trigger().enabled);
        assert!(controller.take_scroll_request());
        assert!(!controller.take_scroll_request());
    }

    #[test]
    fn reentrant_submit_issues_no_second_request() {
        let (release, gate) = mpsc::channel();
        let client = Arc::new(Fixed {
            gate: Some(Mutex::new(gate)),
            ..Fixed::new(Ok(ScoreResponse::scored(false, Some(12.0), "again")))
        });
        let mut controller = SubmissionController::new("1", client.clone());

        controller.submit(&ink());
        assert_eq!(controller.submit(&ink()), SubmitOutcome::AlreadyPending);
        release.send(()).expect("release");
        controller.wait(WAIT);

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.requests_issued(), 1);
    }

    #[test]
    fn vanished_worker_settles_as_failure() {
        struct Panics;
        impl ScoringClient for Panics {
            fn submit(&self, _request: &SubmissionRequest) -> ScoreResult {
                panic!("scoring client crashed");
            }
        }

        let mut controller = SubmissionController::new("1", Arc::new(Panics));
        controller.submit(&ink());
        assert_eq!(controller.wait(WAIT), Some(FeedbackCategory::Failure));
        assert!(controller.trigger().enabled);
        assert_eq!(
            controller.feedback().view().map(|v| v.message.clone()),
            Some(format!("An error occurred: {}", SubmitError::WorkerGone))
        );
    }

    #[test]
    fn reset_hides_feedback_and_returns_to_idle() {
        let client = Arc::new(Fixed::new(Err(SubmitError::Timeout)));
        let mut controller = SubmissionController::new("1", client);
        controller.submit(&ink());
        controller.wait(WAIT);
        assert_eq!(
            controller.phase(),
            SubmissionPhase::Settled(FeedbackCategory::Failure)
        );

        controller.reset();
        assert_eq!(controller.phase(), SubmissionPhase::Idle);
        assert_eq!(controller.feedback(), &FeedbackState::Hidden);
    }

    #[test]
    fn settlement_never_resets_on_its_own() {
        let client = Arc::new(Fixed::new(Ok(ScoreResponse::scored(true, None, "ok"))));
        let mut controller = SubmissionController::new("1", client);
        controller.submit(&ink());
        controller.wait(WAIT);
        assert_eq!(controller.poll(), None);
        assert!(controller.feedback().is_visible());
    }
}
