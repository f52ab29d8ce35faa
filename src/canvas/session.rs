use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;

use crate::canvas::client::{HttpScoringClient, ScoringClient};
use crate::canvas::encode::export_png;
use crate::canvas::feedback::{FeedbackCategory, FeedbackState};
use crate::canvas::input::{InputNormalizer, Normalized, RawInput, SurfaceRect};
use crate::canvas::layer::Surface;
use crate::canvas::render::DirtyRect;
use crate::canvas::settings::CanvasConfig;
use crate::canvas::sizer::{ContainerMetrics, SurfaceSize, SurfaceSizer};
use crate::canvas::stroke::StrokeRenderer;
use crate::canvas::submit::{SubmissionController, SubmissionPhase, SubmitOutcome, SubmitTrigger};
use crate::canvas::template::{AbGlyphRasterizer, GlyphRasterizer, TemplateRenderer};
use crate::canvas::viewport::{ViewportEvents, ViewportSubscription};

/// Result of feeding one raw input event to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputResult {
    pub normalized: Normalized,
    pub dirty: Option<DirtyRect>,
}

/// One lesson's drawing surface: template and ink layers, gesture handling
/// and the submission round trip.
pub struct LessonCanvas {
    config: CanvasConfig,
    surface: Surface,
    sizer: SurfaceSizer,
    template: TemplateRenderer,
    input: InputNormalizer,
    stroke: StrokeRenderer,
    submission: SubmissionController,
    viewport: Option<ViewportSubscription>,
}

impl LessonCanvas {
    /// Builds a surface with the default glyph rasterizer and HTTP scoring client.
    pub fn from_config(config: CanvasConfig, initial: ContainerMetrics) -> Result<Self> {
        config.validate()?;
        let rasterizer =
            AbGlyphRasterizer::from_style(&config.template).context("load template font")?;
        let client = HttpScoringClient::new(&config.endpoint).context("build scoring client")?;
        Self::new(config, Box::new(rasterizer), Arc::new(client), initial)
    }

    pub fn new(
        config: CanvasConfig,
        rasterizer: Box<dyn GlyphRasterizer>,
        client: Arc<dyn ScoringClient>,
        initial: ContainerMetrics,
    ) -> Result<Self> {
        config.validate().context("invalid lesson canvas configuration")?;
        let sizer = SurfaceSizer::new(config.sizing, config.stroke);
        let template = TemplateRenderer::new(config.template_spec(), rasterizer);
        let missing = template.missing_glyphs();
        if !missing.is_empty() {
            bail!(
                "template font has no glyph for \"{}\"; set template.font_path to a font covering the lesson text",
                missing.iter().collect::<String>()
            );
        }
        let submission = SubmissionController::new(config.lesson_id.clone(), client);

        let mut canvas = Self {
            surface: Surface::new(1, 1),
            sizer,
            template,
            input: InputNormalizer::new(),
            stroke: StrokeRenderer::new(),
            submission,
            viewport: None,
            config,
        };
        canvas.resize(initial);
        tracing::info!(
            "lesson canvas ready for lesson {} ({}x{})",
            canvas.config.lesson_id,
            canvas.surface.size().0,
            canvas.surface.size().1
        );
        Ok(canvas)
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn stroke(&self) -> &StrokeRenderer {
        &self.stroke
    }

    /// Resizes both layers, binds the stroke style again and redraws the template.
    pub fn resize(&mut self, metrics: ContainerMetrics) -> SurfaceSize {
        let size = self.sizer.apply(&mut self.surface, metrics);
        self.template.render(self.surface.template_mut());
        size
    }

    pub fn attach(&mut self, events: &mut ViewportEvents) {
        if let Some(previous) = self.viewport.take() {
            events.unsubscribe(previous.id());
        }
        self.viewport = Some(events.subscribe());
    }

    pub fn detach(&mut self, events: &mut ViewportEvents) {
        if let Some(subscription) = self.viewport.take() {
            events.unsubscribe(subscription.id());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.viewport.is_some()
    }

    /// Applies the latest pending viewport size and settles a finished
    /// submission. Returns true when anything visible changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        if let Some(metrics) = self.viewport.as_ref().and_then(ViewportSubscription::latest) {
            self.resize(metrics);
            changed = true;
        }
        if self.submission.poll().is_some() {
            changed = true;
        }
        changed
    }

    pub fn handle_input(&mut self, input: &RawInput, rect: SurfaceRect) -> InputResult {
        let normalized = self.input.normalize(input, rect);
        let dirty = normalized
            .event
            .and_then(|event| self.stroke.handle(event, &mut self.surface));
        InputResult { normalized, dirty }
    }

    /// Erases the ink and hides feedback. The template is untouched.
    pub fn clear(&mut self) {
        self.stroke.clear(&mut self.surface);
        self.submission.reset();
        tracing::debug!("ink cleared for lesson {}", self.config.lesson_id);
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.submission.submit(self.surface.ink())
    }

    pub fn poll_submission(&mut self) -> Option<FeedbackCategory> {
        self.submission.poll()
    }

    pub fn wait_for_settlement(&mut self, timeout: Duration) -> Option<FeedbackCategory> {
        self.submission.wait(timeout)
    }

    pub fn submission_phase(&self) -> SubmissionPhase {
        self.submission.phase()
    }

    pub fn requests_issued(&self) -> u64 {
        self.submission.requests_issued()
    }

    pub fn trigger(&self) -> SubmitTrigger {
        self.submission.trigger()
    }

    pub fn feedback(&self) -> &FeedbackState {
        self.submission.feedback()
    }

    pub fn take_scroll_request(&mut self) -> bool {
        self.submission.take_scroll_request()
    }

    /// Saves the current ink as a timestamped PNG under `dir`.
    pub fn export_attempt(&self, dir: &Path) -> Result<PathBuf> {
        let path = export_png(self.surface.ink(), dir, Local::now())?;
        tracing::info!("attempt exported to {}", path.display());
        Ok(path)
    }
}
