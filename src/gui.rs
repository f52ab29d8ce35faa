use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui;

use crate::canvas::feedback::FeedbackCategory;
use crate::canvas::input::{MouseButton, RawInput, SurfaceRect, TouchPoint};
use crate::canvas::layer::RgbaLayer;
use crate::canvas::model::Point;
use crate::canvas::render::DirtyRect;
use crate::canvas::sizer::ContainerMetrics;
use crate::canvas::viewport::ViewportEvents;
use crate::canvas::{CanvasConfig, LessonCanvas};

const TEMPLATE_FONT: &str = "lesson-template";

const INITIAL_METRICS: ContainerMetrics = ContainerMetrics {
    content_width: 680.0,
    viewport_height: 560.0,
};

/// Desktop host for a single lesson surface.
pub struct LessonApp {
    canvas: LessonCanvas,
    viewport: ViewportEvents,
    last_metrics: Option<ContainerMetrics>,
    template_tex: Option<egui::TextureHandle>,
    ink_tex: Option<egui::TextureHandle>,
    uploaded_revision: Option<u64>,
    touches: BTreeMap<u64, Point>,
    suppress_scroll: bool,
    export_dir: PathBuf,
    status: Option<String>,
}

impl LessonApp {
    pub fn new(config: CanvasConfig) -> Result<Self> {
        let canvas = LessonCanvas::from_config(config, INITIAL_METRICS)?;
        Ok(Self::with_canvas(canvas))
    }

    pub fn with_canvas(mut canvas: LessonCanvas) -> Self {
        let mut viewport = ViewportEvents::new();
        canvas.attach(&mut viewport);
        Self {
            canvas,
            viewport,
            last_metrics: None,
            template_tex: None,
            ink_tex: None,
            uploaded_revision: None,
            touches: BTreeMap::new(),
            suppress_scroll: false,
            export_dir: PathBuf::from("."),
            status: None,
        }
    }

    /// Makes the template font available to egui text, so lesson text and
    /// server feedback in the lesson's script render as glyphs.
    pub fn install_fonts(&self, ctx: &egui::Context) {
        let path = self.canvas.config().template.font_path.as_deref();
        match font_definitions(path) {
            Ok(fonts) => ctx.set_fonts(fonts),
            Err(e) => tracing::warn!("template font not registered with egui: {e:#}"),
        }
    }

    fn publish_metrics(&mut self, metrics: ContainerMetrics) {
        // Every resize wipes the ink, so only real layout changes go out.
        if self.last_metrics == Some(metrics) {
            return;
        }
        self.last_metrics = Some(metrics);
        self.viewport.publish(metrics);
        self.canvas.pump();
    }

    /// Uploads layers changed since the last upload. When strokes drawn this
    /// frame (`dirty`, starting from `before`) are the only change, just that
    /// region of the ink texture is replaced.
    fn sync_textures(&mut self, ctx: &egui::Context, before: u64, dirty: Option<DirtyRect>) {
        let surface = self.canvas.surface();
        if self.uploaded_revision == Some(surface.revision()) {
            return;
        }
        if let (Some(rect), Some(tex)) = (dirty, self.ink_tex.as_mut()) {
            if self.uploaded_revision == Some(before) {
                tex.set_partial(
                    [rect.x as usize, rect.y as usize],
                    ink_patch(surface.ink(), rect),
                    egui::TextureOptions::NEAREST,
                );
                self.uploaded_revision = Some(surface.revision());
                return;
            }
        }
        upload(ctx, "lesson-template", surface.template(), &mut self.template_tex);
        upload(ctx, "lesson-ink", surface.ink(), &mut self.ink_tex);
        self.uploaded_revision = Some(surface.revision());
    }

    /// Translates this frame's egui events into surface input. egui mirrors
    /// the first touch as pointer events, so pointer events are dropped while
    /// any touch is involved.
    fn collect_input(&mut self, ctx: &egui::Context, rect: egui::Rect) -> Vec<RawInput> {
        let events = ctx.input(|i| i.events.clone());
        let touch_frame = events
            .iter()
            .any(|e| matches!(e, egui::Event::Touch { .. }));
        let mut out = Vec::new();

        for event in &events {
            match event {
                egui::Event::Touch { id, phase, pos, .. } => {
                    if let Some(raw) = self.touch_event(id.0, *phase, *pos, rect) {
                        out.push(raw);
                    }
                }
                _ if touch_frame || !self.touches.is_empty() => {}
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } => {
                    let Some(button) = map_button(*button) else {
                        continue;
                    };
                    if *pressed {
                        if rect.contains(*pos) {
                            out.push(RawInput::MouseDown {
                                button,
                                client: to_point(*pos),
                            });
                        }
                    } else {
                        out.push(RawInput::MouseUp { button });
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    if rect.contains(*pos) {
                        out.push(RawInput::MouseMove {
                            client: to_point(*pos),
                        });
                    } else {
                        out.push(RawInput::MouseLeave);
                    }
                }
                egui::Event::PointerGone => out.push(RawInput::MouseLeave),
                _ => {}
            }
        }
        out
    }

    fn touch_event(
        &mut self,
        id: u64,
        phase: egui::TouchPhase,
        pos: egui::Pos2,
        rect: egui::Rect,
    ) -> Option<RawInput> {
        match phase {
            egui::TouchPhase::Start => {
                if !rect.contains(pos) {
                    return None;
                }
                self.touches.insert(id, to_point(pos));
                Some(RawInput::TouchStart {
                    touches: self.active_touches(),
                })
            }
            egui::TouchPhase::Move => {
                let slot = self.touches.get_mut(&id)?;
                *slot = to_point(pos);
                Some(RawInput::TouchMove {
                    touches: self.active_touches(),
                })
            }
            egui::TouchPhase::End => {
                self.touches.remove(&id)?;
                Some(RawInput::TouchEnd {
                    touches: self.active_touches(),
                })
            }
            egui::TouchPhase::Cancel => {
                self.touches.remove(&id)?;
                Some(RawInput::TouchCancel {
                    touches: self.active_touches(),
                })
            }
        }
    }

    fn active_touches(&self) -> Vec<TouchPoint> {
        self.touches
            .iter()
            .map(|(id, client)| TouchPoint {
                id: *id,
                client: *client,
            })
            .collect()
    }

    fn surface_ui(&mut self, ui: &mut egui::Ui) {
        let (w, h) = self.canvas.surface().size();
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(w as f32, h as f32), egui::Sense::click_and_drag());
        let bounds = SurfaceRect {
            left: rect.min.x,
            top: rect.min.y,
            width: rect.width(),
            height: rect.height(),
        };

        let before = self.canvas.surface().revision();
        let mut suppress = false;
        let mut dirty: Option<DirtyRect> = None;
        for raw in self.collect_input(ui.ctx(), rect) {
            let result = self.canvas.handle_input(&raw, bounds);
            suppress |= result.normalized.suppress_default;
            if let Some(region) = result.dirty {
                dirty = Some(dirty.map_or(region, |acc| acc.union(region)));
            }
        }
        self.suppress_scroll = suppress || !self.touches.is_empty();

        self.sync_textures(ui.ctx(), before, dirty);
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        for tex in [&self.template_tex, &self.ink_tex].into_iter().flatten() {
            painter.image(tex.id(), rect, uv, egui::Color32::WHITE);
        }
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::GRAY));
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked() {
                self.canvas.clear();
                self.status = None;
            }
            let trigger = self.canvas.trigger();
            if ui
                .add_enabled(trigger.enabled, egui::Button::new(trigger.label))
                .clicked()
            {
                self.canvas.submit();
            }
            if ui.button("Export PNG").clicked() {
                self.status = Some(match self.canvas.export_attempt(&self.export_dir) {
                    Ok(path) => format!("Saved {}", path.display()),
                    Err(e) => {
                        tracing::error!("export failed: {e:?}");
                        format!("Export failed: {e}")
                    }
                });
            }
        });
        if let Some(status) = &self.status {
            ui.small(status.as_str());
        }
    }

    fn feedback_ui(&mut self, ui: &mut egui::Ui) {
        let scroll = self.canvas.take_scroll_request();
        let Some(view) = self.canvas.feedback().view() else {
            return;
        };
        let (fill, text) = match view.category {
            FeedbackCategory::Success => (
                egui::Color32::from_rgb(212, 237, 218),
                egui::Color32::from_rgb(21, 87, 36),
            ),
            FeedbackCategory::Failure => (
                egui::Color32::from_rgb(248, 215, 218),
                egui::Color32::from_rgb(114, 28, 36),
            ),
        };
        let response = egui::Frame::none()
            .fill(fill)
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.colored_label(text, view.message.as_str());
                if let Some(annotation) = view.accuracy_annotation() {
                    ui.colored_label(text, annotation);
                }
            })
            .response;
        if scroll {
            response.scroll_to_me(Some(egui::Align::Center));
        }
    }
}

impl Drop for LessonApp {
    fn drop(&mut self) {
        self.canvas.detach(&mut self.viewport);
    }
}

impl eframe::App for LessonApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.canvas.pump();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .drag_to_scroll(!self.suppress_scroll)
                .show(ui, |ui| {
                    ui.heading(format!("Lesson {}", self.canvas.config().lesson_id));
                    ui.add_space(4.0);
                    self.publish_metrics(ContainerMetrics {
                        content_width: ui.available_width(),
                        viewport_height: ctx.screen_rect().height(),
                    });
                    self.surface_ui(ui);
                    ui.add_space(6.0);
                    self.controls_ui(ui);
                    ui.add_space(6.0);
                    self.feedback_ui(ui);
                });
        });

        if self.canvas.trigger().enabled {
            return;
        }
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}

/// egui's default fonts with the font at `font_path` appended as a fallback
/// to every family.
pub fn font_definitions(font_path: Option<&Path>) -> Result<egui::FontDefinitions> {
    let mut fonts = egui::FontDefinitions::default();
    let Some(path) = font_path else {
        return Ok(fonts);
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("read template font {}", path.display()))?;
    fonts
        .font_data
        .insert(TEMPLATE_FONT.to_owned(), egui::FontData::from_owned(bytes));
    for family in fonts.families.values_mut() {
        family.push(TEMPLATE_FONT.to_owned());
    }
    Ok(fonts)
}

fn upload(
    ctx: &egui::Context,
    name: &str,
    layer: &RgbaLayer,
    slot: &mut Option<egui::TextureHandle>,
) {
    let size = [layer.width() as usize, layer.height() as usize];
    let image = egui::ColorImage::from_rgba_unmultiplied(size, layer.pixels());
    match slot {
        Some(tex) => tex.set(image, egui::TextureOptions::NEAREST),
        None => *slot = Some(ctx.load_texture(name, image, egui::TextureOptions::NEAREST)),
    }
}

/// Copies the `rect` region of `layer` into an image for a partial upload.
fn ink_patch(layer: &RgbaLayer, rect: DirtyRect) -> egui::ColorImage {
    let stride = layer.width() as usize * 4;
    let row_len = rect.width as usize * 4;
    let mut rgba = Vec::with_capacity(row_len * rect.height as usize);
    for y in rect.y..rect.bottom() {
        let start = y as usize * stride + rect.x as usize * 4;
        rgba.extend_from_slice(&layer.pixels()[start..start + row_len]);
    }
    egui::ColorImage::from_rgba_unmultiplied([rect.width as usize, rect.height as usize], &rgba)
}

fn map_button(button: egui::PointerButton) -> Option<MouseButton> {
    match button {
        egui::PointerButton::Primary => Some(MouseButton::Primary),
        egui::PointerButton::Secondary => Some(MouseButton::Secondary),
        egui::PointerButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(pos.x, pos.y)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::canvas::client::{ScoringClient, SubmitError};
    use crate::canvas::messages::{ScoreResponse, SubmissionRequest};
    use crate::canvas::template::{GlyphRasterizer, TextMask};

    struct NoGlyphs;

    impl GlyphRasterizer for NoGlyphs {
        fn rasterize(&self, _text: &str, _px_size: f32) -> TextMask {
            TextMask::empty(0, 0)
        }
    }

    struct Offline;

    impl ScoringClient for Offline {
        fn submit(&self, _request: &SubmissionRequest) -> Result<ScoreResponse, SubmitError> {
            Err(SubmitError::Transport("offline".into()))
        }
    }

    fn app() -> LessonApp {
        let canvas = LessonCanvas::new(
            CanvasConfig::default(),
            Box::new(NoGlyphs),
            Arc::new(Offline),
            INITIAL_METRICS,
        )
        .expect("canvas");
        LessonApp::with_canvas(canvas)
    }

    fn surface_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(10.0, 10.0), egui::vec2(200.0, 100.0))
    }

    #[test]
    fn touches_starting_off_surface_are_ignored() {
        let mut app = app();
        let rect = surface_rect();
        assert!(app
            .touch_event(1, egui::TouchPhase::Start, egui::pos2(500.0, 500.0), rect)
            .is_none());
        assert!(app
            .touch_event(1, egui::TouchPhase::Move, egui::pos2(20.0, 20.0), rect)
            .is_none());
    }

    #[test]
    fn touch_end_reports_remaining_touches() {
        let mut app = app();
        let rect = surface_rect();
        app.touch_event(1, egui::TouchPhase::Start, egui::pos2(20.0, 20.0), rect);
        app.touch_event(2, egui::TouchPhase::Start, egui::pos2(30.0, 30.0), rect);
        let end = app.touch_event(1, egui::TouchPhase::End, egui::pos2(20.0, 20.0), rect);
        assert_eq!(
            end,
            Some(RawInput::TouchEnd {
                touches: vec![TouchPoint {
                    id: 2,
                    client: Point::new(30.0, 30.0)
                }]
            })
        );
    }

    #[test]
    fn unchanged_metrics_are_not_republished() {
        let mut app = app();
        let metrics = ContainerMetrics {
            content_width: 400.0,
            viewport_height: 600.0,
        };
        app.publish_metrics(metrics);
        let revision = app.canvas.surface().revision();
        app.publish_metrics(metrics);
        assert_eq!(app.canvas.surface().revision(), revision);
        assert_eq!(app.canvas.surface().size(), (400, 200));
    }

    #[test]
    fn extra_buttons_are_not_mapped() {
        assert_eq!(
            map_button(egui::PointerButton::Primary),
            Some(MouseButton::Primary)
        );
        assert_eq!(map_button(egui::PointerButton::Extra1), None);
    }

    #[test]
    fn ink_patch_copies_only_the_dirty_region() {
        let mut layer = RgbaLayer::new(8, 6);
        layer.set_pixel(3, 2, crate::canvas::model::Color::BLACK);
        let patch = ink_patch(
            &layer,
            DirtyRect {
                x: 2,
                y: 1,
                width: 3,
                height: 2,
            },
        );
        assert_eq!(patch.size, [3, 2]);
        assert_eq!(patch.pixels[4], egui::Color32::BLACK);
        assert_eq!(patch.pixels[0], egui::Color32::TRANSPARENT);
    }

    #[test]
    fn no_font_path_keeps_egui_defaults() {
        let fonts = font_definitions(None).expect("fonts");
        assert!(!fonts.font_data.contains_key(TEMPLATE_FONT));
    }

    #[test]
    fn template_font_is_a_fallback_for_every_family() {
        let bytes = egui::FontDefinitions::default()
            .font_data
            .values()
            .next()
            .expect("bundled font")
            .font
            .to_vec();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lesson.ttf");
        std::fs::write(&path, bytes).expect("write font");

        let fonts = font_definitions(Some(&path)).expect("fonts");
        assert!(fonts.font_data.contains_key(TEMPLATE_FONT));
        for family in fonts.families.values() {
            assert_eq!(family.last().map(String::as_str), Some(TEMPLATE_FONT));
        }
        assert!(font_definitions(Some(&dir.path().join("absent.ttf"))).is_err());
    }
}
