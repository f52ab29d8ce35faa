use crate::canvas::input::CanvasEvent;
use crate::canvas::layer::Surface;
use crate::canvas::model::GestureState;
use crate::canvas::render::{draw_segment, DirtyRect};

/// Paints canonical gesture events onto the ink layer as a polyline.
#[derive(Debug, Clone, Default)]
pub struct StrokeRenderer {
    gesture: Option<GestureState>,
    segments_drawn: u64,
}

impl StrokeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn gesture(&self) -> Option<GestureState> {
        self.gesture
    }

    /// Segments painted since construction.
    pub fn segments_drawn(&self) -> u64 {
        self.segments_drawn
    }

    pub fn handle(&mut self, event: CanvasEvent, surface: &mut Surface) -> Option<DirtyRect> {
        match event {
            CanvasEvent::Begin(position) => {
                self.gesture = Some(GestureState {
                    last_position: position,
                });
                None
            }
            CanvasEvent::Move(position) => {
                let gesture = self.gesture.as_mut()?;
                let from = gesture.last_position;
                gesture.last_position = position;
                self.segments_drawn += 1;
                let paint = surface.paint();
                draw_segment(surface.ink_mut(), from, position, &paint)
            }
            CanvasEvent::End => {
                self.gesture = None;
                None
            }
        }
    }

    /// Erases the ink layer. The template layer is left alone.
    pub fn clear(&self, surface: &mut Surface) {
        surface.ink_mut().clear();
    }
}
