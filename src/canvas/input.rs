use crate::canvas::model::Point;

/// Bounding box of the surface in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn to_local(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub client: Point,
}

/// Pointer input as delivered by the host, in client coordinates.
///
/// Touch events carry the touches still active after the event, so
/// `TouchEnd` lists what remains on the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    MouseDown { button: MouseButton, client: Point },
    MouseMove { client: Point },
    MouseUp { button: MouseButton },
    MouseLeave,
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd { touches: Vec<TouchPoint> },
    TouchCancel { touches: Vec<TouchPoint> },
}

/// Source-independent gesture vocabulary, in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    Begin(Point),
    Move(Point),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub event: Option<CanvasEvent>,
    /// The host must suppress its default scroll/zoom handling for this event.
    pub suppress_default: bool,
}

impl Normalized {
    fn mouse(event: Option<CanvasEvent>) -> Self {
        Self {
            event,
            suppress_default: false,
        }
    }

    fn touch(event: Option<CanvasEvent>) -> Self {
        Self {
            event,
            suppress_default: true,
        }
    }
}

/// Maps mouse and single-touch input onto [`CanvasEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct InputNormalizer {
    mouse_pressed: bool,
    tracked_touch: Option<u64>,
}

impl InputNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.mouse_pressed || self.tracked_touch.is_some()
    }

    pub fn normalize(&mut self, input: &RawInput, rect: SurfaceRect) -> Normalized {
        match input {
            RawInput::MouseDown {
                button: MouseButton::Primary,
                client,
            } => {
                self.mouse_pressed = true;
                Normalized::mouse(Some(CanvasEvent::Begin(rect.to_local(*client))))
            }
            RawInput::MouseDown { .. } => Normalized::mouse(None),
            RawInput::MouseMove { client } => {
                if !self.mouse_pressed {
                    return Normalized::mouse(None);
                }
                Normalized::mouse(Some(CanvasEvent::Move(rect.to_local(*client))))
            }
            RawInput::MouseUp {
                button: MouseButton::Primary,
            }
            | RawInput::MouseLeave => {
                if !std::mem::take(&mut self.mouse_pressed) {
                    return Normalized::mouse(None);
                }
                Normalized::mouse(Some(CanvasEvent::End))
            }
            RawInput::MouseUp { .. } => Normalized::mouse(None),
            RawInput::TouchStart { touches } => {
                if self.tracked_touch.is_some() {
                    return Normalized::touch(None);
                }
                let Some(first) = touches.first() else {
                    return Normalized::touch(None);
                };
                self.tracked_touch = Some(first.id);
                Normalized::touch(Some(CanvasEvent::Begin(rect.to_local(first.client))))
            }
            RawInput::TouchMove { touches } => {
                let tracked = self
                    .tracked_touch
                    .and_then(|id| touches.iter().find(|touch| touch.id == id));
                match tracked {
                    Some(touch) => {
                        Normalized::touch(Some(CanvasEvent::Move(rect.to_local(touch.client))))
                    }
                    None => Normalized::touch(None),
                }
            }
            RawInput::TouchEnd { touches } | RawInput::TouchCancel { touches } => {
                let Some(id) = self.tracked_touch else {
                    return Normalized::touch(None);
                };
                if touches.iter().any(|touch| touch.id == id) {
                    return Normalized::touch(None);
                }
                self.tracked_touch = None;
                Normalized::touch(Some(CanvasEvent::End))
            }
        }
    }
}
