use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn to_rgba_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_rgba_array(color: [u8; 4]) -> Self {
        Self::rgba(color[0], color[1], color[2], color[3])
    }

    /// Same color with its alpha scaled by `factor` (clamped to 0..=1).
    pub fn with_opacity(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0))
            .round()
            .clamp(0.0, 255.0) as u8;
        Self { a, ..self }
    }
}

/// A position in surface-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// Configured ink parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrokeStyle {
    #[serde(default = "default_stroke_width")]
    pub width: f32,
    #[serde(default = "default_stroke_color")]
    pub color: Color,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: default_stroke_width(),
            color: default_stroke_color(),
        }
    }
}

fn default_stroke_width() -> f32 {
    5.0
}

fn default_stroke_color() -> Color {
    Color::BLACK
}

/// Paint state currently bound to the ink layer.
///
/// Reallocating a raster layer drops whatever state was bound to it, leaving
/// [`PaintState::reset`]. Callers that resize must bind the configured style
/// again before the next stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintState {
    pub line_width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub color: Color,
}

impl PaintState {
    pub const fn reset() -> Self {
        Self {
            line_width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            color: Color::BLACK,
        }
    }

    pub fn from_style(style: StrokeStyle) -> Self {
        Self {
            line_width: style.width,
            cap: LineCap::Round,
            join: LineJoin::Round,
            color: style.color,
        }
    }
}

impl Default for PaintState {
    fn default() -> Self {
        Self::reset()
    }
}

/// State of one in-progress gesture. Dropped when the gesture ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub last_position: Point,
}
