use crate::canvas::layer::RgbaLayer;
use crate::canvas::model::{LineCap, PaintState, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn from_points(a: Point, b: Point, pad: f32) -> Self {
        let min_x = (a.x.min(b.x) - pad).floor() as i32;
        let max_x = (a.x.max(b.x) + pad).ceil() as i32;
        let min_y = (a.y.min(b.y) - pad).floor() as i32;
        let max_y = (a.y.max(b.y) + pad).ceil() as i32;
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1).max(1),
            height: (max_y - min_y + 1).max(1),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Smallest rect covering both.
    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        DirtyRect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = self.right().clamp(0, max_w);
        let y1 = self.bottom().clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Strokes the straight segment `start -> end` onto `layer` with `paint`.
///
/// Pixels are covered when their center lies within `line_width / 2` of the
/// segment. Round caps extend coverage around both endpoints, so consecutive
/// segments of a polyline meet with a round join. Returns the touched region,
/// or `None` when the segment falls entirely outside the layer.
pub fn draw_segment(
    layer: &mut RgbaLayer,
    start: Point,
    end: Point,
    paint: &PaintState,
) -> Option<DirtyRect> {
    let radius = (paint.line_width * 0.5).max(0.5);
    let bounds = DirtyRect::from_points(start, end, radius + 1.0);
    let clip = bounds.clamp(layer.width(), layer.height())?;

    let radius_sq = radius * radius;
    for y in clip.y..(clip.y + clip.height) {
        for x in clip.x..(clip.x + clip.width) {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if covers(center, start, end, radius, radius_sq, paint.cap) {
                layer.set_pixel(x, y, paint.color);
            }
        }
    }
    Some(clip)
}

fn covers(point: Point, start: Point, end: Point, radius: f32, radius_sq: f32, cap: LineCap) -> bool {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let len_sq = vx * vx + vy * vy;
    let wx = point.x - start.x;
    let wy = point.y - start.y;

    if len_sq <= f32::EPSILON {
        // Zero-length segments only leave a dot with round caps.
        return match cap {
            LineCap::Round => wx * wx + wy * wy <= radius_sq,
            LineCap::Square => wx.abs() <= radius && wy.abs() <= radius,
            LineCap::Butt => false,
        };
    }

    let t = (wx * vx + wy * vy) / len_sq;
    let along_limit = match cap {
        LineCap::Butt | LineCap::Round => 0.0,
        LineCap::Square => radius / len_sq.sqrt(),
    };
    if cap != LineCap::Round && (t < -along_limit || t > 1.0 + along_limit) {
        return false;
    }

    let t = if cap == LineCap::Round {
        t.clamp(0.0, 1.0)
    } else {
        t
    };
    let dx = point.x - (start.x + vx * t);
    let dy = point.y - (start.y + vy * t);
    dx * dx + dy * dy <= radius_sq
}
