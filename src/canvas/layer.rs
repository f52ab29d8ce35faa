use crate::canvas::model::{Color, PaintState};

/// Unpremultiplied RGBA8 raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaLayer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; pixel_len(width, height)],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), pixel_len(width, height));
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Reallocates the layer. Prior content is discarded even when the
    /// dimensions are unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; pixel_len(width, height)];
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn painted_pixel_count(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let idx = ((y * self.width + x) * 4) as usize;
        Color::from_rgba_array([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(idx) = self.index_of(x, y) else {
            return;
        };
        self.pixels[idx..idx + 4].copy_from_slice(&color.to_rgba_array());
    }

    /// Source-over composite of `color` onto the pixel at (x, y).
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(idx) = self.index_of(x, y) else {
            return;
        };
        if color.a == 0 {
            return;
        }
        let src_a = color.a as f32 / 255.0;
        let dst_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= f32::EPSILON {
            self.pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 0]);
            return;
        }
        let src = [color.r, color.g, color.b];
        for channel in 0..3 {
            let s = src[channel] as f32;
            let d = self.pixels[idx + channel] as f32;
            let blended = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
            self.pixels[idx + channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[idx + 3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(((y as u32 * self.width + x as u32) * 4) as usize)
    }
}

fn pixel_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

/// The two co-located layers of one drawing surface plus the ink paint state.
///
/// Both layers always share dimensions. `revision` increases on every
/// mutation so hosts can tell when to re-upload textures.
#[derive(Debug, Clone)]
pub struct Surface {
    template: RgbaLayer,
    ink: RgbaLayer,
    paint: PaintState,
    revision: u64,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            template: RgbaLayer::new(width, height),
            ink: RgbaLayer::new(width, height),
            paint: PaintState::reset(),
            revision: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.ink.size()
    }

    /// Resizes both layers together. Clears ink and template and drops the
    /// bound paint state back to [`PaintState::reset`].
    pub fn resize(&mut self, width: u32, height: u32) {
        self.template.resize(width, height);
        self.ink.resize(width, height);
        self.paint = PaintState::reset();
        self.touch();
    }

    pub fn template(&self) -> &RgbaLayer {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut RgbaLayer {
        self.touch();
        &mut self.template
    }

    pub fn ink(&self) -> &RgbaLayer {
        &self.ink
    }

    pub fn ink_mut(&mut self) -> &mut RgbaLayer {
        self.touch();
        &mut self.ink
    }

    pub fn paint(&self) -> PaintState {
        self.paint
    }

    pub fn set_paint(&mut self, paint: PaintState) {
        self.paint = paint;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_discards_content_even_for_same_dimensions() {
        let mut layer = RgbaLayer::new(4, 4);
        layer.set_pixel(1, 1, Color::BLACK);
        assert!(!layer.is_blank());

        layer.resize(4, 4);
        assert!(layer.is_blank());
        assert_eq!(layer.pixels().len(), 4 * 4 * 4);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut layer = RgbaLayer::new(2, 2);
        layer.set_pixel(-1, 0, Color::BLACK);
        layer.set_pixel(2, 1, Color::BLACK);
        layer.blend_pixel(0, 5, Color::BLACK);
        assert!(layer.is_blank());
    }

    #[test]
    fn blending_onto_transparent_keeps_source_color_and_alpha() {
        let mut layer = RgbaLayer::new(1, 1);
        layer.blend_pixel(0, 0, Color::rgba(108, 117, 125, 51));
        assert_eq!(layer.pixel(0, 0), Color::rgba(108, 117, 125, 51));
    }

    #[test]
    fn surface_resize_resets_paint_state_and_keeps_layers_aligned() {
        let mut surface = Surface::new(10, 5);
        surface.set_paint(PaintState {
            line_width: 5.0,
            ..PaintState::reset()
        });
        let before = surface.revision();

        surface.resize(20, 8);

        assert_eq!(surface.template().size(), (20, 8));
        assert_eq!(surface.ink().size(), (20, 8));
        assert_eq!(surface.paint(), PaintState::reset());
        assert!(surface.revision() > before);
    }
}
