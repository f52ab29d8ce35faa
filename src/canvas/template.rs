use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, FontRef, FontVec, GlyphId, ScaleFont};
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::canvas::layer::RgbaLayer;
use crate::canvas::model::Color;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateStyle {
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_color")]
    pub color: Color,
    /// Font pixel size as a fraction of the surface height.
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
    /// Font used for the reference glyph. egui's bundled font is used when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for TemplateStyle {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
            color: default_color(),
            font_scale: default_font_scale(),
            font_path: None,
        }
    }
}

fn default_opacity() -> f32 {
    0.2
}

fn default_color() -> Color {
    Color::rgb(0x6c, 0x75, 0x7d)
}

fn default_font_scale() -> f32 {
    0.7
}

/// Reference text shown underneath the ink and how to draw it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateSpec {
    pub text: Option<String>,
    pub style: TemplateStyle,
}

impl TemplateSpec {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

/// Coverage mask of one line of text.
///
/// `width` is the advance width of the run and `height` the line box
/// (ascent to descent), so centering the mask centers the text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<f32>,
}

impl TextMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.width + x) as usize]
    }
}

pub trait GlyphRasterizer: Send {
    fn rasterize(&self, text: &str, px_size: f32) -> TextMask;

    /// Characters of `text` the font has no glyph for. They would render as
    /// the placeholder box.
    fn missing_glyphs(&self, _text: &str) -> Vec<char> {
        Vec::new()
    }
}

pub struct AbGlyphRasterizer {
    font: FontArc,
}

impl AbGlyphRasterizer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read template font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("invalid font file {}", path.display()))?;
        Ok(Self::new(FontArc::from(font)))
    }

    /// egui's default proportional font.
    pub fn bundled() -> Result<Self> {
        let definitions = egui::FontDefinitions::default();
        let name = definitions
            .families
            .get(&egui::FontFamily::Proportional)
            .and_then(|family| family.first())
            .ok_or_else(|| anyhow!("egui has no proportional font"))?;
        let data = definitions
            .font_data
            .get(name)
            .ok_or_else(|| anyhow!("egui font data missing for {name}"))?;
        let font = match data.font.clone() {
            Cow::Borrowed(bytes) => {
                FontRef::try_from_slice_and_index(bytes, data.index).map(FontArc::from)
            }
            Cow::Owned(bytes) => {
                FontVec::try_from_vec_and_index(bytes, data.index).map(FontArc::from)
            }
        }
        .map_err(|_| anyhow!("egui font {name} could not be parsed"))?;
        Ok(Self::new(font))
    }

    pub fn from_style(style: &TemplateStyle) -> Result<Self> {
        match &style.font_path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }
}

impl GlyphRasterizer for AbGlyphRasterizer {
    fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing = Vec::new();
        for ch in text.chars() {
            if ch.is_whitespace() || ch.is_control() || missing.contains(&ch) {
                continue;
            }
            if self.font.glyph_id(ch) == GlyphId(0) {
                missing.push(ch);
            }
        }
        missing
    }

    fn rasterize(&self, text: &str, px_size: f32) -> TextMask {
        let scaled = self.font.as_scaled(px_size);
        let ascent = scaled.ascent();
        let height = (ascent - scaled.descent()).ceil().max(1.0) as u32;

        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::new();
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(px_size, point(caret, ascent)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let width = caret.ceil().max(1.0) as u32;
        let mut mask = TextMask::empty(width, height);
        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                let px = x as i32 + bounds.min.x as i32;
                let py = y as i32 + bounds.min.y as i32;
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    let idx = (py as u32 * width + px as u32) as usize;
                    mask.coverage[idx] = (mask.coverage[idx] + coverage).min(1.0);
                }
            });
        }
        mask
    }
}

/// Draws the template glyph onto the background layer.
pub struct TemplateRenderer {
    spec: TemplateSpec,
    rasterizer: Box<dyn GlyphRasterizer>,
}

impl TemplateRenderer {
    pub fn new(spec: TemplateSpec, rasterizer: Box<dyn GlyphRasterizer>) -> Self {
        Self { spec, rasterizer }
    }

    pub fn spec(&self) -> &TemplateSpec {
        &self.spec
    }

    /// Template characters the configured font cannot draw.
    pub fn missing_glyphs(&self) -> Vec<char> {
        self.spec
            .text()
            .map(|text| self.rasterizer.missing_glyphs(text))
            .unwrap_or_default()
    }

    /// Clears `layer` and draws the template centered on it. A missing
    /// template leaves the layer untouched.
    ///
    /// Opacity and fill only live for the duration of this call; nothing is
    /// bound to the layer afterwards.
    pub fn render(&self, layer: &mut RgbaLayer) {
        let Some(text) = self.spec.text() else {
            return;
        };
        layer.clear();

        let px_size = (layer.height() as f32 * self.spec.style.font_scale).floor();
        if px_size < 1.0 {
            return;
        }
        let mask = self.rasterizer.rasterize(text, px_size);
        let fill = self.spec.style.color.with_opacity(self.spec.style.opacity);
        let origin_x = (layer.width() as i32 - mask.width as i32) / 2;
        let origin_y = (layer.height() as i32 - mask.height as i32) / 2;

        for y in 0..mask.height {
            for x in 0..mask.width {
                let coverage = mask.at(x, y);
                if coverage <= 0.0 {
                    continue;
                }
                layer.blend_pixel(
                    origin_x + x as i32,
                    origin_y + y as i32,
                    fill.with_opacity(coverage),
                );
            }
        }
        tracing::debug!(
            "template rendered at {}px on {}x{}",
            px_size,
            layer.width(),
            layer.height()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fills a `0.5em x 1em` block per character.
    struct BlockRasterizer;

    impl GlyphRasterizer for BlockRasterizer {
        fn rasterize(&self, text: &str, px_size: f32) -> TextMask {
            let per_char = (px_size * 0.5).max(1.0) as u32;
            let width = per_char * text.chars().count() as u32;
            let height = px_size as u32;
            TextMask {
                width,
                height,
                coverage: vec![1.0; (width * height) as usize],
            }
        }
    }

    fn renderer(text: Option<&str>) -> TemplateRenderer {
        TemplateRenderer::new(
            TemplateSpec {
                text: text.map(str::to_owned),
                style: TemplateStyle::default(),
            },
            Box::new(BlockRasterizer),
        )
    }

    #[test]
    fn missing_template_is_a_no_op() {
        let mut layer = RgbaLayer::new(20, 10);
        layer.set_pixel(0, 0, Color::BLACK);
        renderer(None).render(&mut layer);
        assert_eq!(layer.pixel(0, 0), Color::BLACK);

        renderer(Some("")).render(&mut layer);
        assert_eq!(layer.pixel(0, 0), Color::BLACK);
    }

    #[test]
    fn template_is_centered_and_low_opacity() {
        let mut layer = RgbaLayer::new(100, 50);
        renderer(Some("a")).render(&mut layer);

        // 35px glyph, 17px wide: covers x 41..58, y 7..42
        let center = layer.pixel(50, 25);
        assert_eq!((center.r, center.g, center.b), (0x6c, 0x75, 0x7d));
        assert_eq!(center.a, 51);
        assert_eq!(layer.pixel(5, 25).a, 0);
        assert_eq!(layer.pixel(50, 2).a, 0);
        assert_eq!(layer.pixel(41, 7).a, 51);
        assert_eq!(layer.pixel(40, 7).a, 0);
    }

    #[test]
    fn rendering_twice_is_pixel_identical() {
        let template = renderer(Some("ab"));
        let mut first = RgbaLayer::new(120, 60);
        template.render(&mut first);
        let mut second = first.clone();
        template.render(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn render_clears_previous_content() {
        let mut layer = RgbaLayer::new(100, 50);
        layer.set_pixel(0, 0, Color::BLACK);
        renderer(Some("a")).render(&mut layer);
        assert_eq!(layer.pixel(0, 0).a, 0);
    }

    #[test]
    fn bundled_font_reports_tamil_as_missing() {
        let rasterizer = AbGlyphRasterizer::bundled().expect("bundled font");
        assert_eq!(rasterizer.missing_glyphs("அ a அ"), vec!['அ']);
        assert!(rasterizer.missing_glyphs("abc").is_empty());
    }

    #[test]
    fn renderer_without_text_reports_nothing_missing() {
        let template = TemplateRenderer::new(
            TemplateSpec::default(),
            Box::new(AbGlyphRasterizer::bundled().expect("bundled font")),
        );
        assert!(template.missing_glyphs().is_empty());
    }
}
