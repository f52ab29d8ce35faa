use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat};

use crate::canvas::layer::RgbaLayer;

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

pub fn encode_png(layer: &RgbaLayer) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            layer.pixels(),
            layer.width(),
            layer.height(),
            ColorType::Rgba8,
        )
        .context("encode ink layer as png")?;
    Ok(bytes)
}

/// The layer as a `data:image/png;base64,...` URI.
pub fn png_data_uri(layer: &RgbaLayer) -> Result<String> {
    let png = encode_png(layer)?;
    Ok(format!(
        "{PNG_DATA_URI_PREFIX}{}",
        general_purpose::STANDARD.encode(png)
    ))
}

pub fn decode_png_data_uri(uri: &str) -> Result<RgbaLayer> {
    let payload = uri
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .ok_or_else(|| anyhow!("not a png data uri"))?;
    let png = general_purpose::STANDARD
        .decode(payload)
        .context("decode base64 payload")?;
    let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .context("decode png payload")?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(RgbaLayer::from_pixels(width, height, image.into_raw()))
}

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn attempt_filename(stem: &str) -> String {
    format!("{stem}_attempt.png")
}

/// Writes `layer` as `<timestamp>_attempt.png` under `dir`, creating it if needed.
pub fn export_png(layer: &RgbaLayer, dir: &Path, now: chrono::DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create attempt export folder {}", dir.display()))?;
    let path = dir.join(attempt_filename(&timestamped_stem(now)));
    let png = encode_png(layer)?;
    fs::write(&path, png).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
