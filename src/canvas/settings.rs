use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::canvas::client::EndpointConfig;
use crate::canvas::model::StrokeStyle;
use crate::canvas::sizer::SizingPolicy;
use crate::canvas::template::{TemplateSpec, TemplateStyle};

pub const DEFAULT_CONFIG_PATH: &str = "lesson_canvas.json";

/// Everything a lesson surface is constructed from. Immutable once the
/// surface exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasConfig {
    #[serde(default = "default_lesson_id")]
    pub lesson_id: String,
    #[serde(default)]
    pub template_text: Option<String>,
    #[serde(default)]
    pub sizing: SizingPolicy,
    #[serde(default)]
    pub stroke: StrokeStyle,
    #[serde(default)]
    pub template: TemplateStyle,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            lesson_id: default_lesson_id(),
            template_text: None,
            sizing: SizingPolicy::default(),
            stroke: StrokeStyle::default(),
            template: TemplateStyle::default(),
            endpoint: EndpointConfig::default(),
            debug_logging: false,
            log_file: None,
        }
    }
}

fn default_lesson_id() -> String {
    "1".into()
}

impl CanvasConfig {
    /// Loads the config at `path`. A missing or empty file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).with_context(|| format!("parse {path}"))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("write {path}"))?;
        Ok(())
    }

    pub fn template_spec(&self) -> TemplateSpec {
        TemplateSpec {
            text: self.template_text.clone(),
            style: self.template.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lesson_id.trim().is_empty() {
            bail!("lesson_id must not be empty");
        }
        self.sizing.validate()?;
        if !(self.stroke.width.is_finite() && self.stroke.width > 0.0) {
            bail!("stroke width must be positive (got {})", self.stroke.width);
        }
        if !(0.0..=1.0).contains(&self.template.opacity) {
            bail!(
                "template opacity must be within 0..=1 (got {})",
                self.template.opacity
            );
        }
        if !(self.template.font_scale.is_finite() && self.template.font_scale > 0.0) {
            bail!(
                "template font_scale must be positive (got {})",
                self.template.font_scale
            );
        }
        self.endpoint.validate()
    }
}
