use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::canvas::layer::Surface;
use crate::canvas::model::{PaintState, StrokeStyle};

pub const DEFAULT_MAX_HEIGHT: f32 = 300.0;
pub const DEFAULT_ASPECT_RATIO: f32 = 0.5;

/// Layout measurements the host reports for the surface's container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    pub content_width: f32,
    pub viewport_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

/// How the surface height follows its container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// `height = min(max_height, width * aspect_ratio)`
    Aspect { max_height: f32, aspect_ratio: f32 },
    /// `height = min(max_height, viewport_height * fraction)`
    Viewport { fraction: f32, max_height: f32 },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::Aspect {
            max_height: DEFAULT_MAX_HEIGHT,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
        }
    }
}

impl SizingPolicy {
    pub fn compute(&self, metrics: ContainerMetrics) -> SurfaceSize {
        let width = to_pixels(metrics.content_width);
        let height = match *self {
            Self::Aspect {
                max_height,
                aspect_ratio,
            } => max_height.min(width as f32 * aspect_ratio),
            Self::Viewport {
                fraction,
                max_height,
            } => max_height.min(metrics.viewport_height * fraction),
        };
        SurfaceSize {
            width,
            height: to_pixels(height),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (max_height, factor, name) = match *self {
            Self::Aspect {
                max_height,
                aspect_ratio,
            } => (max_height, aspect_ratio, "aspect_ratio"),
            Self::Viewport {
                fraction,
                max_height,
            } => (max_height, fraction, "fraction"),
        };
        if !(max_height.is_finite() && max_height >= 1.0) {
            bail!("sizing max_height must be at least 1px (got {max_height})");
        }
        if !(factor.is_finite() && factor > 0.0) {
            bail!("sizing {name} must be positive (got {factor})");
        }
        Ok(())
    }
}

fn to_pixels(value: f32) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value.floor() as u32
    } else {
        1
    }
}

/// Sizes both layers of a [`Surface`] from container metrics.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSizer {
    policy: SizingPolicy,
    stroke: StrokeStyle,
}

impl SurfaceSizer {
    pub fn new(policy: SizingPolicy, stroke: StrokeStyle) -> Self {
        Self { policy, stroke }
    }

    pub fn policy(&self) -> SizingPolicy {
        self.policy
    }

    /// Resizes both layers and binds the configured stroke style again.
    ///
    /// The resize leaves both layers empty. The caller owns redrawing the
    /// template layer afterwards.
    pub fn apply(&self, surface: &mut Surface, metrics: ContainerMetrics) -> SurfaceSize {
        let size = self.policy.compute(metrics);
        surface.resize(size.width, size.height);
        surface.set_paint(PaintState::from_style(self.stroke));
        tracing::debug!(
            "surface sized to {}x{} (container width {:.1}, viewport height {:.1})",
            size.width,
            size.height,
            metrics.content_width,
            metrics.viewport_height
        );
        size
    }
}
