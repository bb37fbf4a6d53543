use crate::annotation::Color;
use crate::constants::*;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    pub view: ViewOptions,
    pub style: StyleDefaults,
    pub overlay: OverlayOptions,
    pub output: OutputOptions,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            view: ViewOptions::default(),
            style: StyleDefaults::default(),
            overlay: OverlayOptions::default(),
            output: OutputOptions::default(),
        }
    }
}

/// Main view and thumbnail scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub initial_scale: f32,
    pub zoom_step: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub thumbnail_scale: f32,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            initial_scale: DEFAULT_SCALE,
            zoom_step: ZOOM_STEP,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            thumbnail_scale: THUMBNAIL_SCALE,
        }
    }
}

/// Style the editor starts with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub color: Color,
    pub stroke_width: f32,
    pub font_size: f32,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            color: Color::from_hex(DEFAULT_COLOR).unwrap_or(Color::BLACK),
            stroke_width: DEFAULT_STROKE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Overlay rasterization used by export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Overlay pixels per page point. 1.0 matches screen resolution at 100% zoom.
    pub multiplier: f32,
    /// Images inserted into a scene are down-sampled so their longest side fits
    pub max_image_dimension: u32,
    /// TrueType/OpenType font used for text annotations
    pub font_path: Option<PathBuf>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            multiplier: OVERLAY_MULTIPLIER,
            max_image_dimension: MAX_IMAGE_DIMENSION,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Product prefix of delivered files, as in `<Product>_<Operation>.<ext>`
    pub product_name: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            product_name: PRODUCT_NAME.to_string(),
        }
    }
}

impl EditorOptions {
    /// Load options from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: EditorOptions = serde_json::from_slice(&bytes)
            .map_err(|e| AnnotateError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnnotateError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let view = &self.view;
        if view.min_scale <= 0.0 || view.max_scale < view.min_scale {
            return Err(AnnotateError::Config(format!(
                "Scale range {}..{} is empty or not positive",
                view.min_scale, view.max_scale
            )));
        }
        if !(view.min_scale..=view.max_scale).contains(&view.initial_scale) {
            return Err(AnnotateError::Config(format!(
                "Initial scale {} is outside {}..{}",
                view.initial_scale, view.min_scale, view.max_scale
            )));
        }
        if view.zoom_step <= 0.0 {
            return Err(AnnotateError::Config("Zoom step must be positive".to_string()));
        }
        if view.thumbnail_scale <= 0.0 {
            return Err(AnnotateError::Config(
                "Thumbnail scale must be positive".to_string(),
            ));
        }

        if self.style.stroke_width <= 0.0 || self.style.font_size <= 0.0 {
            return Err(AnnotateError::Config(
                "Stroke width and font size must be positive".to_string(),
            ));
        }

        if self.overlay.multiplier <= 0.0 {
            return Err(AnnotateError::Config(
                "Overlay multiplier must be positive".to_string(),
            ));
        }
        if self.overlay.max_image_dimension == 0 {
            return Err(AnnotateError::Config(
                "Maximum image dimension must be at least 1 pixel".to_string(),
            ));
        }

        if self.output.product_name.trim().is_empty() {
            return Err(AnnotateError::Config("Product name is empty".to_string()));
        }

        Ok(())
    }
}
