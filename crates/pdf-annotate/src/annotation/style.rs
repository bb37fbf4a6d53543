use super::color::Color;
use super::kinds::StyleChange;
use crate::options::StyleDefaults;

/// Style applied to newly created objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleState {
    pub color: Color,
    pub stroke_width: f32,
    pub font_size: f32,
}

impl StyleState {
    pub fn apply(&mut self, change: StyleChange) {
        match change {
            StyleChange::Color(color) => self.color = color,
            StyleChange::StrokeWidth(width) => self.stroke_width = width,
            StyleChange::FontSize(size) => self.font_size = size,
        }
    }
}

impl From<&StyleDefaults> for StyleState {
    fn from(defaults: &StyleDefaults) -> Self {
        Self {
            color: defaults.color,
            stroke_width: defaults.stroke_width,
            font_size: defaults.font_size,
        }
    }
}

impl Default for StyleState {
    fn default() -> Self {
        Self::from(&StyleDefaults::default())
    }
}
