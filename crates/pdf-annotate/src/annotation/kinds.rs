//! Annotation object kinds and the style attributes each one accepts

use super::color::Color;
use serde::{Deserialize, Serialize};

/// A point in surface pixels, relative to the owning object's origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Drawable annotation geometry and paint.
///
/// Positions are measured from the object's `left`/`top` origin in surface
/// pixels, y growing downwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationKind {
    Text {
        text: String,
        fill: Color,
        font_size: f32,
    },
    Rectangle {
        width: f32,
        height: f32,
        stroke: Color,
        stroke_width: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<Color>,
    },
    Ellipse {
        radius_x: f32,
        radius_y: f32,
        stroke: Color,
        stroke_width: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<Color>,
    },
    /// Translucent marker over existing content
    Highlight {
        width: f32,
        height: f32,
        fill: Color,
        opacity: f32,
    },
    /// Opaque white cover that hides page content underneath
    Eraser { width: f32, height: f32 },
    /// Straight shaft from the origin to `tip` with a filled head at the tip
    Arrow {
        tip: Point,
        stroke: Color,
        stroke_width: f32,
        head_size: f32,
    },
    Freehand {
        points: Vec<Point>,
        stroke: Color,
        stroke_width: f32,
    },
    /// Raster image stored as PNG bytes
    Image {
        width: f32,
        height: f32,
        #[serde(with = "base64_bytes")]
        png: Vec<u8>,
    },
}

/// Which paint a color change targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    None,
    Fill,
    Stroke,
}

/// Style attributes a kind accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleCapabilities {
    pub color: ColorTarget,
    pub stroke_width: bool,
    pub font_size: bool,
}

impl StyleCapabilities {
    const NONE: StyleCapabilities = StyleCapabilities {
        color: ColorTarget::None,
        stroke_width: false,
        font_size: false,
    };
    const TEXT: StyleCapabilities = StyleCapabilities {
        color: ColorTarget::Fill,
        stroke_width: false,
        font_size: true,
    };
    const STROKED: StyleCapabilities = StyleCapabilities {
        color: ColorTarget::Stroke,
        stroke_width: true,
        font_size: false,
    };
    const FILLED: StyleCapabilities = StyleCapabilities {
        color: ColorTarget::Fill,
        stroke_width: false,
        font_size: false,
    };
}

/// One style attribute change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "attribute", content = "value", rename_all = "snake_case")]
pub enum StyleChange {
    Color(Color),
    StrokeWidth(f32),
    FontSize(f32),
}

impl AnnotationKind {
    pub fn capabilities(&self) -> StyleCapabilities {
        match self {
            AnnotationKind::Text { .. } => StyleCapabilities::TEXT,
            AnnotationKind::Rectangle { .. }
            | AnnotationKind::Ellipse { .. }
            | AnnotationKind::Arrow { .. }
            | AnnotationKind::Freehand { .. } => StyleCapabilities::STROKED,
            AnnotationKind::Highlight { .. } => StyleCapabilities::FILLED,
            AnnotationKind::Eraser { .. } | AnnotationKind::Image { .. } => {
                StyleCapabilities::NONE
            }
        }
    }

    /// Apply a style change if this kind accepts it. Returns whether anything changed.
    pub fn apply_style(&mut self, change: StyleChange) -> bool {
        let caps = self.capabilities();
        match change {
            StyleChange::Color(color) => match caps.color {
                ColorTarget::None => false,
                ColorTarget::Fill => self.fill_mut().map(|f| *f = color).is_some(),
                ColorTarget::Stroke => self.stroke_mut().map(|s| *s = color).is_some(),
            },
            StyleChange::StrokeWidth(width) if caps.stroke_width => {
                self.stroke_width_mut().map(|w| *w = width).is_some()
            }
            StyleChange::FontSize(size) if caps.font_size => match self {
                AnnotationKind::Text { font_size, .. } => {
                    *font_size = size;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn fill_mut(&mut self) -> Option<&mut Color> {
        match self {
            AnnotationKind::Text { fill, .. } | AnnotationKind::Highlight { fill, .. } => {
                Some(fill)
            }
            _ => None,
        }
    }

    fn stroke_mut(&mut self) -> Option<&mut Color> {
        match self {
            AnnotationKind::Rectangle { stroke, .. }
            | AnnotationKind::Ellipse { stroke, .. }
            | AnnotationKind::Arrow { stroke, .. }
            | AnnotationKind::Freehand { stroke, .. } => Some(stroke),
            _ => None,
        }
    }

    fn stroke_width_mut(&mut self) -> Option<&mut f32> {
        match self {
            AnnotationKind::Rectangle { stroke_width, .. }
            | AnnotationKind::Ellipse { stroke_width, .. }
            | AnnotationKind::Arrow { stroke_width, .. }
            | AnnotationKind::Freehand { stroke_width, .. } => Some(stroke_width),
            _ => None,
        }
    }

    /// Every number that describes geometry or paint, for validation
    pub(crate) fn metrics(&self) -> Vec<f32> {
        match self {
            AnnotationKind::Text { font_size, .. } => vec![*font_size],
            AnnotationKind::Rectangle {
                width,
                height,
                stroke_width,
                ..
            } => vec![*width, *height, *stroke_width],
            AnnotationKind::Ellipse {
                radius_x,
                radius_y,
                stroke_width,
                ..
            } => vec![*radius_x, *radius_y, *stroke_width],
            AnnotationKind::Highlight {
                width,
                height,
                opacity,
                ..
            } => vec![*width, *height, *opacity],
            AnnotationKind::Eraser { width, height } => vec![*width, *height],
            AnnotationKind::Image { width, height, .. } => vec![*width, *height],
            AnnotationKind::Arrow {
                stroke_width,
                head_size,
                ..
            } => vec![*stroke_width, *head_size],
            AnnotationKind::Freehand { stroke_width, .. } => vec![*stroke_width],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Text { .. } => "text",
            AnnotationKind::Rectangle { .. } => "rectangle",
            AnnotationKind::Ellipse { .. } => "ellipse",
            AnnotationKind::Highlight { .. } => "highlight",
            AnnotationKind::Eraser { .. } => "eraser",
            AnnotationKind::Arrow { .. } => "arrow",
            AnnotationKind::Freehand { .. } => "freehand",
            AnnotationKind::Image { .. } => "image",
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> AnnotationKind {
        AnnotationKind::Rectangle {
            width: 10.0,
            height: 10.0,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            fill: None,
        }
    }

    #[test]
    fn text_takes_color_as_fill_and_ignores_width() {
        let mut text = AnnotationKind::Text {
            text: "a".into(),
            fill: Color::BLACK,
            font_size: 12.0,
        };
        assert!(text.apply_style(StyleChange::Color(Color::WHITE)));
        assert!(!text.apply_style(StyleChange::StrokeWidth(9.0)));
        assert!(matches!(text, AnnotationKind::Text { fill, .. } if fill == Color::WHITE));
    }

    #[test]
    fn shapes_take_color_as_stroke_and_ignore_font_size() {
        let mut shape = rect();
        assert!(shape.apply_style(StyleChange::Color(Color::WHITE)));
        assert!(!shape.apply_style(StyleChange::FontSize(30.0)));
        assert!(matches!(
            shape,
            AnnotationKind::Rectangle { stroke, fill: None, .. } if stroke == Color::WHITE
        ));
    }

    #[test]
    fn eraser_accepts_nothing() {
        let mut eraser = AnnotationKind::Eraser {
            width: 1.0,
            height: 1.0,
        };
        assert_eq!(eraser.capabilities().color, ColorTarget::None);
        assert!(!eraser.apply_style(StyleChange::Color(Color::BLACK)));
    }
}
