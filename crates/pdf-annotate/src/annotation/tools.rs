//! Annotation tools: build new objects from the current style

use super::color::Color;
use super::kinds::{AnnotationKind, Point};
use super::style::StyleState;
use crate::constants::*;
use crate::types::*;
use image::{GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Shape tools that drop a default-sized object onto the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Text,
    Highlight,
    Arrow,
    Rectangle,
    Circle,
    Eraser,
}

/// An object ready to be added to a surface
#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    pub left: f32,
    pub top: f32,
    pub kind: AnnotationKind,
    /// Select the object once it is on the surface
    pub select: bool,
}

impl Tool {
    pub fn build(self, style: &StyleState) -> NewObject {
        let (left, top) = match self {
            Tool::Text => TEXT_ORIGIN,
            _ => SHAPE_ORIGIN,
        };

        let kind = match self {
            Tool::Text => AnnotationKind::Text {
                text: TEXT_PLACEHOLDER.to_string(),
                fill: style.color,
                font_size: style.font_size,
            },
            Tool::Highlight => AnnotationKind::Highlight {
                width: HIGHLIGHT_SIZE.0,
                height: HIGHLIGHT_SIZE.1,
                fill: Color::from_hex(HIGHLIGHT_COLOR).unwrap_or(Color::BLACK),
                opacity: HIGHLIGHT_OPACITY,
            },
            Tool::Arrow => AnnotationKind::Arrow {
                tip: Point::new(ARROW_SHAFT.2 - ARROW_SHAFT.0, ARROW_SHAFT.3 - ARROW_SHAFT.1),
                stroke: style.color,
                stroke_width: style.stroke_width,
                head_size: ARROW_HEAD_SIZE,
            },
            Tool::Rectangle => AnnotationKind::Rectangle {
                width: RECT_SIZE.0,
                height: RECT_SIZE.1,
                stroke: style.color,
                stroke_width: style.stroke_width,
                fill: None,
            },
            Tool::Circle => AnnotationKind::Ellipse {
                radius_x: CIRCLE_RADIUS,
                radius_y: CIRCLE_RADIUS,
                stroke: style.color,
                stroke_width: style.stroke_width,
                fill: None,
            },
            Tool::Eraser => AnnotationKind::Eraser {
                width: ERASER_SIZE.0,
                height: ERASER_SIZE.1,
            },
        };

        NewObject {
            left,
            top,
            kind,
            select: matches!(self, Tool::Text | Tool::Eraser),
        }
    }
}

/// A completed freehand stroke. Points are absolute surface coordinates.
pub fn freehand_stroke(points: &[Point], style: &StyleState) -> Option<NewObject> {
    let first = points.first()?;
    let relative = points
        .iter()
        .map(|p| Point::new(p.x - first.x, p.y - first.y))
        .collect();

    Some(NewObject {
        left: first.x,
        top: first.y,
        kind: AnnotationKind::Freehand {
            points: relative,
            stroke: style.color,
            stroke_width: style.stroke_width,
        },
        select: false,
    })
}

/// Decode an image file, cap its resolution and store it as PNG.
///
/// Images whose longest side exceeds `max_dimension` are down-sampled before
/// they enter the scene, so snapshot and export size stay bounded.
pub fn image_object(bytes: &[u8], max_dimension: u32) -> Result<NewObject> {
    let mut image = image::load_from_memory(bytes)?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AnnotateError::Config("Image has no pixels".to_string()));
    }

    if width.max(height) > max_dimension {
        log::debug!(
            "Down-sampling {}x{} image to fit {}px",
            width,
            height,
            max_dimension
        );
        image = image.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
    }

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    let display_height = IMAGE_TARGET_WIDTH * height as f32 / width as f32;
    Ok(NewObject {
        left: SHAPE_ORIGIN.0,
        top: SHAPE_ORIGIN.1,
        kind: AnnotationKind::Image {
            width: IMAGE_TARGET_WIDTH,
            height: display_height,
            png,
        },
        select: false,
    })
}
