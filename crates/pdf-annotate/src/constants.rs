//! Shared constants for the editor
//!
//! This module centralizes default values used by the store, the render
//! orchestrator, the annotation tools and the export engine.

// =============================================================================
// View
// =============================================================================

/// Scale the main view opens at
pub const DEFAULT_SCALE: f32 = 1.0;

/// Scale change per zoom step
pub const ZOOM_STEP: f32 = 0.25;

/// Smallest scale zoom out can reach
pub const MIN_SCALE: f32 = 0.5;

/// Largest scale zoom in can reach
pub const MAX_SCALE: f32 = 4.0;

/// Scale used for sidebar thumbnails
pub const THUMBNAIL_SCALE: f32 = 0.2;

/// Rendered pages a rasterizing source keeps
pub const MAX_CACHED_PAGES: usize = 50;

// =============================================================================
// Page Geometry
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Style Defaults
// =============================================================================

pub const DEFAULT_COLOR: &str = "#ff0000";
pub const DEFAULT_STROKE_WIDTH: f32 = 3.0;
pub const DEFAULT_FONT_SIZE: f32 = 20.0;

// =============================================================================
// Tool Defaults
// =============================================================================

pub const TEXT_PLACEHOLDER: &str = "Type Here";
pub const TEXT_ORIGIN: (f32, f32) = (50.0, 50.0);

/// Shapes are dropped at this point and then moved by the user
pub const SHAPE_ORIGIN: (f32, f32) = (100.0, 100.0);

pub const RECT_SIZE: (f32, f32) = (100.0, 100.0);
pub const CIRCLE_RADIUS: f32 = 50.0;

pub const HIGHLIGHT_SIZE: (f32, f32) = (200.0, 30.0);
pub const HIGHLIGHT_COLOR: &str = "#800080";
pub const HIGHLIGHT_OPACITY: f32 = 0.4;

pub const ERASER_SIZE: (f32, f32) = (300.0, 50.0);

/// Arrow shaft as (x1, y1, x2, y2) relative to the arrow origin
pub const ARROW_SHAFT: (f32, f32, f32, f32) = (0.0, 0.0, 150.0, 0.0);
pub const ARROW_HEAD_SIZE: f32 = 15.0;

/// Width inserted images are scaled to
pub const IMAGE_TARGET_WIDTH: f32 = 200.0;

// =============================================================================
// Export
// =============================================================================

/// Longest side, in pixels, an inserted image is stored at
pub const MAX_IMAGE_DIMENSION: u32 = 2048;

/// Overlay pixels per page point
pub const OVERLAY_MULTIPLIER: f32 = 1.0;

pub const PRODUCT_NAME: &str = "PdfAnnotate";

/// Fonts tried for text annotations when none is configured
pub const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];
