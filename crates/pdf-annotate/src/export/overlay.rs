//! Offscreen rasterization of annotation scenes

use crate::annotation::{AnnotationKind, AnnotationObject, Color, Point, Snapshot};
use crate::raster::Raster;
use crate::types::*;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Rect, Stroke, Transform,
};
use ttf_parser::{Face, OutlineBuilder};

/// Line spacing of multi-line text, relative to the font size
const LINE_HEIGHT: f32 = 1.16;

struct PathConverter(PathBuilder);

impl OutlineBuilder for PathConverter {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

/// Renders scenes onto transparent pixmaps
pub struct OverlayRenderer<'f> {
    face: Option<Face<'f>>,
}

impl<'f> OverlayRenderer<'f> {
    /// `font` is only needed when scenes contain text
    pub fn new(font: Option<&'f [u8]>) -> Result<Self> {
        let face = font
            .map(|data| {
                Face::parse(data, 0)
                    .map_err(|e| AnnotateError::FontUnavailable(format!("Invalid font: {}", e)))
            })
            .transpose()?;
        Ok(Self { face })
    }

    /// Rasterize `snapshot` onto a `width` x `height` transparent raster.
    ///
    /// The scene is stretched from the size it was authored at. Empty scenes
    /// give `None`.
    pub fn render(&self, snapshot: &Snapshot, width: u32, height: u32) -> Result<Option<Raster>> {
        if snapshot.is_empty() {
            return Ok(None);
        }

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            AnnotateError::Config(format!("Cannot allocate {}x{} overlay", width, height))
        })?;

        let sx = stretch(width, snapshot.width);
        let sy = stretch(height, snapshot.height);
        let base = Transform::from_scale(sx, sy);

        for object in &snapshot.objects {
            let transform = base.pre_translate(object.left, object.top);
            self.draw_object(&mut pixmap, object, transform)?;
        }

        Ok(Some(demultiply(&pixmap)))
    }

    fn draw_object(
        &self,
        pixmap: &mut Pixmap,
        object: &AnnotationObject,
        transform: Transform,
    ) -> Result<()> {
        match &object.kind {
            AnnotationKind::Text {
                text,
                fill,
                font_size,
            } => {
                let path = self.text_path(text, *font_size)?;
                if let Some(path) = path {
                    pixmap.fill_path(&path, &paint(*fill), FillRule::Winding, transform, None);
                }
            }
            AnnotationKind::Rectangle {
                width,
                height,
                stroke,
                stroke_width,
                fill,
            } => {
                if let Some(rect) = Rect::from_xywh(0.0, 0.0, *width, *height) {
                    let path = PathBuilder::from_rect(rect);
                    fill_and_stroke(pixmap, &path, *fill, *stroke, *stroke_width, transform);
                }
            }
            AnnotationKind::Ellipse {
                radius_x,
                radius_y,
                stroke,
                stroke_width,
                fill,
            } => {
                let path = Rect::from_xywh(0.0, 0.0, radius_x * 2.0, radius_y * 2.0)
                    .and_then(PathBuilder::from_oval);
                if let Some(path) = path {
                    fill_and_stroke(pixmap, &path, *fill, *stroke, *stroke_width, transform);
                }
            }
            AnnotationKind::Highlight {
                width,
                height,
                fill,
                opacity,
            } => {
                if let Some(rect) = Rect::from_xywh(0.0, 0.0, *width, *height) {
                    pixmap.fill_rect(rect, &paint(fill.with_opacity(*opacity)), transform, None);
                }
            }
            AnnotationKind::Eraser { width, height } => {
                if let Some(rect) = Rect::from_xywh(0.0, 0.0, *width, *height) {
                    pixmap.fill_rect(rect, &paint(Color::WHITE), transform, None);
                }
            }
            AnnotationKind::Arrow {
                tip,
                stroke,
                stroke_width,
                head_size,
            } => draw_arrow(pixmap, *tip, *stroke, *stroke_width, *head_size, transform),
            AnnotationKind::Freehand {
                points,
                stroke,
                stroke_width,
            } => draw_polyline(pixmap, points, *stroke, *stroke_width, transform),
            AnnotationKind::Image { width, height, png } => {
                let image = decode_pixmap(png)?;
                let scale = Transform::from_scale(
                    width / image.width() as f32,
                    height / image.height() as f32,
                );
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                pixmap.draw_pixmap(
                    0,
                    0,
                    image.as_ref(),
                    &paint,
                    transform.pre_concat(scale),
                    None,
                );
            }
        }
        Ok(())
    }

    /// Glyph outlines of `text`, top-left at the origin
    fn text_path(&self, text: &str, font_size: f32) -> Result<Option<Path>> {
        let face = self.face.as_ref().ok_or_else(|| {
            AnnotateError::FontUnavailable("no font loaded for text annotations".to_string())
        })?;

        let scale = font_size / face.units_per_em() as f32;
        let ascent = face.ascender() as f32 * scale;
        let mut builder = PathBuilder::new();

        for (line_index, line) in text.lines().enumerate() {
            let baseline = ascent + line_index as f32 * font_size * LINE_HEIGHT;
            let mut pen_x = 0.0;

            for ch in line.chars() {
                let Some(glyph) = face.glyph_index(ch) else {
                    continue;
                };
                let mut converter = PathConverter(PathBuilder::new());
                face.outline_glyph(glyph, &mut converter);

                let placement = Transform::from_scale(scale, -scale).post_translate(pen_x, baseline);
                if let Some(path) = converter.0.finish().and_then(|p| p.transform(placement)) {
                    builder.push_path(&path);
                }
                pen_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
            }
        }

        Ok(builder.finish())
    }
}

fn stretch(pixels: u32, authored: f32) -> f32 {
    if authored > 0.0 {
        pixels as f32 / authored
    } else {
        1.0
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn outline(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

fn fill_and_stroke(
    pixmap: &mut Pixmap,
    path: &Path,
    fill: Option<Color>,
    stroke: Color,
    stroke_width: f32,
    transform: Transform,
) {
    if let Some(fill) = fill.filter(|c| !c.is_transparent()) {
        pixmap.fill_path(path, &paint(fill), FillRule::Winding, transform, None);
    }
    if stroke_width > 0.0 && !stroke.is_transparent() {
        pixmap.stroke_path(path, &paint(stroke), &outline(stroke_width), transform, None);
    }
}

fn draw_arrow(
    pixmap: &mut Pixmap,
    tip: Point,
    color: Color,
    stroke_width: f32,
    head_size: f32,
    transform: Transform,
) {
    let length = (tip.x * tip.x + tip.y * tip.y).sqrt();
    if length <= f32::EPSILON {
        return;
    }
    let (ux, uy) = (tip.x / length, tip.y / length);

    let mut shaft = PathBuilder::new();
    shaft.move_to(0.0, 0.0);
    shaft.line_to(tip.x - ux * head_size, tip.y - uy * head_size);
    if let Some(path) = shaft.finish() {
        pixmap.stroke_path(&path, &paint(color), &outline(stroke_width), transform, None);
    }

    let base_x = tip.x - ux * head_size;
    let base_y = tip.y - uy * head_size;
    let half = head_size / 2.0;
    let mut head = PathBuilder::new();
    head.move_to(tip.x, tip.y);
    head.line_to(base_x - uy * half, base_y + ux * half);
    head.line_to(base_x + uy * half, base_y - ux * half);
    head.close();
    if let Some(path) = head.finish() {
        pixmap.fill_path(&path, &paint(color), FillRule::Winding, transform, None);
    }
}

fn draw_polyline(
    pixmap: &mut Pixmap,
    points: &[Point],
    color: Color,
    stroke_width: f32,
    transform: Transform,
) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };

    // A click without movement still leaves a dot
    if rest.is_empty() {
        if let Some(dot) = PathBuilder::from_circle(first.x, first.y, stroke_width / 2.0) {
            pixmap.fill_path(&dot, &paint(color), FillRule::Winding, transform, None);
        }
        return;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(first.x, first.y);
    for point in rest {
        builder.line_to(point.x, point.y);
    }
    if let Some(path) = builder.finish() {
        pixmap.stroke_path(&path, &paint(color), &outline(stroke_width), transform, None);
    }
}

/// Decode stored image bytes into a premultiplied pixmap
fn decode_pixmap(bytes: &[u8]) -> Result<Pixmap> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    let mut data = image.into_raw();
    for px in data.chunks_exact_mut(4) {
        let alpha = px[3] as u16;
        for channel in &mut px[..3] {
            *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
        }
    }

    IntSize::from_wh(width, height)
        .and_then(|size| Pixmap::from_vec(data, size))
        .ok_or_else(|| AnnotateError::Config(format!("Invalid image size {}x{}", width, height)))
}

fn demultiply(pixmap: &Pixmap) -> Raster {
    let mut rgba_data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let color = px.demultiply();
        rgba_data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Raster {
        width: pixmap.width(),
        height: pixmap.height(),
        rgba_data,
    }
}
