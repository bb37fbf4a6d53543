//! Export engine
//!
//! Rebuilds an output document from the original bytes and the store's
//! export view. The source is parsed fresh for every export, independent of
//! whatever the display path holds.

mod assembly;
mod overlay;

pub use assembly::{OutputBuilder, copy_object_deep};
pub use overlay::OverlayRenderer;

use crate::annotation::AnnotationKind;
use crate::constants::FALLBACK_FONT_PATHS;
use crate::options::{EditorOptions, OverlayOptions};
use crate::raster::scaled_size;
use crate::source::{page_geometry, stored_rotation};
use crate::store::ExportEntry;
use crate::types::*;
use lopdf::{Document, ObjectId};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExportEngine {
    overlay: OverlayOptions,
    producer: String,
}

impl ExportEngine {
    pub fn new(options: &EditorOptions) -> Self {
        Self {
            overlay: options.overlay.clone(),
            producer: options.output.product_name.clone(),
        }
    }

    /// Assemble the output document.
    ///
    /// Entries are processed strictly in order. Any failure aborts the whole
    /// export and no bytes are returned.
    pub async fn export(&self, bytes: Arc<[u8]>, view: Vec<ExportEntry>) -> Result<Vec<u8>> {
        let font = if needs_font(&view) {
            Some(load_font(&self.overlay).await?)
        } else {
            None
        };
        let multiplier = self.overlay.multiplier;
        let producer = self.producer.clone();

        log::info!("Exporting {} pages", view.len());
        tokio::task::spawn_blocking(move || {
            assemble(&bytes, &view, font.as_deref(), multiplier, &producer)
        })
        .await?
    }
}

fn assemble(
    bytes: &[u8],
    view: &[ExportEntry],
    font: Option<&[u8]>,
    multiplier: f32,
    producer: &str,
) -> Result<Vec<u8>> {
    let source = Document::load_mem(bytes).map_err(|e| AnnotateError::Load(e.to_string()))?;
    let pages = source.get_pages();
    let renderer = OverlayRenderer::new(font)?;
    let mut output = OutputBuilder::new();

    for (position, entry) in view.iter().enumerate() {
        export_entry(&mut output, &source, &pages, entry, &renderer, multiplier).map_err(|e| {
            AnnotateError::ExportAbort {
                position,
                reason: e.to_string(),
            }
        })?;
    }

    output.finish(producer)
}

fn export_entry(
    output: &mut OutputBuilder,
    source: &Document,
    pages: &BTreeMap<u32, ObjectId>,
    entry: &ExportEntry,
    renderer: &OverlayRenderer<'_>,
    multiplier: f32,
) -> Result<()> {
    let page_id = *pages.get(&entry.original_index).ok_or_else(|| {
        AnnotateError::Load(format!("source has no page {}", entry.original_index))
    })?;

    let rotation = stored_rotation(source, page_id).compose(entry.rotation);
    let page = output.copy_page(source, page_id)?;
    output.set_rotation(page, rotation)?;

    if let Some(snapshot) = entry.snapshot.as_ref().filter(|s| !s.is_empty()) {
        // The scene was drawn on the rotated page, so rasterize in that
        // orientation and turn the result back into page space
        let geometry = page_geometry(source, page_id)?;
        let (width, height) = scaled_size(geometry.width, geometry.height, multiplier, rotation);
        if let Some(overlay) = renderer.render(snapshot, width, height)? {
            let image = output.embed_image(&overlay.unrotated(rotation))?;
            output.draw_image_full_page(page, image)?;
        }
    }

    output.add_page(page);
    Ok(())
}

fn needs_font(view: &[ExportEntry]) -> bool {
    view.iter()
        .filter_map(|entry| entry.snapshot.as_ref())
        .flat_map(|snapshot| &snapshot.objects)
        .any(|object| matches!(object.kind, AnnotationKind::Text { .. }))
}

/// Read the configured font, or the first fallback font that exists
pub async fn load_font(options: &OverlayOptions) -> Result<Vec<u8>> {
    if let Some(path) = &options.font_path {
        return tokio::fs::read(path)
            .await
            .map_err(|e| AnnotateError::FontUnavailable(format!("{}: {}", path.display(), e)));
    }

    for path in FALLBACK_FONT_PATHS {
        if let Ok(bytes) = tokio::fs::read(path).await {
            log::debug!("Using fallback font {}", path);
            return Ok(bytes);
        }
    }

    Err(AnnotateError::FontUnavailable(
        "no font configured and no fallback font found".to_string(),
    ))
}
