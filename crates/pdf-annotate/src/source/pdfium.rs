use super::cache::{PageCache, RenderKey};
use super::{DocumentSource, PageGeometry, geometry_for, parse_geometry};
use crate::raster::Raster;
use crate::types::*;
use pdfium_render::prelude::*;
use std::cell::RefCell;
use std::sync::Arc;

/// Initialize Pdfium, trying the vendored library first, then falling back to system
pub fn init_pdfium() -> std::result::Result<Pdfium, PdfiumError> {
    // Vendored copy relative to the working directory
    let vendor_path = std::env::current_dir().ok().and_then(|mut p| {
        p.push("vendor/pdfium/lib");
        if p.exists() { Some(p) } else { None }
    });

    if let Some(vendor_path) = vendor_path {
        if let Ok(binding) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&vendor_path))
        {
            return Ok(Pdfium::new(binding));
        }
    }

    Pdfium::bind_to_system_library().map(Pdfium::new)
}

/// Page rasterizer backed by Pdfium.
///
/// Geometry comes from lopdf. A cache miss binds Pdfium on a blocking thread
/// and parses the shared byte buffer there; finished rasters are kept in an
/// LRU keyed by page, scale and rotation, so revisits and thumbnails of
/// already seen pages skip Pdfium entirely.
pub struct PdfiumSource {
    bytes: Arc<[u8]>,
    geometry: Vec<PageGeometry>,
    cache: RefCell<PageCache>,
}

impl DocumentSource for PdfiumSource {
    async fn open(bytes: Arc<[u8]>) -> Result<Self> {
        let geometry = parse_geometry(bytes.clone()).await?;
        Ok(Self {
            bytes,
            geometry,
            cache: RefCell::new(PageCache::default()),
        })
    }

    fn page_count(&self) -> u32 {
        self.geometry.len() as u32
    }

    fn intrinsic_rotation(&self, page_number: u32) -> Result<Rotation> {
        Ok(geometry_for(&self.geometry, page_number)?.rotation)
    }

    fn page_size(&self, page_number: u32) -> Result<(f32, f32)> {
        let page = geometry_for(&self.geometry, page_number)?;
        Ok((page.width, page.height))
    }

    async fn render_page(&self, page_number: u32, scale: f32, rotation: Rotation) -> Result<Raster> {
        let key = RenderKey::new(page_number, scale, rotation);
        if let Some(raster) = self.cache.borrow_mut().get(&key) {
            log::debug!("Page {} served from cache", page_number);
            return Ok(raster);
        }

        let page = geometry_for(&self.geometry, page_number)?;
        // Pdfium already honors the stored /Rotate, so only the user turn is passed on
        let extra = Rotation::from_degrees(rotation.degrees() as i32 - page.rotation.degrees() as i32)
            .unwrap_or(Rotation::NONE);
        let bytes = self.bytes.clone();

        let rendered = tokio::task::spawn_blocking(move || {
            let pdfium = init_pdfium()?;
            let document = pdfium.load_pdf_from_byte_slice(&bytes, None)?;
            let page = document.pages().get((page_number - 1) as u16)?;

            let config = PdfRenderConfig::new()
                .scale_page_by_factor(scale)
                .rotate(render_rotation(extra), false);

            let bitmap = page.render_with_config(&config)?;
            let rgba_data = bitmap.as_rgba_bytes().to_vec();
            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;

            Ok::<_, PdfiumError>(Raster {
                width,
                height,
                rgba_data,
            })
        })
        .await?;

        let raster = rendered.map_err(|e| AnnotateError::RenderFailure {
            page: page_number,
            reason: e.to_string(),
        })?;
        self.cache.borrow_mut().insert(key, raster.clone());
        Ok(raster)
    }
}

fn render_rotation(rotation: Rotation) -> PdfPageRenderRotation {
    match rotation.degrees() {
        90 => PdfPageRenderRotation::Degrees90,
        180 => PdfPageRenderRotation::Degrees180,
        270 => PdfPageRenderRotation::Degrees270,
        _ => PdfPageRenderRotation::None,
    }
}
