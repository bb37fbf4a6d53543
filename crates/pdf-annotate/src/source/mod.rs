//! Document sources: page count, stored rotation, page rasters
//!
//! The display path opens one source per session and only reads from it.
//! Export never uses it; it parses its own copy of the original bytes.

mod blank;
#[cfg(any(feature = "pdfium", test))]
mod cache;
mod geometry;
#[cfg(feature = "pdfium")]
mod pdfium;

pub use blank::BlankSource;
#[cfg(any(feature = "pdfium", test))]
pub use cache::{PageCache, RenderKey};
pub use geometry::{PageGeometry, page_geometry, read_page_geometry, stored_rotation};
#[cfg(feature = "pdfium")]
pub use pdfium::{PdfiumSource, init_pdfium};

pub(crate) use geometry::{inherited_attribute, resolve};

use crate::raster::Raster;
use crate::types::*;
use lopdf::Document;
use std::future::Future;
use std::sync::Arc;

/// Read-only access to an opened document
pub trait DocumentSource {
    /// Parse `bytes` into a new source
    fn open(bytes: Arc<[u8]>) -> impl Future<Output = Result<Self>>
    where
        Self: Sized;

    fn page_count(&self) -> u32;

    /// Stored /Rotate of a 1-based source page
    fn intrinsic_rotation(&self, page_number: u32) -> Result<Rotation>;

    /// Unrotated page size in points of a 1-based source page
    fn page_size(&self, page_number: u32) -> Result<(f32, f32)>;

    /// Rasterize a 1-based source page.
    ///
    /// `rotation` is the effective rotation of the displayed page, i.e. the
    /// stored rotation already composed with any user rotation.
    fn render_page(
        &self,
        page_number: u32,
        scale: f32,
        rotation: Rotation,
    ) -> impl Future<Output = Result<Raster>>;
}

/// Parse a PDF off the async thread and read its page geometry
pub(crate) async fn parse_geometry(bytes: Arc<[u8]>) -> Result<Vec<PageGeometry>> {
    let geometry = tokio::task::spawn_blocking(move || {
        let doc = Document::load_mem(&bytes).map_err(|e| AnnotateError::Load(e.to_string()))?;
        read_page_geometry(&doc)
    })
    .await??;

    if geometry.is_empty() {
        return Err(AnnotateError::Load("Document has no pages".to_string()));
    }
    Ok(geometry)
}

/// Look up the geometry of a 1-based page number
pub(crate) fn geometry_for(geometry: &[PageGeometry], page_number: u32) -> Result<&PageGeometry> {
    page_number
        .checked_sub(1)
        .and_then(|index| geometry.get(index as usize))
        .ok_or_else(|| AnnotateError::RenderFailure {
            page: page_number,
            reason: format!("document has {} pages", geometry.len()),
        })
}
