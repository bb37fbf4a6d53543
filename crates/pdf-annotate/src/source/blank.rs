use super::{DocumentSource, PageGeometry, geometry_for, parse_geometry};
use crate::raster::{Raster, scaled_size};
use crate::types::*;
use std::sync::Arc;

/// Geometry-only source for headless editing.
///
/// Renders a white raster of the correct size instead of page content, which
/// is enough to size the annotation surface without a rasterizer library.
pub struct BlankSource {
    geometry: Vec<PageGeometry>,
}

impl BlankSource {
    pub fn geometry(&self) -> &[PageGeometry] {
        &self.geometry
    }
}

impl DocumentSource for BlankSource {
    async fn open(bytes: Arc<[u8]>) -> Result<Self> {
        let geometry = parse_geometry(bytes).await?;
        Ok(Self { geometry })
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
        let page = geometry_for(&self.geometry, page_number)?;
        let (width, height) = scaled_size(page.width, page.height, scale, rotation);
        Ok(Raster::filled(width, height, [255, 255, 255, 255]))
    }
}
