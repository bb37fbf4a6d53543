//! Low-resolution page previews

use crate::raster::Raster;
use crate::source::DocumentSource;
use crate::store::{PageEntry, PageId};
use futures::future::join_all;

/// Preview of one entry. `raster` is `None` when that page failed to render.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub position: usize,
    pub entry: PageId,
    pub raster: Option<Raster>,
}

/// Render every entry at `scale` with its combined rotation and no overlay.
///
/// Pages render concurrently; a failure is logged and only affects its own
/// thumbnail.
pub async fn generate_thumbnails<S: DocumentSource>(
    source: &S,
    entries: &[PageEntry],
    scale: f32,
) -> Vec<Thumbnail> {
    let renders = entries.iter().enumerate().map(|(position, entry)| async move {
        let rendered = match source.intrinsic_rotation(entry.original_index) {
            Ok(intrinsic) => {
                source
                    .render_page(entry.original_index, scale, intrinsic.compose(entry.rotation))
                    .await
            }
            Err(e) => Err(e),
        };

        let raster = match rendered {
            Ok(raster) => Some(raster),
            Err(e) => {
                log::warn!("Thumbnail for page {} failed: {}", entry.original_index, e);
                None
            }
        };

        Thumbnail {
            position,
            entry: entry.id,
            raster,
        }
    });

    join_all(renders).await
}
