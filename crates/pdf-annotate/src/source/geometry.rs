//! Page geometry read straight from the PDF object tree

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::*;
use lopdf::{Document, Object, ObjectId};

/// Size and stored rotation of one source page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// MediaBox width in points, before rotation
    pub width: f32,
    /// MediaBox height in points, before rotation
    pub height: f32,
    /// The page's own /Rotate value
    pub rotation: Rotation,
}

/// Geometry of every page, in document order
pub fn read_page_geometry(doc: &Document) -> Result<Vec<PageGeometry>> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_geometry(doc, page_id))
        .collect()
}

pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let (width, height) = media_box_size(doc, page_id).unwrap_or(DEFAULT_PAGE_DIMENSIONS);
    Ok(PageGeometry {
        width,
        height,
        rotation: stored_rotation(doc, page_id),
    })
}

/// The page's /Rotate, inherited from the page tree when absent
pub fn stored_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    let degrees = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);
    Rotation::from_degrees(degrees as i32).unwrap_or_else(|| {
        log::warn!(
            "Ignoring /Rotate {} on page {:?}: not a multiple of 90",
            degrees,
            page_id
        );
        Rotation::NONE
    })
}

fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = media_box
        .iter()
        .map(|obj| extract_number(resolve(doc, obj)?))
        .collect::<Option<_>>()?;
    Some(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
}

/// Look up a page attribute, walking /Parent links for inheritable keys.
///
/// References are resolved, so the returned object is never a
/// `Object::Reference`.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = Some(page_id);
    // Guard against cyclic /Parent chains in damaged files
    let mut depth = 0;
    while let Some(id) = current {
        if depth > 64 {
            return None;
        }
        depth += 1;

        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
