//! Output document assembly
//!
//! Copies source pages into a fresh document, embeds overlay rasters as
//! image XObjects and writes the page tree.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::raster::Raster;
use crate::source::{inherited_attribute, resolve};
use crate::types::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::HashMap;
use std::io::Write;

/// Page keys that are not carried over to the copy
const SKIPPED_PAGE_KEYS: &[&[u8]] = &[b"Parent", b"Annots", b"B", b"StructParents"];

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// XObject name prefix of embedded overlays
const OVERLAY_NAME: &str = "PdfaOverlay";

// =============================================================================
// Output Builder
// =============================================================================

pub struct OutputBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    cache: HashMap<ObjectId, ObjectId>,
}

impl OutputBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Copy one source page with everything it references.
    ///
    /// Inherited attributes are resolved onto the copy, since it gets a new
    /// parent. The page is not part of the output until [`Self::add_page`].
    ///
    /// # Arguments
    /// * `source` - Freshly parsed source document
    /// * `page_id` - Object ID of the page in `source`
    pub fn copy_page(&mut self, source: &Document, page_id: ObjectId) -> Result<ObjectId> {
        let page_dict = source.get_dictionary(page_id)?;
        let new_id = self.doc.new_object_id();
        self.cache.insert(page_id, new_id);

        let mut dict = Dictionary::new();
        for (key, value) in page_dict.iter() {
            if SKIPPED_PAGE_KEYS.contains(&key.as_slice()) {
                continue;
            }
            dict.set(
                key.clone(),
                copy_object_deep(&mut self.doc, source, value, &mut self.cache)?,
            );
        }

        for &key in INHERITABLE_KEYS {
            if dict.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page_id, key) {
                dict.set(
                    key.to_vec(),
                    copy_object_deep(&mut self.doc, source, value, &mut self.cache)?,
                );
            }
        }

        if !dict.has(b"MediaBox") {
            dict.set("MediaBox", default_media_box());
        }
        dict.set("Type", Object::Name(b"Page".to_vec()));
        dict.set("Parent", Object::Reference(self.pages_id));

        self.doc.objects.insert(new_id, Object::Dictionary(dict));
        Ok(new_id)
    }

    pub fn set_rotation(&mut self, page: ObjectId, rotation: Rotation) -> Result<()> {
        self.doc
            .get_object_mut(page)?
            .as_dict_mut()?
            .set("Rotate", Object::Integer(rotation.degrees() as i64));
        Ok(())
    }

    /// Embed a raster as an RGB image with a grayscale soft mask for alpha
    pub fn embed_image(&mut self, raster: &Raster) -> Result<ObjectId> {
        let pixels = raster.width as usize * raster.height as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in raster.rgba_data.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }

        let smask = image_stream(raster, "DeviceGray", &alpha, None)?;
        let smask_id = self.doc.add_object(smask);
        let image = image_stream(raster, "DeviceRGB", &rgb, Some(smask_id))?;
        Ok(self.doc.add_object(image))
    }

    /// Draw an image XObject over the whole MediaBox, on top of the page content.
    ///
    /// The existing content is wrapped in `q`/`Q` so its graphics state cannot
    /// leak into the overlay.
    ///
    /// # Arguments
    /// * `page` - A page already copied into the output
    /// * `image` - Image XObject from [`Self::embed_image`]
    pub fn draw_image_full_page(&mut self, page: ObjectId, image: ObjectId) -> Result<()> {
        let ([x0, y0, x1, y1], mut resources, existing) = {
            let page_dict = self.doc.get_dictionary(page)?;
            let resources = match page_dict.get(b"Resources") {
                Ok(obj) => self.owned_dictionary(obj),
                Err(_) => Dictionary::new(),
            };
            let existing = match page_dict.get(b"Contents") {
                Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
                Ok(Object::Array(parts)) => parts.clone(),
                _ => Vec::new(),
            };
            (self.media_box(page_dict), resources, existing)
        };

        let mut xobjects = match resources.get(b"XObject") {
            Ok(obj) => self.owned_dictionary(obj),
            Err(_) => Dictionary::new(),
        };
        let mut name = OVERLAY_NAME.to_string();
        let mut suffix = 1;
        while xobjects.has(name.as_bytes()) {
            name = format!("{}{}", OVERLAY_NAME, suffix);
            suffix += 1;
        }
        xobjects.set(name.clone(), Object::Reference(image));
        resources.set("XObject", Object::Dictionary(xobjects));

        // Original content runs inside q/Q so its graphics state cannot leak
        let mut contents = vec![Object::Reference(self.content_stream(b"q\n".to_vec()))];
        contents.extend(existing);
        let overlay = format!(
            "\nQ\nq {} 0 0 {} {} {} cm /{} Do Q\n",
            x1 - x0,
            y1 - y0,
            x0,
            y0,
            name
        );
        contents.push(Object::Reference(self.content_stream(overlay.into_bytes())));

        let page_dict = self.doc.get_object_mut(page)?.as_dict_mut()?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));
        Ok(())
    }

    pub fn add_page(&mut self, page: ObjectId) {
        self.kids.push(Object::Reference(page));
    }

    /// Write the page tree, catalog and info, then serialize
    pub fn finish(mut self, producer: &str) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(producer),
        });

        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn content_stream(&mut self, content: Vec<u8>) -> ObjectId {
        self.doc.add_object(Stream::new(Dictionary::new(), content))
    }

    fn owned_dictionary(&self, obj: &Object) -> Dictionary {
        resolve(&self.doc, obj)
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default()
    }

    fn media_box(&self, page_dict: &Dictionary) -> [f32; 4] {
        let coords: Option<Vec<f32>> = page_dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .filter(|arr| arr.len() == 4)
            .and_then(|arr| {
                arr.iter()
                    .map(|o| resolve(&self.doc, o).and_then(extract_number))
                    .collect()
            });

        match coords.as_deref() {
            Some(&[x0, y0, x1, y1]) => [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)],
            _ => [0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1],
        }
    }
}

impl Default for OutputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Image Streams
// =============================================================================

/// Build a zlib-compressed 8-bit image XObject.
///
/// # Arguments
/// * `raster` - Supplies width and height
/// * `color_space` - `DeviceRGB` for color samples, `DeviceGray` for a soft mask
/// * `samples` - Packed samples in the given color space
/// * `smask` - Soft mask to attach, if any
fn image_stream(
    raster: &Raster,
    color_space: &str,
    samples: &[u8],
    smask: Option<ObjectId>,
) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    let compressed = encoder.finish()?;

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => raster.width as i64,
        "Height" => raster.height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(smask) = smask {
        dict.set("SMask", smask);
    }

    let mut stream = Stream::new(dict, compressed);
    stream.allows_compression = false;
    Ok(stream)
}

fn default_media_box() -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.0 as i64),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.1 as i64),
    ]
}

// =============================================================================
// Object Copying
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Ids are reserved before the target is copied, so reference cycles
/// terminate. References to page tree nodes not already copied become null
/// instead of dragging in the whole source tree.
///
/// # Arguments
/// * `output` - The document receiving the copy
/// * `source` - The document `obj` belongs to
/// * `obj` - The object to copy
/// * `cache` - Source to output id map, shared across pages
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = source.get_object(*id)?;
            if is_page_tree_node(referenced) {
                return Ok(Object::Null);
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        _ => Ok(obj.clone()),
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    obj.as_dict()
        .and_then(|d| d.get(b"Type"))
        .and_then(|t| t.as_name())
        .is_ok_and(|name| name == b"Page" || name == b"Pages")
}

fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
