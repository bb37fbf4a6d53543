#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, Stream};
use pdf_annotate::source::read_page_geometry;
use pdf_annotate::*;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::Arc;

pub struct TestPage {
    pub width: i64,
    pub height: i64,
    pub rotate: Option<i64>,
}

impl TestPage {
    pub fn letter() -> Self {
        Self {
            width: 612,
            height: 792,
            rotate: None,
        }
    }

    pub fn sized(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            rotate: None,
        }
    }

    pub fn rotated(rotate: i64) -> Self {
        Self {
            rotate: Some(rotate),
            ..Self::letter()
        }
    }
}

pub fn create_test_pdf(num_pages: usize) -> Document {
    let pages: Vec<TestPage> = (0..num_pages).map(|_| TestPage::letter()).collect();
    create_test_pdf_with(&pages)
}

/// Build a document whose page N carries the content marker `% source page N`
pub fn create_test_pdf_with(pages: &[TestPage]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let content = format!("% source page {}\nq Q\n", index + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page.width),
                    Object::Integer(page.height),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]);
        if let Some(rotate) = page.rotate {
            dict.set("Rotate", Object::Integer(rotate));
        }
        kids.push(Object::Reference(doc.add_object(dict)));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(pages.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

/// Two pages that inherit MediaBox, Rotate and Resources from the page tree root
pub fn create_inherited_pdf() -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for index in 0..2 {
        let content = format!("% source page {}\nBT /F1 12 Tf (x) Tj ET\n", index + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(2)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(400),
                Object::Integer(300),
            ]),
        ),
        ("Rotate", Object::Integer(180)),
        ("Resources", Object::Reference(resources_id)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn pdf_bytes(mut doc: Document) -> Vec<u8> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

/// Source page markers of an exported document, in output order
pub fn page_markers(doc: &Document) -> Vec<u32> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let marker = text
                .split("% source page ")
                .nth(1)
                .expect("page has no marker");
            marker
                .split_whitespace()
                .next()
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect()
}

pub fn page_rotations(doc: &Document) -> Vec<i64> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            doc.get_dictionary(page_id)
                .unwrap()
                .get(b"Rotate")
                .and_then(|r| r.as_i64())
                .unwrap_or(0)
        })
        .collect()
}

/// Image XObjects placed on a page
pub fn page_images(doc: &Document, page_id: lopdf::ObjectId) -> Vec<lopdf::ObjectId> {
    let page = doc.get_dictionary(page_id).unwrap();
    let Ok(resources) = page.get(b"Resources") else {
        return Vec::new();
    };
    let resources = match resources {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        other => other.as_dict().unwrap(),
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    xobjects
        .as_dict()
        .unwrap()
        .iter()
        .filter_map(|(_, value)| value.as_reference().ok())
        .filter(|id| {
            doc.get_object(*id)
                .and_then(|o| o.as_stream())
                .map(|s| s.dict.get(b"Subtype").and_then(|t| t.as_name()).ok() == Some(b"Image".as_slice()))
                .unwrap_or(false)
        })
        .collect()
}

/// Scripted source: real page geometry, recorded renders, optional failures
/// and a configurable number of suspension points per render
pub struct FakeSource {
    geometry: Vec<pdf_annotate::source::PageGeometry>,
    pub renders: RefCell<Vec<(u32, Rotation)>>,
    pub failing: RefCell<HashSet<u32>>,
    pub yields: Cell<usize>,
}

impl FakeSource {
    pub fn fail_page(&self, page_number: u32) {
        self.failing.borrow_mut().insert(page_number);
    }

    pub fn render_count(&self) -> usize {
        self.renders.borrow().len()
    }
}

impl DocumentSource for FakeSource {
    async fn open(bytes: Arc<[u8]>) -> Result<Self> {
        let doc = Document::load_mem(&bytes).map_err(|e| AnnotateError::Load(e.to_string()))?;
        let geometry = read_page_geometry(&doc)?;
        if geometry.is_empty() {
            return Err(AnnotateError::Load("Document has no pages".to_string()));
        }
        Ok(Self {
            geometry,
            renders: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
            yields: Cell::new(0),
        })
    }

    fn page_count(&self) -> u32 {
        self.geometry.len() as u32
    }

    fn intrinsic_rotation(&self, page_number: u32) -> Result<Rotation> {
        Ok(self.geometry[page_number as usize - 1].rotation)
    }

    fn page_size(&self, page_number: u32) -> Result<(f32, f32)> {
        let page = &self.geometry[page_number as usize - 1];
        Ok((page.width, page.height))
    }

    async fn render_page(&self, page_number: u32, scale: f32, rotation: Rotation) -> Result<Raster> {
        self.renders.borrow_mut().push((page_number, rotation));
        for _ in 0..self.yields.get() {
            tokio::task::yield_now().await;
        }

        if self.failing.borrow().contains(&page_number) {
            return Err(AnnotateError::RenderFailure {
                page: page_number,
                reason: "scripted failure".to_string(),
            });
        }

        let (width, height) = self.page_size(page_number)?;
        let (width, height) = scaled_size(width, height, scale, rotation);
        Ok(Raster::filled(width, height, [255, 255, 255, 255]))
    }
}

pub async fn open_editor(doc: Document) -> Editor<FakeSource, SceneSurface> {
    Editor::open(pdf_bytes(doc), SceneSurface::new(), EditorOptions::default())
        .await
        .unwrap()
}

/// Scene surface whose `load_scene` suspends a configurable number of times
#[derive(Default)]
pub struct SlowSurface {
    inner: SceneSurface,
    pub load_yields: usize,
}

impl SlowSurface {
    pub fn new(load_yields: usize) -> Self {
        Self {
            inner: SceneSurface::new(),
            load_yields,
        }
    }
}

impl AnnotationSurface for SlowSurface {
    fn attach(&mut self, viewport: Viewport) {
        self.inner.attach(viewport);
    }

    fn is_attached(&self) -> bool {
        self.inner.is_attached()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn add_object(&mut self, object: annotation::NewObject) -> SurfaceEvent {
        self.inner.add_object(object)
    }

    fn complete_stroke(&mut self, object: annotation::NewObject) -> SurfaceEvent {
        self.inner.complete_stroke(object)
    }

    fn modify_object<F>(&mut self, id: ObjectId, edit: F) -> Option<SurfaceEvent>
    where
        F: FnOnce(&mut AnnotationObject) -> bool,
    {
        self.inner.modify_object(id, edit)
    }

    fn remove_object(&mut self, id: ObjectId) -> Option<SurfaceEvent> {
        self.inner.remove_object(id)
    }

    fn select(&mut self, id: Option<ObjectId>) {
        self.inner.select(id);
    }

    fn selected(&self) -> Option<ObjectId> {
        self.inner.selected()
    }

    fn objects(&self) -> &[AnnotationObject] {
        self.inner.objects()
    }

    fn serialize_scene(&self) -> Snapshot {
        self.inner.serialize_scene()
    }

    async fn load_scene(&mut self, snapshot: &Snapshot) -> Result<()> {
        for _ in 0..self.load_yields {
            tokio::task::yield_now().await;
        }
        self.inner.load_scene(snapshot).await
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }
}

pub async fn open_slow_editor(doc: Document, load_yields: usize) -> Editor<FakeSource, SlowSurface> {
    Editor::open(pdf_bytes(doc), SlowSurface::new(load_yields), EditorOptions::default())
        .await
        .unwrap()
}
