//! Top-level editing controller
//!
//! An [`Editor`] owns one loaded document: the session context, the display
//! source, the render orchestrator with its surface, and the export engine.
//! Loading another document means building another editor.

use crate::annotation::{
    AnnotationKind, ObjectId, Point, Snapshot, StyleChange, StyleState, Tool, freehand_stroke,
    image_object,
};
use crate::delivery::{OutputName, deliver};
use crate::export::ExportEngine;
use crate::options::EditorOptions;
use crate::orchestrator::{DisplayedPage, RenderOrchestrator, RenderOutcome};
use crate::session::{BusyGuard, Document, SessionContext};
use crate::source::DocumentSource;
use crate::store::{PageEntry, PageId};
use crate::surface::{AnnotationSurface, SurfaceEvent};
use crate::thumbnails::{Thumbnail, generate_thumbnails};
use crate::types::*;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Editor<S, A> {
    ctx: SessionContext,
    source: S,
    orchestrator: RenderOrchestrator<A>,
    engine: ExportEngine,
    drawing: Cell<bool>,
    exporting: Cell<bool>,
}

impl<S: DocumentSource, A: AnnotationSurface> Editor<S, A> {
    /// Load a document and display its first page
    pub async fn open(
        bytes: impl Into<Arc<[u8]>>,
        surface: A,
        options: EditorOptions,
    ) -> Result<Self> {
        options.validate()?;
        let bytes = bytes.into();
        let source = S::open(bytes.clone()).await?;
        let document = Document::describe(bytes, &source)?;
        log::info!("Loaded document with {} pages", document.page_count());

        let ctx = SessionContext::new(document, options);
        let orchestrator = RenderOrchestrator::new(surface, ctx.options.view.initial_scale);
        let engine = ExportEngine::new(&ctx.options);
        let editor = Self {
            ctx,
            source,
            orchestrator,
            engine,
            drawing: Cell::new(false),
            exporting: Cell::new(false),
        };

        editor.orchestrator.refresh(&editor.ctx, &editor.source).await?;
        Ok(editor)
    }

    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn page_count(&self) -> usize {
        self.ctx.store.borrow().len()
    }

    pub fn current_position(&self) -> usize {
        self.ctx.store.borrow().current_position()
    }

    pub fn entries(&self) -> Vec<PageEntry> {
        self.ctx.store.borrow().entries().to_vec()
    }

    /// Stored scene of the entry at `position`
    pub fn snapshot_at(&self, position: usize) -> Option<Snapshot> {
        let store = self.ctx.store.borrow();
        let entry = store.entry(position)?;
        store.snapshot(entry.id).cloned()
    }

    pub fn displayed(&self) -> Option<DisplayedPage> {
        self.orchestrator.displayed()
    }

    pub fn scale(&self) -> f32 {
        self.orchestrator.scale()
    }

    pub fn style(&self) -> StyleState {
        *self.ctx.style.borrow()
    }

    pub fn is_rendering(&self) -> bool {
        self.orchestrator.is_busy()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.get()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.get()
    }

    // Navigation

    pub async fn navigate(&self, position: usize) -> Result<RenderOutcome> {
        self.orchestrator
            .navigate(&self.ctx, &self.source, position)
            .await
    }

    pub async fn next_page(&self) -> Result<RenderOutcome> {
        let next = self.current_position() + 1;
        if next >= self.page_count() {
            return Ok(RenderOutcome::Unchanged);
        }
        self.navigate(next).await
    }

    pub async fn previous_page(&self) -> Result<RenderOutcome> {
        match self.current_position().checked_sub(1) {
            Some(previous) => self.navigate(previous).await,
            None => Ok(RenderOutcome::Unchanged),
        }
    }

    pub async fn zoom_in(&self) -> Result<RenderOutcome> {
        let step = self.ctx.options.view.zoom_step;
        self.orchestrator.zoom(&self.ctx, &self.source, step).await
    }

    pub async fn zoom_out(&self) -> Result<RenderOutcome> {
        let step = self.ctx.options.view.zoom_step;
        self.orchestrator.zoom(&self.ctx, &self.source, -step).await
    }

    // Page list

    pub async fn rotate_right(&self) -> Result<RenderOutcome> {
        self.rotate_current(90).await
    }

    pub async fn rotate_left(&self) -> Result<RenderOutcome> {
        self.rotate_current(-90).await
    }

    async fn rotate_current(&self, delta: i32) -> Result<RenderOutcome> {
        self.orchestrator.capture(&self.ctx).await;
        {
            let mut store = self.ctx.store.borrow_mut();
            let position = store.current_position();
            store.rotate(position, delta);
        }
        self.orchestrator.refresh(&self.ctx, &self.source).await
    }

    /// Delete the displayed entry. The last remaining entry cannot be deleted.
    pub async fn delete_current(&self) -> Result<RenderOutcome> {
        self.orchestrator.capture(&self.ctx).await;
        let removed = {
            let mut store = self.ctx.store.borrow_mut();
            let position = store.current_position();
            store.delete(position)?
        };
        log::info!("Deleted source page {}", removed.original_index);
        self.orchestrator.refresh(&self.ctx, &self.source).await
    }

    pub async fn move_page(&self, from: usize, to: usize) -> Result<RenderOutcome> {
        self.orchestrator.capture(&self.ctx).await;
        self.ctx.store.borrow_mut().move_entry(from, to)?;
        self.orchestrator.refresh(&self.ctx, &self.source).await
    }

    // Scene editing

    /// Drop a default object of `tool` onto the current page
    pub async fn add_tool(&self, tool: Tool) -> Result<ObjectId> {
        let object = tool.build(&self.ctx.style.borrow());
        self.add(move |surface| surface.add_object(object)).await
    }

    pub async fn add_image(&self, bytes: &[u8]) -> Result<ObjectId> {
        let object = image_object(bytes, self.ctx.options.overlay.max_image_dimension)?;
        self.add(move |surface| surface.add_object(object)).await
    }

    pub fn set_drawing(&self, enabled: bool) {
        self.drawing.set(enabled);
    }

    /// Toggle freehand drawing mode, returning the new state
    pub fn toggle_drawing(&self) -> bool {
        let enabled = !self.drawing.get();
        self.drawing.set(enabled);
        enabled
    }

    /// Finish a freehand stroke through `points` (surface pixels).
    ///
    /// Strokes are ignored outside drawing mode.
    pub async fn complete_stroke(&self, points: &[Point]) -> Result<Option<ObjectId>> {
        if !self.drawing.get() {
            log::debug!("Ignoring stroke outside drawing mode");
            return Ok(None);
        }
        let Some(object) = freehand_stroke(points, &self.ctx.style.borrow()) else {
            return Ok(None);
        };
        self.add(move |surface| surface.complete_stroke(object))
            .await
            .map(Some)
    }

    async fn add<F>(&self, insert: F) -> Result<ObjectId>
    where
        F: FnOnce(&mut A) -> SurfaceEvent,
    {
        let event = self
            .orchestrator
            .mutate(&self.ctx, |surface| Some(insert(surface)))
            .await?;
        event.map(SurfaceEvent::object).ok_or(AnnotateError::Busy)
    }

    pub async fn select(&self, id: Option<ObjectId>) -> Result<()> {
        self.orchestrator
            .mutate(&self.ctx, |surface| {
                surface.select(id);
                None
            })
            .await?;
        Ok(())
    }

    /// The live scene on the surface
    pub async fn scene(&self) -> Snapshot {
        self.orchestrator
            .inspect(|surface| surface.serialize_scene())
            .await
    }

    pub async fn selected(&self) -> Option<ObjectId> {
        self.orchestrator.inspect(|surface| surface.selected()).await
    }

    /// Entry that scene edits are captured into, if any
    pub async fn bound_entry(&self) -> Option<PageId> {
        self.orchestrator.bound_entry().await
    }

    /// Move an object to a new origin
    pub async fn move_object(&self, id: ObjectId, left: f32, top: f32) -> Result<bool> {
        let event = self
            .orchestrator
            .mutate(&self.ctx, |surface| {
                surface.modify_object(id, |object| {
                    object.left = left;
                    object.top = top;
                    true
                })
            })
            .await?;
        Ok(event.is_some())
    }

    /// Replace the content of a text object
    pub async fn edit_text(&self, id: ObjectId, content: &str) -> Result<bool> {
        let event = self
            .orchestrator
            .mutate(&self.ctx, |surface| {
                surface.modify_object(id, |object| match &mut object.kind {
                    AnnotationKind::Text { text, .. } => {
                        *text = content.to_string();
                        true
                    }
                    _ => false,
                })
            })
            .await?;
        Ok(event.is_some())
    }

    /// Change the style for new objects and restyle the selected object only.
    ///
    /// Returns whether the selected object accepted the change.
    pub async fn update_style(&self, change: StyleChange) -> Result<bool> {
        self.ctx.style.borrow_mut().apply(change);
        let event = self
            .orchestrator
            .mutate(&self.ctx, |surface| {
                let id = surface.selected()?;
                surface.modify_object(id, |object| object.kind.apply_style(change))
            })
            .await?;
        Ok(event.is_some())
    }

    pub async fn delete_selected(&self) -> Result<bool> {
        let event = self
            .orchestrator
            .mutate(&self.ctx, |surface| {
                let id = surface.selected()?;
                surface.remove_object(id)
            })
            .await?;
        Ok(event.is_some())
    }

    // Output

    pub async fn thumbnails(&self) -> Vec<Thumbnail> {
        let entries = self.entries();
        generate_thumbnails(&self.source, &entries, self.ctx.options.view.thumbnail_scale).await
    }

    /// Build the edited document. The original bytes are kept, so this can be repeated.
    pub async fn export(&self) -> Result<Vec<u8>> {
        let Some(_exporting) = BusyGuard::acquire(&self.exporting) else {
            return Err(AnnotateError::Busy);
        };

        self.orchestrator.capture(&self.ctx).await;
        let view = self.ctx.store.borrow().export_view();
        let bytes = self.ctx.document.bytes().clone();
        self.engine.export(bytes, view).await
    }

    /// Export and write `<Product>_Edited.pdf` into `dir`
    pub async fn export_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let bytes = self.export().await?;
        let name = OutputName::edited(&self.ctx.options.output.product_name);
        deliver(&bytes, dir, &name).await
    }

    /// Dispose the surface and hand it back
    pub fn close(self) -> A {
        self.orchestrator.into_surface()
    }
}
