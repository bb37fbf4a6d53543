//! Annotation surface
//!
//! The surface holds the live vector scene of the displayed page. Every
//! mutating call reports a [`SurfaceEvent`]; the orchestrator turns each one
//! into a full-scene capture for the entry the surface is bound to.

use crate::annotation::{AnnotationKind, AnnotationObject, NewObject, ObjectId, Snapshot};
use crate::types::*;
use std::future::Future;

/// Pixel size of the on-screen page the surface is laid over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Scene mutations that must be captured into the bound entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    ObjectAdded(ObjectId),
    ObjectModified(ObjectId),
    StrokeCompleted(ObjectId),
    ObjectRemoved(ObjectId),
}

impl SurfaceEvent {
    pub fn object(self) -> ObjectId {
        match self {
            SurfaceEvent::ObjectAdded(id)
            | SurfaceEvent::ObjectModified(id)
            | SurfaceEvent::StrokeCompleted(id)
            | SurfaceEvent::ObjectRemoved(id) => id,
        }
    }
}

/// An editable vector scene
pub trait AnnotationSurface {
    fn attach(&mut self, viewport: Viewport);

    fn is_attached(&self) -> bool;

    fn resize(&mut self, width: u32, height: u32);

    /// Remove every object and the selection
    fn clear(&mut self);

    fn add_object(&mut self, object: NewObject) -> SurfaceEvent;

    /// Add a finished freehand stroke
    fn complete_stroke(&mut self, object: NewObject) -> SurfaceEvent;

    /// Edit one object in place. `edit` returns whether it changed anything.
    fn modify_object<F>(&mut self, id: ObjectId, edit: F) -> Option<SurfaceEvent>
    where
        F: FnOnce(&mut AnnotationObject) -> bool;

    fn remove_object(&mut self, id: ObjectId) -> Option<SurfaceEvent>;

    fn select(&mut self, id: Option<ObjectId>);

    fn selected(&self) -> Option<ObjectId>;

    fn objects(&self) -> &[AnnotationObject];

    fn serialize_scene(&self) -> Snapshot;

    /// Replace the scene with a stored snapshot
    fn load_scene(&mut self, snapshot: &Snapshot) -> impl Future<Output = Result<()>>;

    fn dispose(&mut self);
}

/// In-memory scene with single selection
#[derive(Debug, Default)]
pub struct SceneSurface {
    viewport: Option<Viewport>,
    /// Coordinate frame of a loaded scene; the viewport's otherwise
    frame: Option<(f32, f32)>,
    objects: Vec<AnnotationObject>,
    selected: Option<ObjectId>,
    next_id: u64,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn insert(&mut self, object: NewObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects
            .push(AnnotationObject::new(id, object.left, object.top, object.kind));
        if object.select {
            self.selected = Some(id);
        }
        id
    }
}

impl AnnotationSurface for SceneSurface {
    fn attach(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn is_attached(&self) -> bool {
        self.viewport.is_some()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Some(Viewport::new(width, height));
    }

    fn clear(&mut self) {
        self.objects.clear();
        self.selected = None;
        self.frame = None;
    }

    fn add_object(&mut self, object: NewObject) -> SurfaceEvent {
        SurfaceEvent::ObjectAdded(self.insert(object))
    }

    fn complete_stroke(&mut self, object: NewObject) -> SurfaceEvent {
        SurfaceEvent::StrokeCompleted(self.insert(object))
    }

    fn modify_object<F>(&mut self, id: ObjectId, edit: F) -> Option<SurfaceEvent>
    where
        F: FnOnce(&mut AnnotationObject) -> bool,
    {
        let object = self.objects.iter_mut().find(|o| o.id == id)?;
        edit(object).then_some(SurfaceEvent::ObjectModified(id))
    }

    fn remove_object(&mut self, id: ObjectId) -> Option<SurfaceEvent> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        self.objects.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(SurfaceEvent::ObjectRemoved(id))
    }

    fn select(&mut self, id: Option<ObjectId>) {
        self.selected = id.filter(|id| self.objects.iter().any(|o| o.id == *id));
    }

    fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    fn serialize_scene(&self) -> Snapshot {
        let (width, height) = self
            .frame
            .or(self.viewport.map(|v| (v.width as f32, v.height as f32)))
            .unwrap_or((0.0, 0.0));
        Snapshot::new(width, height, self.objects.clone())
    }

    async fn load_scene(&mut self, snapshot: &Snapshot) -> Result<()> {
        snapshot.validate()?;
        for object in &snapshot.objects {
            if let AnnotationKind::Image { png, .. } = &object.kind {
                image::guess_format(png).map_err(|e| {
                    AnnotateError::SnapshotLoad(format!("Image object {}: {}", object.id.0, e))
                })?;
            }
        }

        self.objects = snapshot.objects.clone();
        self.frame = Some((snapshot.width, snapshot.height));
        self.selected = None;
        self.next_id = snapshot.max_object_id().map_or(0, |id| id.0 + 1);
        Ok(())
    }

    fn dispose(&mut self) {
        self.clear();
        self.viewport = None;
    }
}
