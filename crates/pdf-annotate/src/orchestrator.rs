//! Render orchestration
//!
//! Keeps the displayed raster and the annotation surface in step with the
//! store's current position. At most one render is in flight; requests made
//! while busy are dropped, but they still advance the render generation, so
//! the in-flight render notices and renders the latest position before it
//! releases the busy flag.

use crate::raster::Raster;
use crate::session::{BusyGuard, SessionContext};
use crate::source::DocumentSource;
use crate::store::PageId;
use crate::surface::{AnnotationSurface, SurfaceEvent, Viewport};
use crate::types::*;
use std::cell::{Cell, RefCell};
use tokio::sync::Mutex;

// =============================================================================
// Display State
// =============================================================================

/// The page currently on screen
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedPage {
    pub position: usize,
    pub entry: PageId,
    pub original_index: u32,
    /// Effective rotation the raster was rendered at
    pub rotation: Rotation,
    pub scale: f32,
    pub raster: Raster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { position: usize, entry: PageId },
    /// Another render was in flight; it will pick up the request
    Dropped,
    /// Nothing to do
    Unchanged,
}

struct SurfaceSlot<A> {
    surface: A,
    /// Entry whose scene the surface currently shows
    bound: Option<PageId>,
}

pub struct RenderOrchestrator<A> {
    busy: Cell<bool>,
    generation: Cell<u64>,
    scale: Cell<f32>,
    display: RefCell<Option<DisplayedPage>>,
    slot: Mutex<SurfaceSlot<A>>,
}

impl<A: AnnotationSurface> RenderOrchestrator<A> {
    pub fn new(surface: A, initial_scale: f32) -> Self {
        Self {
            busy: Cell::new(false),
            generation: Cell::new(0),
            scale: Cell::new(initial_scale),
            display: RefCell::new(None),
            slot: Mutex::new(SurfaceSlot {
                surface,
                bound: None,
            }),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn scale(&self) -> f32 {
        self.scale.get()
    }

    pub fn displayed(&self) -> Option<DisplayedPage> {
        self.display.borrow().clone()
    }

    fn displayed_entry(&self) -> Option<PageId> {
        self.display.borrow().as_ref().map(|d| d.entry)
    }

    /// Mark every render issued so far as stale
    pub fn invalidate(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Show the entry at `position`.
    ///
    /// Returns `Unchanged` when that entry is already displayed, and
    /// `Dropped` when another render is in flight and will pick it up.
    ///
    /// # Arguments
    /// * `ctx` - Session whose store supplies the entry
    /// * `source` - Display source the page is rasterized from
    /// * `position` - 0-based index into the current entry order
    pub async fn navigate<S: DocumentSource>(
        &self,
        ctx: &SessionContext,
        source: &S,
        position: usize,
    ) -> Result<RenderOutcome> {
        {
            let mut store = ctx.store.borrow_mut();
            let target = store
                .entry(position)
                .map(|e| e.id)
                .ok_or(AnnotateError::InvalidPosition {
                    position,
                    len: store.len(),
                })?;
            if store.current_position() == position && self.displayed_entry() == Some(target) {
                return Ok(RenderOutcome::Unchanged);
            }
            store.set_current(position)?;
        }

        self.invalidate();
        self.render(ctx, source).await
    }

    /// Re-render the current position after a structural change
    pub async fn refresh<S: DocumentSource>(
        &self,
        ctx: &SessionContext,
        source: &S,
    ) -> Result<RenderOutcome> {
        self.invalidate();
        self.render(ctx, source).await
    }

    /// Step the zoom by `delta`, clamped to the configured range.
    ///
    /// # Arguments
    /// * `ctx` - Session supplying the scale limits
    /// * `source` - Display source for the re-render
    /// * `delta` - Scale change; negative zooms out
    pub async fn zoom<S: DocumentSource>(
        &self,
        ctx: &SessionContext,
        source: &S,
        delta: f32,
    ) -> Result<RenderOutcome> {
        let view = &ctx.options.view;
        let current = self.scale.get();
        let scale = (current + delta).clamp(view.min_scale, view.max_scale);
        if (scale - current).abs() < f32::EPSILON {
            return Ok(RenderOutcome::Unchanged);
        }

        log::debug!("Zoom {:.2} -> {:.2}", current, scale);
        self.scale.set(scale);
        let outcome = self.refresh(ctx, source).await;
        if outcome.is_err() {
            self.scale.set(current);
        }
        outcome
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    async fn render<S: DocumentSource>(
        &self,
        ctx: &SessionContext,
        source: &S,
    ) -> Result<RenderOutcome> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            log::debug!("Render in flight, dropping request");
            return Ok(RenderOutcome::Dropped);
        };

        loop {
            let generation = self.generation.get();
            let (position, entry) = {
                let store = ctx.store.borrow();
                let position = store.current_position();
                let entry = *store
                    .current_entry()
                    .ok_or(AnnotateError::InvalidPosition {
                        position,
                        len: store.len(),
                    })?;
                (position, entry)
            };

            let rotation = source
                .intrinsic_rotation(entry.original_index)?
                .compose(entry.rotation);
            let scale = self.scale.get();
            let rendered = source
                .render_page(entry.original_index, scale, rotation)
                .await;

            if self.generation.get() != generation {
                log::debug!(
                    "Discarding stale render of page {} (generation {} superseded)",
                    entry.original_index,
                    generation
                );
                continue;
            }
            let raster = match rendered {
                Ok(raster) => raster,
                Err(e) => {
                    self.restore_displayed_position(ctx).await;
                    return Err(e);
                }
            };

            let mut slot = self.slot.lock().await;
            if self.generation.get() != generation {
                continue;
            }

            Self::capture_bound(ctx, &slot);
            if slot.surface.is_attached() {
                slot.surface.resize(raster.width, raster.height);
            } else {
                slot.surface
                    .attach(Viewport::new(raster.width, raster.height));
            }
            slot.surface.clear();
            slot.bound = Some(entry.id);

            *self.display.borrow_mut() = Some(DisplayedPage {
                position,
                entry: entry.id,
                original_index: entry.original_index,
                rotation,
                scale,
                raster,
            });

            let snapshot = ctx.store.borrow().snapshot(entry.id).cloned();
            let loaded = match snapshot {
                Some(snapshot) => slot.surface.load_scene(&snapshot).await,
                None => Ok(()),
            };
            if loaded.is_err() {
                // The cleared surface must never be captured over the stored scene
                slot.bound = None;
            }
            if self.generation.get() != generation {
                log::debug!(
                    "Scene of page {} superseded while loading",
                    entry.original_index
                );
                continue;
            }
            loaded?;

            return Ok(RenderOutcome::Rendered {
                position,
                entry: entry.id,
            });
        }
    }

    // A failed render leaves the previous page on screen; point the store back at it.
    // If that page was deleted, nothing valid is on screen: unbind and forget it.
    async fn restore_displayed_position(&self, ctx: &SessionContext) {
        let Some(displayed) = self.displayed_entry() else {
            return;
        };
        {
            let mut store = ctx.store.borrow_mut();
            if let Some(position) = store.position_of(displayed) {
                let _ = store.set_current(position);
                return;
            }
        }

        log::warn!("Displayed entry {} no longer exists", displayed.raw());
        let mut slot = self.slot.lock().await;
        if slot.bound == Some(displayed) {
            slot.surface.clear();
            slot.bound = None;
        }
        *self.display.borrow_mut() = None;
    }

    // =========================================================================
    // Scene Capture
    // =========================================================================

    /// Store the surface scene into the entry it is bound to
    pub async fn capture(&self, ctx: &SessionContext) {
        let slot = self.slot.lock().await;
        Self::capture_bound(ctx, &slot);
    }

    // Untouched entries stay without a snapshot
    fn capture_bound(ctx: &SessionContext, slot: &SurfaceSlot<A>) {
        let Some(bound) = slot.bound else {
            return;
        };
        let mut store = ctx.store.borrow_mut();
        if store.snapshot(bound).is_some() || !slot.surface.objects().is_empty() {
            store.set_snapshot(bound, slot.surface.serialize_scene());
        }
    }

    /// Run a scene mutation and capture the whole scene if it reports an event
    pub async fn mutate<F>(&self, ctx: &SessionContext, edit: F) -> Result<Option<SurfaceEvent>>
    where
        F: FnOnce(&mut A) -> Option<SurfaceEvent>,
    {
        let mut slot = self.slot.lock().await;
        let Some(bound) = slot.bound else {
            return Err(AnnotateError::Busy);
        };

        let event = edit(&mut slot.surface);
        if let Some(event) = event {
            log::debug!("{:?} on entry {}", event, bound.raw());
            let snapshot = slot.surface.serialize_scene();
            ctx.store.borrow_mut().set_snapshot(bound, snapshot);
        }
        Ok(event)
    }

    /// Read from the surface without mutating it
    pub async fn inspect<R>(&self, read: impl FnOnce(&A) -> R) -> R {
        let slot = self.slot.lock().await;
        read(&slot.surface)
    }

    /// Entry the surface is bound to
    pub async fn bound_entry(&self) -> Option<PageId> {
        self.slot.lock().await.bound
    }

    /// Dispose the surface and hand it back
    pub fn into_surface(self) -> A {
        let mut slot = self.slot.into_inner();
        slot.surface.dispose();
        slot.surface
    }
}
