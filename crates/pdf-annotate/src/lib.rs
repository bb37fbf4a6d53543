pub mod annotation;
pub mod constants;
mod delivery;
mod editor;
pub mod export;
mod options;
mod orchestrator;
mod raster;
mod session;
pub mod source;
mod store;
mod surface;
mod thumbnails;
mod types;

pub use annotation::{
    AnnotationKind, AnnotationObject, Color, ObjectId, Point, Snapshot, StyleChange, StyleState,
    Tool,
};
pub use delivery::{OutputName, UserNotice, deliver};
pub use editor::Editor;
pub use export::ExportEngine;
pub use options::*;
pub use orchestrator::{DisplayedPage, RenderOrchestrator, RenderOutcome};
pub use raster::{Raster, scaled_size};
pub use session::{Document, SessionContext};
pub use source::{BlankSource, DocumentSource};
#[cfg(feature = "pdfium")]
pub use source::PdfiumSource;
pub use store::{EditStore, ExportEntry, PageEntry, PageId};
pub use surface::{AnnotationSurface, SceneSurface, SurfaceEvent, Viewport};
pub use thumbnails::{Thumbnail, generate_thumbnails};
pub use types::*;
