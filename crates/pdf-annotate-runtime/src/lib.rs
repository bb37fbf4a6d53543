use serde::Deserialize;
use std::path::PathBuf;

mod logger;
mod worker;

pub use logger::{AppLogger, LogEntry};
pub use worker::worker_task;

// Re-export types from the library crate
pub use pdf_annotate::{
    BlankSource, DocumentSource, EditorOptions, ObjectId, Point, Rotation, StyleChange,
    Thumbnail, Tool,
};

/// Commands sent to the worker.
///
/// Edit scripts use the same shape, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditorCommand {
    Open {
        path: PathBuf,
    },
    Navigate {
        position: usize,
    },
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
    RotateRight,
    RotateLeft,
    DeleteCurrent,
    MovePage {
        from: usize,
        to: usize,
    },
    AddTool {
        tool: Tool,
    },
    AddImage {
        path: PathBuf,
    },
    SetDrawing {
        enabled: bool,
    },
    CompleteStroke {
        points: Vec<Point>,
    },
    Select {
        id: Option<ObjectId>,
    },
    MoveObject {
        id: ObjectId,
        left: f32,
        top: f32,
    },
    EditText {
        id: ObjectId,
        text: String,
    },
    UpdateStyle {
        change: StyleChange,
    },
    DeleteSelected,
    Thumbnails,
    Export {
        dir: PathBuf,
    },
    Close,
}

/// Updates sent from the worker
#[derive(Debug, Clone)]
pub enum EditorUpdate {
    Loaded {
        page_count: usize,
    },
    PageDisplayed {
        position: usize,
        original_index: u32,
        rotation: Rotation,
        width: u32,
        height: u32,
    },
    /// Page order after a structural change, as source page numbers
    PagesChanged {
        order: Vec<u32>,
    },
    ObjectAdded {
        id: ObjectId,
    },
    SceneChanged {
        position: usize,
        object_count: usize,
    },
    DrawingMode {
        enabled: bool,
    },
    ThumbnailsReady {
        thumbnails: Vec<Thumbnail>,
    },
    Exported {
        path: PathBuf,
    },
    Closed,
    Error {
        message: String,
    },
}
