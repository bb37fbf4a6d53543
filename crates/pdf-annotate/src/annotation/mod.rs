//! Annotation scene model
//!
//! Objects are a tagged variant over annotation kinds. Each kind declares the
//! style attributes it accepts, so style changes never branch on type names.

mod color;
mod kinds;
mod scene;
mod style;
mod tools;

pub use color::Color;
pub use kinds::{AnnotationKind, ColorTarget, Point, StyleCapabilities, StyleChange};
pub use scene::{AnnotationObject, ObjectId, SNAPSHOT_VERSION, Snapshot};
pub use style::StyleState;
pub use tools::{NewObject, Tool, freehand_stroke, image_object};
