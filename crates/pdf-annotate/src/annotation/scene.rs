//! Serializable annotation scenes

use super::kinds::AnnotationKind;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Identifies an object within one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

/// One drawable placed on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationObject {
    pub id: ObjectId,
    pub left: f32,
    pub top: f32,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl AnnotationObject {
    pub fn new(id: ObjectId, left: f32, top: f32, kind: AnnotationKind) -> Self {
        Self {
            id,
            left,
            top,
            kind,
        }
    }
}

/// The full vector scene of one page entry.
///
/// `width`/`height` record the surface size the scene was authored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub width: f32,
    pub height: f32,
    pub objects: Vec<AnnotationObject>,
}

impl Snapshot {
    pub fn new(width: f32, height: f32, objects: Vec<AnnotationObject>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            width,
            height,
            objects,
        }
    }

    pub fn empty(width: f32, height: f32) -> Self {
        Self::new(width, height, Vec::new())
    }

    /// A scene with no objects produces no overlay
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| AnnotateError::SnapshotLoad(format!("Failed to serialize scene: {}", e)))
    }

    /// Parse and validate a serialized scene
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| AnnotateError::SnapshotLoad(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject scenes a surface cannot load
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(AnnotateError::SnapshotLoad(format!(
                "Unsupported scene version {}",
                self.version
            )));
        }
        if !is_size(self.width) || !is_size(self.height) {
            return Err(AnnotateError::SnapshotLoad(format!(
                "Invalid scene size {}x{}",
                self.width, self.height
            )));
        }

        for object in &self.objects {
            let positions_ok = object.left.is_finite() && object.top.is_finite();
            let metrics_ok = object.kind.metrics().into_iter().all(is_size);
            let points_ok = match &object.kind {
                AnnotationKind::Freehand { points, .. } => {
                    points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
                }
                AnnotationKind::Arrow { tip, .. } => tip.x.is_finite() && tip.y.is_finite(),
                AnnotationKind::Image { png, .. } => !png.is_empty(),
                _ => true,
            };
            if !(positions_ok && metrics_ok && points_ok) {
                return Err(AnnotateError::SnapshotLoad(format!(
                    "Invalid {} object {}",
                    object.kind.name(),
                    object.id.0
                )));
            }
        }

        Ok(())
    }

    /// Largest object id in the scene
    pub fn max_object_id(&self) -> Option<ObjectId> {
        self.objects.iter().map(|o| o.id).max()
    }
}

fn is_size(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}
