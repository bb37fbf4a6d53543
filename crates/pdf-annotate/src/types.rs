use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to load document: {0}")]
    Load(String),
    #[error("Failed to render page {page}: {reason}")]
    RenderFailure { page: u32, reason: String },
    #[error("Malformed annotation snapshot: {0}")]
    SnapshotLoad(String),
    #[error("Export aborted at position {position}: {reason}")]
    ExportAbort { position: usize, reason: String },
    #[error("Cannot delete the last remaining page")]
    DeleteRejected,
    #[error("Position {position} is out of range (page count {len})")]
    InvalidPosition { position: usize, len: usize },
    #[error("Another operation is already in progress")]
    Busy,
    #[error("No font available for text annotations: {0}")]
    FontUnavailable(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;

/// Rotation applied on top of a page's stored rotation.
///
/// Only quarter turns are representable; values are kept in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Build a rotation from any multiple of 90 degrees, positive or negative.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Rotation(degrees.rem_euclid(360) as u16))
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Compose two rotations, wrapping at 360.
    pub fn compose(self, other: Rotation) -> Rotation {
        Rotation((self.0 + other.0) % 360)
    }

    /// Apply a signed delta in degrees. Deltas that are not quarter turns are ignored.
    pub fn turned(self, delta: i32) -> Rotation {
        Rotation::from_degrees(self.0 as i32 + delta).unwrap_or(self)
    }

    /// Whether width and height swap when this rotation is applied.
    pub fn is_sideways(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        Rotation::from_degrees(value)
            .ok_or_else(|| format!("rotation must be a multiple of 90, got {}", value))
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.0 as i32
    }
}
