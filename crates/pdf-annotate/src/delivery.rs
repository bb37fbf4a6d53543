//! Output delivery and user-facing notices

use crate::types::*;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of a delivered result: `<Product>_<Operation>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    pub product: String,
    pub operation: String,
    pub extension: String,
}

impl OutputName {
    pub fn new(
        product: impl Into<String>,
        operation: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            operation: operation.into(),
            extension: extension.into(),
        }
    }

    /// Name of an exported, edited PDF
    pub fn edited(product: impl Into<String>) -> Self {
        Self::new(product, "Edited", "pdf")
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}.{}", self.product, self.operation, self.extension)
    }
}

/// Write `bytes` into `dir` under `name`, returning the full path
pub async fn deliver(bytes: &[u8], dir: impl AsRef<Path>, name: &OutputName) -> Result<PathBuf> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name.to_string());
    tokio::fs::write(&path, bytes).await?;
    log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// How a failure is presented to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Nothing to work on, e.g. no or unreadable input
    MissingInput(String),
    /// The action was refused and nothing changed
    Rejected(String),
    /// The operation ran and failed
    ProcessingFailed(String),
}

impl UserNotice {
    pub fn from_error(error: &AnnotateError) -> Self {
        let message = error.to_string();
        match error {
            AnnotateError::Load(_) => UserNotice::MissingInput(message),
            AnnotateError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                UserNotice::MissingInput(message)
            }
            AnnotateError::DeleteRejected
            | AnnotateError::InvalidPosition { .. }
            | AnnotateError::Busy => UserNotice::Rejected(message),
            _ => UserNotice::ProcessingFailed(message),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UserNotice::MissingInput(m) | UserNotice::Rejected(m) | UserNotice::ProcessingFailed(m) => m,
        }
    }
}

impl fmt::Display for UserNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserNotice::MissingInput(m) => write!(f, "Missing input: {}", m),
            UserNotice::Rejected(m) => write!(f, "Not allowed: {}", m),
            UserNotice::ProcessingFailed(m) => write!(f, "Processing failed: {}", m),
        }
    }
}
