//! Host Boundary - the image editor's object model
//!
//! Everything that touches pixels lives on the other side of this trait.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Opaque handle to an image owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeType {
    ExpandAsNecessary,
    ClipToImage,
    ClipToBottomLayer,
    FlattenImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Interactive,
    Noninteractive,
    WithLastVals,
}

/// Status code returned by host procedures, and by this plugin to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdbStatus {
    ExecutionError,
    CallingError,
    PassThrough,
    Success,
    Cancel,
}

impl PdbStatus {
    pub fn is_success(self) -> bool {
        self == PdbStatus::Success
    }
}

impl fmt::Display for PdbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PdbStatus::ExecutionError => "EXECUTION_ERROR",
            PdbStatus::CallingError => "CALLING_ERROR",
            PdbStatus::PassThrough => "PASS_THROUGH",
            PdbStatus::Success => "SUCCESS",
            PdbStatus::Cancel => "CANCEL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Image not found: {0}")]
    ImageNotFound(ImageId),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Host call failed: {0}")]
    CallFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn call_failed<T: Into<String>>(msg: T) -> Self {
        Self::CallFailed(msg.into())
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// The calls the export flow makes into the host application.
///
/// Calls are synchronous and made from a single thread.
pub trait Host {
    /// Create a new image that is a copy of `image`.
    fn duplicate(&self, image: ImageId) -> HostResult<ImageId>;

    fn merge_visible_layers(&self, image: ImageId, merge: MergeType) -> HostResult<()>;

    /// On-disk path of the image, if it was loaded from or saved to a file.
    fn image_file(&self, image: ImageId) -> Option<PathBuf>;

    /// Whether a procedure with this name is registered.
    fn lookup_procedure(&self, name: &str) -> bool;

    /// Run a procedure synchronously and return its status.
    fn run_procedure(&self, name: &str, config: &crate::backend::ProcedureConfig) -> HostResult<PdbStatus>;

    fn delete_image(&self, image: ImageId) -> HostResult<()>;

    /// Post a message to the user-facing message channel.
    fn message(&self, text: &str);

    fn current_dir(&self) -> HostResult<PathBuf> {
        Ok(std::env::current_dir()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_host_names() {
        assert_eq!(PdbStatus::Success.to_string(), "SUCCESS");
        assert_eq!(PdbStatus::ExecutionError.to_string(), "EXECUTION_ERROR");
    }

    #[test]
    fn test_only_success_is_success() {
        assert!(PdbStatus::Success.is_success());
        assert!(!PdbStatus::PassThrough.is_success());
        assert!(!PdbStatus::Cancel.is_success());
    }
}
