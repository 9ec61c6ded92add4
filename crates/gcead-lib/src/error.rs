use std::path::PathBuf;
use thiserror::Error;

/// Reasons a recording session operation was refused.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("acquisition hardware is not available")]
    HardwareUnavailable,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("recording was cancelled")]
    Cancelled,

    #[error("hardware error: {0}")]
    Hardware(String),
}

/// Failure to read a project file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("project file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a controller action that is refused while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Applied,
    Unchanged,
    Refused,
}
