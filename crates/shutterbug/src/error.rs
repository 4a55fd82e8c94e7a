//! Error types for the booth control core.
//!
//! None of these are retried. A session that hits any of them is abandoned
//! before print dispatch and the controller drops back to idle.

use std::path::PathBuf;

/// Failure talking to a hardware collaborator (GPIO line, camera program, ...).
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("I/O on {target}: {source}")]
    Io {
        target: String,
        source: std::io::Error,
    },

    #[error("Unexpected value {value:?} read from {target}")]
    BadValue { target: String, value: String },

    #[error("{program} failed: {message}")]
    Command { program: String, message: String },

    #[error("Failed to decode camera frame from {path}: {source}")]
    Frame {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Simulated fault: {0}")]
    Simulated(String),
}

/// The print background is missing, unreadable, or the wrong size.
#[derive(Debug, thiserror::Error)]
pub enum ResourceLoadError {
    #[error("Background asset not found at {0}")]
    Missing(PathBuf),

    #[error("Background asset {path} could not be decoded: {source}")]
    Corrupt {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Background asset {path} is {actual_width}x{actual_height}, canvas is {width}x{height}")]
    WrongSize {
        path: PathBuf,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// A directory or file could not be created on disk.
#[derive(Debug, thiserror::Error)]
#[error("Filesystem error at {path}: {source}")]
pub struct FilesystemError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// A capture session was aborted.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Exposure {index} failed: {source}")]
    Exposure { index: u32, source: HardwareError },

    #[error("Failed to write shot {index} to {path}: {source}")]
    Persist {
        index: u32,
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Compositing could not produce a print.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    #[error("Expected {expected} shots, got {actual}")]
    ShotCount { expected: u32, actual: usize },

    #[error("Thumbnail for shot {index} is {actual_width}x{actual_height}, expected {width}x{height}")]
    ThumbnailSize {
        index: u32,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Everything that can end a session cycle early.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error("Failed to write composite {path}: {source}")]
    CompositeWrite {
        path: PathBuf,
        source: image::ImageError,
    },
}
