//! Session storage: date-partitioned paths and image persistence.
//!
//! Layout:
//! ```text
//! {captured_dir}/
//! └── 2024-06-01/
//!     ├── 143015_1.jpg
//!     ├── 143015_2.jpg
//!     └── ...
//! {final_dir}/
//! └── 2024-06-01/
//!     └── 143015.png
//! ```
//!
//! Directories are created on demand, right before the first file that
//! needs them.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat};

use boothconf::PathsConfig;

use crate::error::FilesystemError;

/// Date and time components shared by every file of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStamp {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HHMMSS`
    pub time: String,
}

impl SessionStamp {
    pub fn from_datetime(at: &DateTime<Local>) -> Self {
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H%M%S").to_string(),
        }
    }
}

/// Where a session's files go.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    captured_dir: PathBuf,
    final_dir: PathBuf,
    extension: String,
}

impl SessionStorage {
    pub fn new(paths: &PathsConfig, extension: impl Into<String>) -> Self {
        Self {
            captured_dir: paths.captured_dir.clone(),
            final_dir: paths.final_dir.clone(),
            extension: extension.into(),
        }
    }

    /// `{captured_dir}/YYYY-MM-DD/HHMMSS_<index>.<ext>`
    pub fn shot_path(&self, stamp: &SessionStamp, index: u32) -> PathBuf {
        self.captured_dir
            .join(&stamp.date)
            .join(format!("{}_{}.{}", stamp.time, index, self.extension))
    }

    /// `{final_dir}/YYYY-MM-DD/HHMMSS.png`
    pub fn composite_path(&self, stamp: &SessionStamp) -> PathBuf {
        self.final_dir
            .join(&stamp.date)
            .join(format!("{}.png", stamp.time))
    }

    /// Create the parent directory of `path` if it does not exist yet.
    pub fn ensure_parent(&self, path: &Path) -> Result<(), FilesystemError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        fs::create_dir_all(parent).map_err(|source| FilesystemError {
            path: parent.to_path_buf(),
            source,
        })
    }
}

/// Encode an image in the format its path's extension names.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_for_path(image: &DynamicImage, path: &Path) -> Result<Vec<u8>, image::ImageError> {
    let format = ImageFormat::from_path(path)?;
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut out, format)?,
        _ => image.write_to(&mut out, format)?,
    }
    Ok(out.into_inner())
}

/// Sibling path a file is staged under before it is renamed into place.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write `bytes` next to `path` and rename them into place.
///
/// A reader of `path` sees either nothing or the whole file. The staging
/// file is removed if the write or the rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(path);
    let result = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

/// Encode and write an image; the parent directory must already exist.
pub fn write_image(image: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    let bytes = encode_for_path(image, path)?;
    write_atomic(path, &bytes).map_err(image::ImageError::IoError)
}
