//! Composite layout engine
//!
//! Places each session's thumbnails onto the print background in two
//! identical columns, shot 1 at the top. For the stock 960x1520 canvas:
//!
//! ```text
//!   x=10              x=490
//!   ┌───────────┐     ┌───────────┐   y=35
//!   │  shot 1   │     │  shot 1   │
//!   └───────────┘     └───────────┘
//!   ┌───────────┐     ┌───────────┐   y=367
//!   │  shot 2   │     │  shot 2   │
//!   └───────────┘     └───────────┘
//!        ...               ...
//! ```
//!
//! Composing is pure: the same thumbnails and background always produce the
//! same pixels. Pasting overwrites, it never blends.

use std::path::{Path, PathBuf};

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use boothconf::LayoutConfig;

use crate::capture::CaptureShot;
use crate::error::{LayoutError, ResourceLoadError};

/// Which of the two identical columns a placement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
}

/// Top-left corner of one pasted thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub shot: u32,
    pub column: Column,
    pub x: u32,
    pub y: u32,
}

/// A print background known to match the canvas size.
#[derive(Debug, Clone)]
pub struct Background {
    path: PathBuf,
    canvas: RgbaImage,
}

impl Background {
    /// Check size and normalize to RGBA8.
    pub fn from_image(
        path: impl Into<PathBuf>,
        image: DynamicImage,
        layout: &LayoutConfig,
    ) -> Result<Self, ResourceLoadError> {
        let path = path.into();
        if (image.width(), image.height()) != (layout.print_width, layout.print_height) {
            return Err(ResourceLoadError::WrongSize {
                path,
                width: layout.print_width,
                height: layout.print_height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }
        Ok(Self {
            path,
            canvas: image.to_rgba8(),
        })
    }

    /// An opaque white canvas of the configured size.
    pub fn blank(layout: &LayoutConfig) -> Self {
        Self {
            path: PathBuf::new(),
            canvas: RgbaImage::from_pixel(
                layout.print_width,
                layout.print_height,
                Rgba([255, 255, 255, 255]),
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }
}

/// Load and validate the print background.
pub fn load_background(path: &Path, layout: &LayoutConfig) -> Result<Background, ResourceLoadError> {
    if !path.is_file() {
        return Err(ResourceLoadError::Missing(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|source| ResourceLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    Background::from_image(path, image, layout)
}

/// Write a blank canvas operators can use as a background template.
pub fn write_template(layout: &LayoutConfig, path: &Path) -> Result<(), image::ImageError> {
    Background::blank(layout)
        .canvas
        .save_with_format(path, ImageFormat::Png)
}

/// A finished print, not yet on disk.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    pub canvas: RgbaImage,
    pub placements: Vec<Placement>,
    pub output_path: PathBuf,
}

impl CompositeImage {
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut out = std::io::Cursor::new(Vec::new());
        self.canvas.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Computes placements and pastes thumbnails for a fixed shot count.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    layout: LayoutConfig,
    shot_count: u32,
}

impl LayoutEngine {
    pub fn new(layout: LayoutConfig, shot_count: u32) -> Self {
        Self { layout, shot_count }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn shot_count(&self) -> u32 {
        self.shot_count
    }

    /// Y offset of each row, top to bottom.
    pub fn row_offsets(&self) -> Vec<u32> {
        (0..self.shot_count)
            .map(|row| {
                self.layout
                    .first_row_y()
                    .saturating_add(row.saturating_mul(self.layout.row_stride()))
            })
            .collect()
    }

    /// Every paste in order: shot by shot, left column before right.
    pub fn placements(&self) -> Vec<Placement> {
        let left = self.layout.left_offset;
        let right = self.layout.right_column_x();

        self.row_offsets()
            .into_iter()
            .zip(1..)
            .flat_map(|(y, shot)| {
                [(Column::Left, left), (Column::Right, right)]
                    .map(|(column, x)| Placement { shot, column, x, y })
            })
            .collect()
    }

    /// Paste every shot's thumbnail onto a copy of the background.
    pub fn compose(
        &self,
        shots: &[CaptureShot],
        background: &Background,
        output_path: impl Into<PathBuf>,
    ) -> Result<CompositeImage, LayoutError> {
        if shots.len() != self.shot_count as usize {
            return Err(LayoutError::ShotCount {
                expected: self.shot_count,
                actual: shots.len(),
            });
        }

        let (bg_width, bg_height) = background.canvas.dimensions();
        if (bg_width, bg_height) != (self.layout.print_width, self.layout.print_height) {
            return Err(ResourceLoadError::WrongSize {
                path: background.path.clone(),
                width: self.layout.print_width,
                height: self.layout.print_height,
                actual_width: bg_width,
                actual_height: bg_height,
            }
            .into());
        }

        let expected = (
            self.layout.thumbnail_width,
            self.layout.thumbnail_height_cropped,
        );
        for shot in shots {
            let actual = shot.thumbnail.dimensions();
            if actual != expected {
                return Err(LayoutError::ThumbnailSize {
                    index: shot.index,
                    width: expected.0,
                    height: expected.1,
                    actual_width: actual.0,
                    actual_height: actual.1,
                });
            }
        }

        let mut canvas = background.canvas.clone();
        let placements = self.placements();
        for placement in &placements {
            let shot = &shots[(placement.shot - 1) as usize];
            imageops::replace(
                &mut canvas,
                &shot.thumbnail,
                i64::from(placement.x),
                i64::from(placement.y),
            );
        }
        debug!("composed {} thumbnails", placements.len());

        Ok(CompositeImage {
            canvas,
            placements,
            output_path: output_path.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use pretty_assertions::assert_eq;

    fn shot(index: u32, layout: &LayoutConfig) -> CaptureShot {
        let shade = (index * 50) as u8;
        let thumbnail = RgbaImage::from_pixel(
            layout.thumbnail_width,
            layout.thumbnail_height_cropped,
            Rgba([shade, 255 - shade, 128, 255]),
        );
        CaptureShot {
            index,
            image: DynamicImage::ImageRgba8(thumbnail.clone()),
            thumbnail,
            path: PathBuf::from(format!("/tmp/{index}.jpg")),
            captured_at: Local::now(),
        }
    }

    fn shots(n: u32, layout: &LayoutConfig) -> Vec<CaptureShot> {
        (1..=n).map(|i| shot(i, layout)).collect()
    }

    #[test]
    fn test_reference_row_offsets() {
        let engine = LayoutEngine::new(LayoutConfig::default(), 4);
        assert_eq!(engine.row_offsets(), vec![35, 367, 699, 1031]);
    }

    #[test]
    fn test_row_offsets_saturate_on_absurd_geometry() {
        let layout = LayoutConfig {
            top_padding: u32::MAX - 10,
            ..LayoutConfig::default()
        };
        let engine = LayoutEngine::new(layout, 4);
        assert_eq!(engine.layout().top_padding, u32::MAX - 10);
        assert_eq!(engine.row_offsets(), vec![u32::MAX; 4]);
    }

    #[test]
    fn test_placements_cover_both_columns_in_order() {
        let engine = LayoutEngine::new(LayoutConfig::default(), 4);
        let placements = engine.placements();
        assert_eq!(placements.len(), 8);
        assert_eq!(
            placements[..2],
            [
                Placement {
                    shot: 1,
                    column: Column::Left,
                    x: 10,
                    y: 35
                },
                Placement {
                    shot: 1,
                    column: Column::Right,
                    x: 490,
                    y: 35
                },
            ]
        );
        assert_eq!(placements[7].shot, 4);
        assert_eq!(placements[7].y, 1031);
    }

    #[test]
    fn test_compose_pastes_every_thumbnail_twice() {
        let layout = LayoutConfig::default();
        let engine = LayoutEngine::new(layout.clone(), 4);
        let shots = shots(4, &layout);

        let composite = engine
            .compose(&shots, &Background::blank(&layout), "/tmp/out.png")
            .unwrap();

        for placement in &composite.placements {
            let expected = shots[(placement.shot - 1) as usize].thumbnail.get_pixel(0, 0);
            assert_eq!(composite.canvas.get_pixel(placement.x, placement.y), expected);
            assert_eq!(
                composite
                    .canvas
                    .get_pixel(placement.x + 469, placement.y + 321),
                expected
            );
        }
        // Gap between rows keeps the background.
        assert_eq!(composite.canvas.get_pixel(10, 360), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_paste_overwrites_alpha() {
        let layout = LayoutConfig::default();
        let engine = LayoutEngine::new(layout.clone(), 1);
        let mut clear = shot(1, &layout);
        clear.thumbnail = RgbaImage::from_pixel(470, 322, Rgba([0, 0, 0, 0]));

        let composite = engine
            .compose(&[clear], &Background::blank(&layout), "/tmp/out.png")
            .unwrap();
        assert_eq!(composite.canvas.get_pixel(10, 35), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let layout = LayoutConfig::default();
        let engine = LayoutEngine::new(layout.clone(), 4);
        let shots = shots(4, &layout);
        let background = Background::blank(&layout);

        let a = engine.compose(&shots, &background, "/tmp/a.png").unwrap();
        let b = engine.compose(&shots, &background, "/tmp/a.png").unwrap();
        assert_eq!(a.encode_png().unwrap(), b.encode_png().unwrap());
    }

    #[test]
    fn test_wrong_shot_count_is_rejected() {
        let layout = LayoutConfig::default();
        let engine = LayoutEngine::new(layout.clone(), 4);
        let err = engine
            .compose(&shots(3, &layout), &Background::blank(&layout), "/tmp/x.png")
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::ShotCount {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_wrong_thumbnail_size_is_rejected() {
        let layout = LayoutConfig::default();
        let engine = LayoutEngine::new(layout.clone(), 2);
        let mut shots = shots(2, &layout);
        shots[1].thumbnail = RgbaImage::new(470, 352);

        let err = engine
            .compose(&shots, &Background::blank(&layout), "/tmp/x.png")
            .unwrap_err();
        assert!(matches!(err, LayoutError::ThumbnailSize { index: 2, .. }));
    }

    #[test]
    fn test_load_background_errors() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            load_background(&missing, &layout),
            Err(ResourceLoadError::Missing(_))
        ));

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"definitely not a png").unwrap();
        assert!(matches!(
            load_background(&corrupt, &layout),
            Err(ResourceLoadError::Corrupt { .. })
        ));

        let small = dir.path().join("small.png");
        RgbaImage::new(100, 100).save(&small).unwrap();
        assert!(matches!(
            load_background(&small, &layout),
            Err(ResourceLoadError::WrongSize {
                actual_width: 100,
                ..
            })
        ));
    }

    #[test]
    fn test_template_loads_as_background() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let path = dir.path().join("template.png");

        write_template(&layout, &path).unwrap();
        let background = load_background(&path, &layout).unwrap();
        assert_eq!(background.canvas().dimensions(), (960, 1520));
        assert_eq!(background.path(), path.as_path());
    }

    #[test]
    fn test_rgb_background_is_normalized() {
        let layout = LayoutConfig::default();
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::new(960, 1520));
        let background = Background::from_image("/tmp/bg.jpg", rgb, &layout).unwrap();
        assert_eq!(background.canvas().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }
}
