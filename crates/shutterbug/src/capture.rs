//! Capture sequencer
//!
//! Runs the fixed series of exposures for one session. Each exposure:
//!
//! 1. color mode, light on, preview on
//! 2. countdown, one readout update per second
//! 3. preview off, light off, still exposure
//! 4. persist raw shot, derive thumbnail
//! 5. inter-shot pause
//!
//! The first failure aborts the whole series; the caller never sees a
//! partial shot list. Sleeps block the control thread and cannot be
//! interrupted.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, info, warn};

use boothconf::{LayoutConfig, SessionConfig};

use crate::error::{CaptureError, HardwareError};
use crate::hardware::{Camera, CountdownDisplay, OutputLine};
use crate::primitives::ColorMode;
use crate::scheduler::Clock;
use crate::storage::{write_image, SessionStamp, SessionStorage};

/// One persisted exposure.
#[derive(Debug, Clone)]
pub struct CaptureShot {
    /// 1-based position in the session.
    pub index: u32,
    pub image: DynamicImage,
    pub thumbnail: RgbaImage,
    pub path: PathBuf,
    /// When this shot's exposure sequence began.
    pub captured_at: DateTime<Local>,
}

/// The hardware a capture session borrows from the controller.
pub struct CaptureRig<'a> {
    pub camera: &'a mut dyn Camera,
    pub light: &'a mut dyn OutputLine,
    pub countdown: &'a mut dyn CountdownDisplay,
}

/// Resize to the fixed thumbnail size, then crop the middle rows.
pub fn make_thumbnail(image: &DynamicImage, layout: &LayoutConfig) -> RgbaImage {
    let resized = image.resize_exact(
        layout.thumbnail_width,
        layout.thumbnail_height,
        FilterType::Triangle,
    );
    let top = layout
        .thumbnail_height
        .saturating_sub(layout.thumbnail_height_cropped)
        / 2;
    resized
        .crop_imm(
            0,
            top,
            layout.thumbnail_width,
            layout.thumbnail_height_cropped,
        )
        .to_rgba8()
}

/// Times and persists a session's exposures.
#[derive(Debug, Clone)]
pub struct CaptureSequencer {
    session: SessionConfig,
    layout: LayoutConfig,
    storage: SessionStorage,
}

impl CaptureSequencer {
    pub fn new(session: SessionConfig, layout: LayoutConfig, storage: SessionStorage) -> Self {
        Self {
            session,
            layout,
            storage,
        }
    }

    /// Capture `shot_count` exposures in `mode`, or nothing at all.
    pub fn capture_session(
        &self,
        shot_count: u32,
        mode: ColorMode,
        rig: &mut CaptureRig<'_>,
        clock: &dyn Clock,
        stamp: &SessionStamp,
    ) -> Result<Vec<CaptureShot>, CaptureError> {
        info!("capturing {} {} shots", shot_count, mode);
        let mut shots = Vec::with_capacity(shot_count as usize);

        for index in 1..=shot_count {
            match self.capture_one(index, mode, rig, clock, stamp) {
                Ok(shot) => {
                    shots.push(shot);
                    clock.sleep(self.session.inter_shot_delay());
                }
                Err(e) => {
                    Self::recover(rig);
                    return Err(e);
                }
            }
        }

        Ok(shots)
    }

    fn capture_one(
        &self,
        index: u32,
        mode: ColorMode,
        rig: &mut CaptureRig<'_>,
        clock: &dyn Clock,
        stamp: &SessionStamp,
    ) -> Result<CaptureShot, CaptureError> {
        let exposure = |source: HardwareError| CaptureError::Exposure { index, source };
        let captured_at = clock.now();

        rig.camera.set_color_mode(mode).map_err(exposure)?;
        rig.light.set(true).map_err(exposure)?;
        rig.camera.start_preview().map_err(exposure)?;

        for remaining in (1..=self.session.countdown_secs).rev() {
            rig.countdown.show(index, remaining);
            clock.sleep(Duration::from_secs(1));
        }
        rig.countdown.clear();

        rig.camera.stop_preview().map_err(exposure)?;
        rig.light.set(false).map_err(exposure)?;

        let image = rig
            .camera
            .capture(self.session.capture_width, self.session.capture_height)
            .map_err(exposure)?;

        let path = self.storage.shot_path(stamp, index);
        self.storage.ensure_parent(&path)?;
        write_image(&image, &path).map_err(|source| CaptureError::Persist {
            index,
            path: path.clone(),
            source,
        })?;
        debug!("shot {} saved to {}", index, path.display());

        let thumbnail = make_thumbnail(&image, &self.layout);

        Ok(CaptureShot {
            index,
            image,
            thumbnail,
            path,
            captured_at,
        })
    }

    /// Leave the rig dark and idle after a failed exposure.
    fn recover(rig: &mut CaptureRig<'_>) {
        rig.countdown.clear();
        if let Err(e) = rig.camera.stop_preview() {
            warn!("failed to stop preview after capture error: {}", e);
        }
        if let Err(e) = rig.light.set(false) {
            warn!("failed to switch light off after capture error: {}", e);
        }
    }
}
