//! Hardware collaborators
//!
//! The control core only talks to the outside world through these traits.
//! Three families of implementations ship with the crate:
//!
//! - [`sysfs`]: GPIO lines through `/sys/class/gpio`
//! - [`command`]: camera, printer and power-off via external programs
//! - [`sim`]: in-memory stand-ins for tests and `--simulate` runs
//!
//! Everything runs on the single control thread, so none of the traits
//! require `Send`.

pub mod command;
pub mod sim;
pub mod sysfs;

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::HardwareError;
use crate::primitives::ColorMode;

/// A digital input sampled once per tick.
pub trait InputLine {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Current logical level (`true` = pressed).
    fn read(&mut self) -> Result<bool, HardwareError>;
}

/// A digital output (illumination, warning indicator).
pub trait OutputLine {
    fn name(&self) -> &str;

    fn set(&mut self, on: bool) -> Result<(), HardwareError>;
}

/// The booth camera.
pub trait Camera {
    fn set_color_mode(&mut self, mode: ColorMode) -> Result<(), HardwareError>;

    fn start_preview(&mut self) -> Result<(), HardwareError>;

    fn stop_preview(&mut self) -> Result<(), HardwareError>;

    /// Commit one still exposure at the given resolution.
    fn capture(&mut self, width: u32, height: u32) -> Result<DynamicImage, HardwareError>;

    /// Release the device. Called once when the booth terminates.
    fn close(&mut self) {}
}

/// Observable countdown readout shown before each exposure.
pub trait CountdownDisplay {
    fn show(&mut self, shot: u32, remaining_secs: u32);

    fn clear(&mut self);
}

/// Print spooler. Dispatch is fire-and-forget from the booth's point of view.
pub trait Printer {
    fn dispatch(&mut self, path: &Path) -> Result<(), HardwareError>;
}

/// Host power control, used on the power-off termination path.
pub trait PowerControl {
    fn power_off(&mut self) -> Result<(), HardwareError>;
}

/// Countdown readout that writes to the log (default when no display is attached)
#[derive(Debug, Default)]
pub struct LoggingCountdown;

impl CountdownDisplay for LoggingCountdown {
    fn show(&mut self, shot: u32, remaining_secs: u32) {
        info!("shot {}: {}...", shot, remaining_secs);
    }

    fn clear(&mut self) {
        debug!("countdown cleared");
    }
}

/// Power control used in test mode: the power-off path closes the process
/// instead of touching the host.
#[derive(Debug, Default)]
pub struct GracefulClose;

impl PowerControl for GracefulClose {
    fn power_off(&mut self) -> Result<(), HardwareError> {
        info!("test mode: skipping host power-off, closing booth only");
        Ok(())
    }
}

/// Printer used when printing is disabled. Never invoked by the quota
/// tracker in that mode, but keeps the rig complete.
#[derive(Debug, Default)]
pub struct NoPrinter;

impl Printer for NoPrinter {
    fn dispatch(&mut self, path: &Path) -> Result<(), HardwareError> {
        debug!("printing disabled, not dispatching {}", path.display());
        Ok(())
    }
}

/// Every process-wide hardware resource the session controller owns.
pub struct BoothRig {
    pub shutdown: Box<dyn InputLine>,
    pub start_color: Box<dyn InputLine>,
    pub start_mono: Box<dyn InputLine>,
    pub light: Box<dyn OutputLine>,
    pub warning_light: Option<Box<dyn OutputLine>>,
    pub camera: Box<dyn Camera>,
    pub countdown: Box<dyn CountdownDisplay>,
    pub printer: Box<dyn Printer>,
    pub power: Box<dyn PowerControl>,
}

impl std::fmt::Debug for BoothRig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoothRig")
            .field("shutdown", &self.shutdown.name())
            .field("start_color", &self.start_color.name())
            .field("start_mono", &self.start_mono.name())
            .field("light", &self.light.name())
            .field(
                "warning_light",
                &self.warning_light.as_ref().map(|line| line.name()),
            )
            .finish_non_exhaustive()
    }
}
