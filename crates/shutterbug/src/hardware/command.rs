//! Collaborators backed by external programs
//!
//! The camera drives `libcamera-still` / `libcamera-hello` (or whatever the
//! config names), the printer hands composites to `lp`, and power-off runs
//! `shutdown`. Arguments come from [`boothconf::HardwareConfig`].

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::HardwareError;
use crate::hardware::{Camera, PowerControl, Printer};
use crate::primitives::ColorMode;

fn build(argv: &[String]) -> Result<Command, HardwareError> {
    let (program, args) = argv.split_first().ok_or_else(|| HardwareError::Command {
        program: "<empty>".to_string(),
        message: "no command configured".to_string(),
    })?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

fn run(mut command: Command, program: &str) -> Result<(), HardwareError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| HardwareError::Command {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(HardwareError::Command {
            program: program.to_string(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

fn program_name(argv: &[String]) -> &str {
    argv.first().map(String::as_str).unwrap_or("<empty>")
}

/// Camera driven by a still-capture program and a long-running preview program.
#[derive(Debug)]
pub struct CommandCamera {
    capture_command: Vec<String>,
    preview_command: Vec<String>,
    scratch: PathBuf,
    mode: ColorMode,
    preview_hflip: bool,
    preview: Option<Child>,
}

impl CommandCamera {
    /// `scratch` is where the capture program writes each frame before it is
    /// decoded; the sequencer persists the decoded frame itself.
    pub fn new(
        capture_command: Vec<String>,
        preview_command: Vec<String>,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        Self {
            capture_command,
            preview_command,
            scratch: scratch.into(),
            mode: ColorMode::Color,
            preview_hflip: false,
            preview: None,
        }
    }

    /// Mirror the live preview. Captures are unaffected.
    pub fn with_preview_hflip(mut self, hflip: bool) -> Self {
        self.preview_hflip = hflip;
        self
    }

    fn preview_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.preview_hflip {
            args.push("--hflip".to_string());
        }
        if self.mode == ColorMode::Monochrome {
            args.push("--saturation".to_string());
            args.push("0".to_string());
        }
        args
    }

    fn capture_args(&self, width: u32, height: u32) -> Vec<String> {
        let mut args = vec![
            "--width".to_string(),
            width.to_string(),
            "--height".to_string(),
            height.to_string(),
        ];
        if self.mode == ColorMode::Monochrome {
            args.push("--saturation".to_string());
            args.push("0".to_string());
        }
        args.push("--output".to_string());
        args.push(self.scratch.display().to_string());
        args
    }
}

impl Camera for CommandCamera {
    fn set_color_mode(&mut self, mode: ColorMode) -> Result<(), HardwareError> {
        self.mode = mode;
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), HardwareError> {
        if self.preview.is_some() || self.preview_command.is_empty() {
            return Ok(());
        }

        let mut command = build(&self.preview_command)?;
        command.args(self.preview_args());
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HardwareError::Command {
                program: program_name(&self.preview_command).to_string(),
                message: e.to_string(),
            })?;

        debug!("preview started (pid {})", child.id());
        self.preview = Some(child);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), HardwareError> {
        let Some(mut child) = self.preview.take() else {
            return Ok(());
        };

        // The preview may already have exited on its own.
        if let Err(e) = child.kill() {
            debug!("preview kill: {}", e);
        }
        child.wait().map_err(|e| HardwareError::Command {
            program: program_name(&self.preview_command).to_string(),
            message: e.to_string(),
        })?;
        debug!("preview stopped");
        Ok(())
    }

    fn capture(&mut self, width: u32, height: u32) -> Result<DynamicImage, HardwareError> {
        let mut command = build(&self.capture_command)?;
        command.args(self.capture_args(width, height));
        run(command, program_name(&self.capture_command))?;

        image::open(&self.scratch).map_err(|source| HardwareError::Frame {
            path: self.scratch.clone(),
            source,
        })
    }

    fn close(&mut self) {
        if let Err(e) = self.stop_preview() {
            warn!("failed to stop preview on close: {}", e);
        }
    }
}

impl Drop for CommandCamera {
    fn drop(&mut self) {
        if let Some(mut child) = self.preview.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Printer that hands each composite to the print spooler.
#[derive(Debug, Clone)]
pub struct CommandPrinter {
    command: Vec<String>,
}

impl CommandPrinter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Printer for CommandPrinter {
    fn dispatch(&mut self, path: &Path) -> Result<(), HardwareError> {
        let mut command = build(&self.command)?;
        command.arg(path);
        run(command, program_name(&self.command))?;
        info!("sent {} to printer", path.display());
        Ok(())
    }
}

/// Power control that runs the configured power-off command.
#[derive(Debug, Clone)]
pub struct CommandPower {
    command: Vec<String>,
}

impl CommandPower {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl PowerControl for CommandPower {
    fn power_off(&mut self) -> Result<(), HardwareError> {
        info!("powering off host: {}", self.command.join(" "));
        let command = build(&self.command)?;
        run(command, program_name(&self.command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        let mut printer = CommandPrinter::new(vec![]);
        let err = printer.dispatch(Path::new("/tmp/x.png")).unwrap_err();
        assert!(matches!(err, HardwareError::Command { .. }));
    }

    #[test]
    fn test_capture_args_follow_mode() {
        let mut camera = CommandCamera::new(
            vec!["libcamera-still".to_string()],
            vec![],
            "/tmp/frame.jpg",
        );
        let color = camera.capture_args(640, 480);
        assert!(!color.contains(&"--saturation".to_string()));
        assert_eq!(color.last().map(String::as_str), Some("/tmp/frame.jpg"));

        camera.set_color_mode(ColorMode::Monochrome).unwrap();
        let mono = camera.capture_args(640, 480);
        assert!(mono.windows(2).any(|w| w[0] == "--saturation" && w[1] == "0"));
    }

    #[test]
    fn test_preview_hflip_only_mirrors_preview() {
        let mut camera = CommandCamera::new(
            vec!["libcamera-still".to_string()],
            vec!["libcamera-hello".to_string()],
            "/tmp/frame.jpg",
        );
        assert!(camera.preview_args().is_empty());

        camera = camera.with_preview_hflip(true);
        camera.set_color_mode(ColorMode::Monochrome).unwrap();
        assert_eq!(camera.preview_args(), vec!["--hflip", "--saturation", "0"]);
        assert!(!camera.capture_args(640, 480).contains(&"--hflip".to_string()));
    }

    #[test]
    fn test_preview_without_command_is_noop() {
        let mut camera = CommandCamera::new(vec![], vec![], "/tmp/frame.jpg");
        camera.start_preview().unwrap();
        camera.stop_preview().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status() {
        let mut power = CommandPower::new(vec!["false".to_string()]);
        assert!(matches!(power.power_off(), Err(HardwareError::Command { .. })));

        let mut power = CommandPower::new(vec!["true".to_string()]);
        assert!(power.power_off().is_ok());
    }
}
