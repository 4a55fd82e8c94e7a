//! Infrastructure configuration - where things live and which wires they use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem locations for captured shots, composites and the print background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for raw shots, partitioned as `YYYY-MM-DD/HHMMSS_<n>.<ext>`.
    /// Default: ~/Photobooth/captured
    pub captured_dir: PathBuf,

    /// Root for print composites, partitioned as `YYYY-MM-DD/HHMMSS.png`.
    /// Default: ~/Photobooth/final
    pub final_dir: PathBuf,

    /// Print background; must match the layout canvas size exactly.
    /// Default: ~/Photobooth/assets/print-background.png
    pub background: PathBuf,
}

impl PathsConfig {
    fn booth_root() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join("Photobooth"))
            .unwrap_or_else(|| PathBuf::from("Photobooth"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = Self::booth_root();
        Self {
            captured_dir: root.join("captured"),
            final_dir: root.join("final"),
            background: root.join("assets/print-background.png"),
        }
    }
}

/// GPIO line numbers and the external programs the booth shells out to.
///
/// Lines are addressed through the sysfs GPIO interface and must already be
/// exported with the right direction; line setup belongs to the OS image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// sysfs GPIO root. Default: /sys/class/gpio
    pub gpio_root: PathBuf,

    /// Button inputs read a low electrical level as pressed.
    pub active_low: bool,

    /// Light outputs drive a low electrical level to switch on.
    pub outputs_active_low: bool,

    pub shutdown_line: u32,
    pub start_color_line: u32,
    pub start_mono_line: u32,

    /// Illumination output (required).
    pub light_line: u32,

    /// Optional quota warning indicator output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_line: Option<u32>,

    /// Still capture program and leading arguments. The camera adapter
    /// appends resolution, color and output-path arguments.
    pub capture_command: Vec<String>,

    /// Long-running live preview program, killed when the preview stops.
    pub preview_command: Vec<String>,

    /// Mirror the live preview horizontally. Captured frames are never
    /// mirrored.
    pub preview_hflip: bool,

    /// Print spooler invocation; the composite path is appended.
    pub print_command: Vec<String>,

    /// Power-off invocation used on a long shutdown press outside test mode.
    pub poweroff_command: Vec<String>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            active_low: false,
            outputs_active_low: false,
            shutdown_line: 4,
            start_color_line: 22,
            start_mono_line: 27,
            light_line: 17,
            warning_line: None,
            capture_command: vec![
                "libcamera-still".to_string(),
                "--nopreview".to_string(),
                "--immediate".to_string(),
            ],
            preview_command: vec![
                "libcamera-hello".to_string(),
                "--timeout".to_string(),
                "0".to_string(),
            ],
            preview_hflip: true,
            print_command: vec!["lp".to_string()],
            poweroff_command: vec![
                "sudo".to_string(),
                "shutdown".to_string(),
                "-h".to_string(),
                "now".to_string(),
            ],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive string.
    /// Default: info
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Infrastructure configuration - fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InfraConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub hardware: HardwareConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
