//! GPIO lines via the sysfs interface
//!
//! Each line is a `value` file under `<gpio_root>/gpio<N>/`. Exporting the
//! line and setting its direction is left to the OS image; this module only
//! reads and writes levels.

use std::fs;
use std::path::{Path, PathBuf};

use boothconf::HardwareConfig;

use crate::error::HardwareError;
use crate::hardware::{InputLine, OutputLine};

fn value_path(gpio_root: &Path, line: u32) -> PathBuf {
    gpio_root.join(format!("gpio{line}")).join("value")
}

/// A sysfs GPIO input.
#[derive(Debug, Clone)]
pub struct SysfsInputLine {
    name: String,
    path: PathBuf,
    active_low: bool,
}

impl SysfsInputLine {
    pub fn new(name: impl Into<String>, gpio_root: &Path, line: u32, active_low: bool) -> Self {
        Self {
            name: name.into(),
            path: value_path(gpio_root, line),
            active_low,
        }
    }

    /// Input on `line` under the configured root and input polarity.
    pub fn from_config(name: impl Into<String>, hw: &HardwareConfig, line: u32) -> Self {
        Self::new(name, &hw.gpio_root, line, hw.active_low)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InputLine for SysfsInputLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<bool, HardwareError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| HardwareError::Io {
            target: self.path.display().to_string(),
            source,
        })?;

        let level = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(HardwareError::BadValue {
                    target: self.path.display().to_string(),
                    value: other.to_string(),
                })
            }
        };

        Ok(level != self.active_low)
    }
}

/// A sysfs GPIO output.
#[derive(Debug, Clone)]
pub struct SysfsOutputLine {
    name: String,
    path: PathBuf,
    active_low: bool,
}

impl SysfsOutputLine {
    pub fn new(name: impl Into<String>, gpio_root: &Path, line: u32, active_low: bool) -> Self {
        Self {
            name: name.into(),
            path: value_path(gpio_root, line),
            active_low,
        }
    }

    /// Output on `line` under the configured root and output polarity.
    pub fn from_config(name: impl Into<String>, hw: &HardwareConfig, line: u32) -> Self {
        Self::new(name, &hw.gpio_root, line, hw.outputs_active_low)
    }
}

impl OutputLine for SysfsOutputLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, on: bool) -> Result<(), HardwareError> {
        let level = if on != self.active_low { "1" } else { "0" };
        fs::write(&self.path, level).map_err(|source| HardwareError::Io {
            target: self.path.display().to_string(),
            source,
        })
    }
}
