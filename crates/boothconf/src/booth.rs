//! Booth behavior - timing, thresholds, quota and print geometry.
//!
//! These values are read once at startup and handed to the control core as
//! an immutable value. Nothing mutates them while the booth runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capture session timing and output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exposures per session.
    pub shot_count: u32,

    /// Countdown before each exposure, in whole seconds.
    pub countdown_secs: u32,

    /// Pause after each exposure.
    pub inter_shot_delay_ms: u64,

    pub capture_width: u32,
    pub capture_height: u32,

    /// Extension (and encoder) for raw shots: jpg, jpeg or png.
    pub image_extension: String,

    /// No printing and no power-off; a long shutdown press closes the
    /// process instead.
    pub test_mode: bool,
}

impl SessionConfig {
    pub fn inter_shot_delay(&self) -> Duration {
        Duration::from_millis(self.inter_shot_delay_ms)
    }

    /// Whether finished composites are sent to the printer.
    pub fn printing_enabled(&self) -> bool {
        !self.test_mode
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shot_count: 4,
            countdown_secs: 5,
            inter_shot_delay_ms: 500,
            capture_width: 1440,
            capture_height: 1080,
            image_extension: "jpg".to_string(),
            test_mode: true,
        }
    }
}

/// Input sampling period and long-press thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Control loop period.
    pub tick_ms: u64,

    /// Shutdown button held at least this many ticks quits on release.
    pub quit_ticks: u32,

    /// Shutdown button held at least this many ticks powers off on release.
    pub shutdown_ticks: u32,
}

impl InputConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            quit_ticks: 20,
            shutdown_ticks: 50,
        }
    }
}

/// Print quota: a warning is raised every `print_quota` prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub print_quota: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { print_quota: 25 }
    }
}

/// Print canvas and thumbnail geometry, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub print_width: u32,
    pub print_height: u32,

    /// Thumbnail size after the fixed resize, before cropping.
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,

    /// Thumbnail height after the centered vertical crop.
    pub thumbnail_height_cropped: u32,

    /// Gap between rows, and between the top margin and the first row.
    pub padding: u32,

    pub top_padding: u32,

    /// X position of the left column. The right column is flush right.
    pub left_offset: u32,
}

impl LayoutConfig {
    /// X position of the right column.
    pub fn right_column_x(&self) -> u32 {
        self.print_width.saturating_sub(self.thumbnail_width)
    }

    /// Y position of the first row. Saturates on absurd padding.
    pub fn first_row_y(&self) -> u32 {
        self.top_padding.saturating_add(self.padding)
    }

    /// Distance between the tops of consecutive rows.
    pub fn row_stride(&self) -> u32 {
        self.thumbnail_height_cropped.saturating_add(self.padding)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            print_width: 960,
            print_height: 1520,
            thumbnail_width: 470,
            thumbnail_height: 352,
            thumbnail_height_cropped: 322,
            padding: 10,
            top_padding: 25,
            left_offset: 10,
        }
    }
}

/// Everything that shapes booth behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoothSettings {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}
