//! Configuration loading for the shutterbug photo booth.
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): where files live, which GPIO lines
//!   carry which signal, which programs to shell out to, log level.
//!
//! - **Booth** (`BoothSettings`): how the booth behaves - shot count and
//!   timing, long-press thresholds, print quota, print geometry.
//!
//! The result is a single immutable [`BoothConfig`] handed to the control core
//! at construction.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/shutterbug/config.toml` (system)
//! 2. `~/.config/shutterbug/config.toml` (user)
//! 3. `./shutterbug.toml` (local override, or the `--config` path)
//! 4. Environment variables (`SHUTTERBUG_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! captured_dir = "/home/pi/Photobooth/captured"
//! background = "/home/pi/Photobooth/assets/print-background.png"
//!
//! [hardware]
//! shutdown_line = 4
//! light_line = 17
//! warning_line = 18
//!
//! [session]
//! shot_count = 4
//! test_mode = false
//!
//! [input]
//! quit_ticks = 20
//! shutdown_ticks = 50
//!
//! [quota]
//! print_quota = 25
//! ```

pub mod booth;
pub mod infra;
pub mod loader;

pub use booth::{BoothSettings, InputConfig, LayoutConfig, QuotaConfig, SessionConfig};
pub use infra::{HardwareConfig, InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(String),
}

/// Complete booth configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoothConfig {
    #[serde(flatten)]
    pub infra: InfraConfig,

    #[serde(flatten)]
    pub booth: BoothSettings,
}

impl BoothConfig {
    /// Load configuration from an optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, Path::new("<merged>"))?;
        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Check cross-field invariants the control core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.booth.session;
        let input = &self.booth.input;
        let layout = &self.booth.layout;

        if session.shot_count == 0 {
            return Err(ConfigError::Invalid("session.shot_count must be at least 1".into()));
        }
        if session.capture_width == 0 || session.capture_height == 0 {
            return Err(ConfigError::Invalid("capture resolution must be non-zero".into()));
        }
        if !matches!(session.image_extension.as_str(), "jpg" | "jpeg" | "png") {
            return Err(ConfigError::Invalid(format!(
                "session.image_extension '{}' is not one of jpg, jpeg, png",
                session.image_extension
            )));
        }
        if input.tick_ms == 0 {
            return Err(ConfigError::Invalid("input.tick_ms must be at least 1".into()));
        }
        if input.quit_ticks == 0 || input.quit_ticks >= input.shutdown_ticks {
            return Err(ConfigError::Invalid(format!(
                "input.quit_ticks ({}) must be non-zero and below input.shutdown_ticks ({})",
                input.quit_ticks, input.shutdown_ticks
            )));
        }
        if self.booth.quota.print_quota == 0 {
            return Err(ConfigError::Invalid("quota.print_quota must be at least 1".into()));
        }
        if layout.thumbnail_width == 0 || layout.thumbnail_height_cropped == 0 {
            return Err(ConfigError::Invalid("thumbnail size must be non-zero".into()));
        }
        if layout.thumbnail_height_cropped > layout.thumbnail_height {
            return Err(ConfigError::Invalid(format!(
                "layout.thumbnail_height_cropped ({}) exceeds layout.thumbnail_height ({})",
                layout.thumbnail_height_cropped, layout.thumbnail_height
            )));
        }
        let left_edge = u64::from(layout.left_offset) + u64::from(layout.thumbnail_width);
        if left_edge > u64::from(layout.right_column_x()) {
            return Err(ConfigError::Invalid(format!(
                "two {}px columns starting at x={} do not fit a {}px canvas",
                layout.thumbnail_width, layout.left_offset, layout.print_width
            )));
        }
        let stride = u64::from(layout.thumbnail_height_cropped) + u64::from(layout.padding);
        let bottom = u64::from(layout.top_padding)
            + u64::from(layout.padding)
            + u64::from(session.shot_count - 1) * stride
            + u64::from(layout.thumbnail_height_cropped);
        if bottom > u64::from(layout.print_height) {
            return Err(ConfigError::Invalid(format!(
                "{} rows end at y={} which is below the {}px canvas",
                session.shot_count, bottom, layout.print_height
            )));
        }

        Ok(())
    }

    /// Serialize the effective config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))?;
        Ok(format!("# shutterbug configuration\n\n{body}"))
    }
}
