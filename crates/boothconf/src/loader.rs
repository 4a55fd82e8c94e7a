//! Config file discovery, table merging, and environment variable overlay.

use crate::{BoothConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only returns files
/// that exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/shutterbug/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("shutterbug/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("shutterbug.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file as a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Deserialize a merged table, filling anything unset with defaults.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<BoothConfig, ConfigError> {
    let mut config: BoothConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    let paths = &mut config.infra.paths;
    paths.captured_dir = expand_path(&paths.captured_dir.to_string_lossy());
    paths.final_dir = expand_path(&paths.final_dir.to_string_lossy());
    paths.background = expand_path(&paths.background.to_string_lossy());

    Ok(config)
}

/// Apply `SHUTTERBUG_*` (and `RUST_LOG`) overrides from the process environment.
pub fn apply_env_overrides(config: &mut BoothConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, env::vars());
}

/// Apply overrides from an explicit set of variables.
///
/// Unparseable numeric or boolean values are ignored, leaving the file value.
pub fn apply_overrides_from<I>(config: &mut BoothConfig, sources: &mut ConfigSources, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let applied = match key.as_str() {
            "SHUTTERBUG_CAPTURED_DIR" => {
                config.infra.paths.captured_dir = expand_path(&value);
                true
            }
            "SHUTTERBUG_FINAL_DIR" => {
                config.infra.paths.final_dir = expand_path(&value);
                true
            }
            "SHUTTERBUG_BACKGROUND" => {
                config.infra.paths.background = expand_path(&value);
                true
            }
            "SHUTTERBUG_GPIO_ROOT" => {
                config.infra.hardware.gpio_root = expand_path(&value);
                true
            }
            "SHUTTERBUG_LOG_LEVEL" | "RUST_LOG" => {
                config.infra.telemetry.log_level = value;
                true
            }
            "SHUTTERBUG_TEST_MODE" => match parse_bool(&value) {
                Some(v) => {
                    config.booth.session.test_mode = v;
                    true
                }
                None => false,
            },
            "SHUTTERBUG_SHOT_COUNT" => match value.parse() {
                Ok(v) => {
                    config.booth.session.shot_count = v;
                    true
                }
                Err(_) => false,
            },
            "SHUTTERBUG_PRINT_QUOTA" => match value.parse() {
                Ok(v) => {
                    config.booth.quota.print_quota = v;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        };

        if applied {
            sources.env_overrides.push(key);
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and a leading $VAR in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        let (var_name, rest) = match stripped.find('/') {
            Some(slash_pos) => (&stripped[..slash_pos], &stripped[slash_pos + 1..]),
            None => (stripped, ""),
        };
        if let Ok(var_value) = env::var(var_name) {
            return PathBuf::from(var_value).join(rest);
        }
    }

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn table(src: &str) -> toml::Table {
        parse_table(src, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = from_table(
            table(
                r#"
[paths]
captured_dir = "/srv/booth/captured"
"#,
            ),
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.infra.paths.captured_dir, PathBuf::from("/srv/booth/captured"));
        assert_eq!(config.booth.session.shot_count, 4);
        assert_eq!(config.booth.layout.print_width, 960);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = from_table(
            table(
                r#"
[paths]
captured_dir = "/data/captured"
final_dir = "/data/final"
background = "/data/bg.png"

[hardware]
shutdown_line = 5
warning_line = 18
active_low = true
preview_hflip = false
print_command = ["lp", "-d", "selphy"]

[telemetry]
log_level = "debug"

[session]
shot_count = 3
countdown_secs = 3
test_mode = false

[input]
tick_ms = 50
quit_ticks = 40
shutdown_ticks = 100

[quota]
print_quota = 36
"#,
            ),
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.infra.paths.final_dir, PathBuf::from("/data/final"));
        assert_eq!(config.infra.hardware.shutdown_line, 5);
        assert_eq!(config.infra.hardware.warning_line, Some(18));
        assert!(config.infra.hardware.active_low);
        assert!(!config.infra.hardware.outputs_active_low, "inputs only");
        assert!(!config.infra.hardware.preview_hflip);
        assert_eq!(config.infra.hardware.print_command.len(), 3);
        assert_eq!(config.infra.telemetry.log_level, "debug");
        assert_eq!(config.booth.session.shot_count, 3);
        assert!(!config.booth.session.test_mode);
        assert_eq!(config.booth.input.shutdown_ticks, 100);
        assert_eq!(config.booth.quota.print_quota, 36);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_table("[session\nshot_count = ", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_merge_is_key_by_key() {
        let mut base = table(
            r#"
[session]
shot_count = 3
countdown_secs = 2

[quota]
print_quota = 10
"#,
        );
        merge_tables(
            &mut base,
            table(
                r#"
[session]
countdown_secs = 7
"#,
            ),
        );

        let config = from_table(base, Path::new("merged")).unwrap();
        assert_eq!(config.booth.session.shot_count, 3);
        assert_eq!(config.booth.session.countdown_secs, 7);
        assert_eq!(config.booth.quota.print_quota, 10);
    }

    #[test]
    fn test_env_overrides_win_and_are_recorded() {
        let mut config = BoothConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(
            &mut config,
            &mut sources,
            vec![
                ("SHUTTERBUG_PRINT_QUOTA".to_string(), "12".to_string()),
                ("SHUTTERBUG_TEST_MODE".to_string(), "off".to_string()),
                ("SHUTTERBUG_SHOT_COUNT".to_string(), "many".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );

        assert_eq!(config.booth.quota.print_quota, 12);
        assert!(!config.booth.session.test_mode);
        assert_eq!(config.booth.session.shot_count, 4);
        assert_eq!(
            sources.env_overrides,
            vec!["SHUTTERBUG_PRINT_QUOTA".to_string(), "SHUTTERBUG_TEST_MODE".to_string()]
        );
    }

    #[test]
    fn test_cli_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[quota]\nprint_quota = 7").unwrap();

        let files = discover_config_files_with_override(Some(file.path()));
        assert_eq!(files.last().map(PathBuf::as_path), Some(file.path()));

        let table = load_table(file.path()).unwrap();
        let config = from_table(table, file.path()).unwrap();
        assert_eq!(config.booth.quota.print_quota, 7);
    }
}
