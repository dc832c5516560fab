//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use transfer_core::EngineConfig;

/// Largest accepted buffer size (16 MiB).
const MAX_BUFFER_SIZE: u64 = 16 * 1024 * 1024;

/// `key = value` file configuration. Every field is optional; CLI flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Chunk size for single-file copies, in bytes.
    pub copy_buffer_size: Option<usize>,
    /// Chunk size for reading archive entries, in bytes.
    pub extract_buffer_size: Option<usize>,
    /// Attempts made to open a copy source/destination.
    pub open_retries: Option<u32>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Download stall window in seconds.
    pub stall_timeout_secs: Option<u64>,
    /// Suffix appended to protected destinations.
    pub protected_suffix: Option<String>,
    /// Reserved destination paths.
    pub protected_paths: Vec<String>,
    /// Default source log file.
    pub log_source: Option<PathBuf>,
    /// Default destination log file.
    pub log_destination: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_buffer_size("copy_buffer_size", self.copy_buffer_size)?;
        validate_buffer_size("extract_buffer_size", self.extract_buffer_size)?;
        if let Some(retries) = self.open_retries
            && !(1..=10).contains(&retries)
        {
            bail!("Invalid config value for `open_retries`: {retries}. Expected range: 1..=10");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("stall_timeout_secs", self.stall_timeout_secs)?;
        if self.protected_suffix.as_deref() == Some("") {
            bail!("Invalid config value for `protected_suffix`: must not be empty");
        }
        Ok(())
    }

    /// Overlays the configured values onto `config`.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(size) = self.copy_buffer_size {
            config.copy_buffer_size = size;
        }
        if let Some(size) = self.extract_buffer_size {
            config.extract_buffer_size = size;
        }
        if let Some(retries) = self.open_retries {
            config.open_retries = retries;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.stall_timeout_secs {
            config.stall_timeout = Duration::from_secs(secs);
        }
        if let Some(suffix) = &self.protected_suffix {
            config.protected_suffix.clone_from(suffix);
        }
    }
}

fn validate_buffer_size(field: &str, value: Option<usize>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value == 0 || value as u64 > MAX_BUFFER_SIZE {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..={MAX_BUFFER_SIZE}");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/transfer/config.toml`
/// 2. `$HOME/.config/transfer/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("transfer")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("transfer")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` or the default path, if present.
pub fn load_file_config_from(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(resolve_default_config_path);
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        if explicit.is_some() {
            bail!("Config file '{}' does not exist", path_ref.display());
        }
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "copy_buffer_size" => {
                cfg.copy_buffer_size = Some(parse_usize(value).with_context(context)?);
            }
            "extract_buffer_size" => {
                cfg.extract_buffer_size = Some(parse_usize(value).with_context(context)?);
            }
            "open_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("open_retries out of range for u32"))?;
                cfg.open_retries = Some(n);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "stall_timeout_secs" => {
                cfg.stall_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "protected_suffix" => {
                cfg.protected_suffix = Some(parse_string_literal(value).with_context(context)?);
            }
            "protected_paths" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.protected_paths = parsed
                    .split(',')
                    .map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "log_source" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.log_source = Some(PathBuf::from(parsed));
            }
            "log_destination" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.log_destination = Some(PathBuf::from(parsed));
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_usize(raw_value: &str) -> Result<usize> {
    let value = parse_integer_u64(raw_value)?;
    usize::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for usize"))
}
