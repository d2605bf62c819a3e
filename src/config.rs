use crate::filter::Filters;
use crate::history::DEFAULT_CAPACITY;
use crate::ui::theme::ThemeVariant;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("refresh interval must be at least 1 second (got {0})")]
    InvalidInterval(u64),

    #[error("history must hold at least 1 sample")]
    InvalidHistory,

    #[error("invalid dataset regex `{pattern}`: {source}")]
    InvalidRegex { pattern: String, #[source] source: regex::Error },

    #[error("unknown theme `{0}` (expected default, dracula, gruvbox or nord)")]
    UnknownTheme(String),

    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, #[source] source: io::Error },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
}

// ── File format ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seconds between polls
    pub interval_secs: u64,
    /// IOPS samples kept per pool / vdev for the sparklines
    pub history_capacity: usize,
    /// default, dracula, gruvbox, nord
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Binary used for `zpool` invocations (name looked up in PATH, or absolute)
    pub zpool: String,
    pub zfs:   String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { interval_secs: 5, history_capacity: DEFAULT_CAPACITY, theme: "default".into() }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self { zpool: "zpool".into(), zfs: "zfs".into() }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zdash").join("zdash.toml"))
    }

    /// Load the user's config file. A missing file yields the defaults,
    /// which are written out best-effort for next time.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None       => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match write_defaults(path) {
                    Ok(())  => info!(path = %path.display(), "wrote default config"),
                    Err(e)  => debug!(path = %path.display(), error = %e, "could not write default config"),
                }
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

fn write_defaults(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# zdash configuration\n# Generated on first run; command-line flags override these values\n\n{}", text))?;
    Ok(())
}

// ── Resolved settings ─────────────────────────────────────────────────

/// Values given on the command line; `None` means "use the file".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interval_secs: Option<u64>,
    pub pool:          Option<String>,
    pub dataset:       Option<String>,
    pub theme:         Option<String>,
    pub history:       Option<usize>,
}

/// Everything the program needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub interval:         Duration,
    pub history_capacity: usize,
    pub theme:            ThemeVariant,
    pub filters:          Filters,
    pub zpool:            String,
    pub zfs:              String,
}

impl Settings {
    pub fn resolve(file: &Config, cli: &Overrides) -> Result<Self, ConfigError> {
        let interval_secs = cli.interval_secs.unwrap_or(file.general.interval_secs);
        if interval_secs == 0 {
            return Err(ConfigError::InvalidInterval(interval_secs));
        }
        let history_capacity = cli.history.unwrap_or(file.general.history_capacity);
        if history_capacity == 0 {
            return Err(ConfigError::InvalidHistory);
        }
        let theme_name = cli.theme.as_deref().unwrap_or(&file.general.theme);
        let theme = ThemeVariant::parse(theme_name)
            .ok_or_else(|| ConfigError::UnknownTheme(theme_name.to_string()))?;
        let dataset = cli.dataset.as_deref()
            .map(|p| Regex::new(p).map_err(|source| ConfigError::InvalidRegex { pattern: p.to_string(), source }))
            .transpose()?;

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            history_capacity,
            theme,
            filters: Filters { pool: cli.pool.clone(), dataset },
            zpool:   file.commands.zpool.clone(),
            zfs:     file.commands.zfs.clone(),
        })
    }

    /// The effective values in config-file form, for `--print-config`.
    pub fn as_config(&self) -> Config {
        Config {
            general: GeneralConfig {
                interval_secs:    self.interval.as_secs(),
                history_capacity: self.history_capacity,
                theme:            self.theme.name().to_lowercase(),
            },
            commands: CommandsConfig { zpool: self.zpool.clone(), zfs: self.zfs.clone() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults_and_writes_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zdash").join("zdash.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zdash.toml");
        fs::write(&path, "[general]\ninterval_secs = 30\n\n[commands]\nzpool = \"/sbin/zpool\"\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.general.interval_secs, 30);
        assert_eq!(cfg.general.history_capacity, DEFAULT_CAPACITY);
        assert_eq!(cfg.commands.zpool, "/sbin/zpool");
        assert_eq!(cfg.commands.zfs, "zfs");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zdash.toml");
        fs::write(&path, "[general\ninterval_secs = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn cli_overrides_file() {
        let mut file = Config::default();
        file.general.interval_secs = 30;
        file.general.theme = "nord".into();
        let cli = Overrides { interval_secs: Some(2), pool: Some("tank".into()), ..Default::default() };
        let s = Settings::resolve(&file, &cli).unwrap();
        assert_eq!(s.interval, Duration::from_secs(2));
        assert_eq!(s.theme, ThemeVariant::Nord);
        assert_eq!(s.filters.pool.as_deref(), Some("tank"));
        assert_eq!(s.as_config().general.theme, "nord");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = Config::default();
        let bad_regex = Overrides { dataset: Some("tank/(".into()), ..Default::default() };
        assert!(matches!(Settings::resolve(&file, &bad_regex), Err(ConfigError::InvalidRegex { .. })));

        let zero = Overrides { interval_secs: Some(0), ..Default::default() };
        assert!(matches!(Settings::resolve(&file, &zero), Err(ConfigError::InvalidInterval(0))));

        let theme = Overrides { theme: Some("solarized".into()), ..Default::default() };
        assert!(matches!(Settings::resolve(&file, &theme), Err(ConfigError::UnknownTheme(_))));

        let history = Overrides { history: Some(0), ..Default::default() };
        assert!(matches!(Settings::resolve(&file, &history), Err(ConfigError::InvalidHistory)));
    }
}
