//! Configuration file loading for uplift.
//!
//! Discovers and loads `uplift.toml` from the directory holding the project file.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;
use uplift_core::settings::RunSettings;
use uplift_domain::{DEFAULT_BACKUP_SUFFIX, DEFAULT_SUPPORT_NAME, DEFAULT_SUPPORT_VERSION};

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "uplift.toml";

/// Map file used when neither the config nor the CLI names one.
pub const DEFAULT_MAP_FILE: &str = "uplift-map.json";

/// Top-level configuration from uplift.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpliftConfig {
    pub map: MapConfig,

    /// The auxiliary reference every upgraded project declares.
    pub support: SupportConfig,

    pub readiness: ReadinessConfig,

    pub steps: StepsConfig,

    pub backups: BackupsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Reference map file. Relative paths resolve against the config file's directory.
    pub path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub name: String,
    pub version: String,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SUPPORT_NAME.to_string(),
            version: DEFAULT_SUPPORT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Name patterns (`*`, `?` wildcards) of references the upgrade cannot handle.
    pub unsupported: Vec<String>,

    /// Proceed even when unsupported references are declared.
    pub ignore_unsupported: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    /// Step ids the operator opted out of.
    pub skip: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Whether to back up the project file before rewriting it.
    pub enabled: bool,

    /// Suffix appended to the project file name for the backup.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

/// A loaded config plus the directory relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: UpliftConfig,
    pub base_dir: Utf8PathBuf,
}

/// Directory holding `project`; `.` for a bare file name.
pub fn project_dir(project: &Utf8Path) -> Utf8PathBuf {
    match project.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    }
}

/// Discover the uplift.toml config file next to the project file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(project: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_dir(project).join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an uplift.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<UpliftConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<UpliftConfig> {
    let config: UpliftConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given, else the discovered one, else defaults.
///
/// An explicit path that does not exist is an error; a missing discovered file is not.
pub fn load_or_default(
    project: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> anyhow::Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(project),
    };
    match path {
        Some(path) => Ok(LoadedConfig {
            config: load_config(&path)?,
            base_dir: project_dir(&path),
        }),
        None => Ok(LoadedConfig {
            config: UpliftConfig::default(),
            base_dir: project_dir(project),
        }),
    }
}

/// Command-line values that feed into [`RunSettings`].
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub map: Option<Utf8PathBuf>,
    pub skip: Vec<String>,
    pub unsupported: Vec<String>,
    pub ignore_unsupported: bool,
    pub no_backup: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    loaded: LoadedConfig,
}

impl ConfigMerger {
    pub fn new(loaded: LoadedConfig) -> Self {
        Self { loaded }
    }

    /// Produce run settings for `project`.
    ///
    /// CLI `skip` and `unsupported` lists extend the config file lists.
    /// CLI boolean flags override config file settings when set.
    /// A CLI map path is taken as given; a config map path resolves against the config
    /// directory.
    pub fn merge(self, project: &Utf8Path, cli: &CliOverrides) -> RunSettings {
        let LoadedConfig { config, base_dir } = self.loaded;

        let map_path = match (&cli.map, &config.map.path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) if path.is_absolute() => path.clone(),
            (None, Some(path)) => base_dir.join(path),
            (None, None) => base_dir.join(DEFAULT_MAP_FILE),
        };

        RunSettings {
            project: project.to_path_buf(),
            map_path,
            support_name: config.support.name,
            support_version: config.support.version,
            unsupported: extend(config.readiness.unsupported, &cli.unsupported),
            ignore_unsupported: cli.ignore_unsupported || config.readiness.ignore_unsupported,
            skip: extend(config.steps.skip, &cli.skip),
            backups: config.backups.enabled && !cli.no_backup,
            backup_suffix: config.backups.suffix,
        }
    }
}

fn extend(mut base: Vec<String>, extra: &[String]) -> Vec<String> {
    for item in extra {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
    base
}
