//! Clap-free settings for the upgrade pipeline.

use camino::Utf8PathBuf;
use uplift_domain::{
    BackupOptions, DEFAULT_BACKUP_SUFFIX, DEFAULT_SUPPORT_NAME, DEFAULT_SUPPORT_VERSION,
    UpgradeOptions,
};
use uplift_types::readiness::ReadinessOptions;
use uplift_types::reference::DependencyRef;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub project: Utf8PathBuf,
    pub map_path: Utf8PathBuf,

    // Auxiliary reference
    pub support_name: String,
    pub support_version: String,

    // Readiness
    pub unsupported: Vec<String>,
    pub ignore_unsupported: bool,

    // Steps the operator opted out of
    pub skip: Vec<String>,

    // Backups
    pub backups: bool,
    pub backup_suffix: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            project: Utf8PathBuf::from("Cargo.toml"),
            map_path: Utf8PathBuf::from("uplift-map.json"),
            support_name: DEFAULT_SUPPORT_NAME.to_string(),
            support_version: DEFAULT_SUPPORT_VERSION.to_string(),
            unsupported: Vec::new(),
            ignore_unsupported: false,
            skip: Vec::new(),
            backups: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl RunSettings {
    pub fn upgrade_options(&self) -> UpgradeOptions {
        UpgradeOptions {
            support: DependencyRef::versioned(&self.support_name, &self.support_version),
            readiness: ReadinessOptions {
                unsupported: self.unsupported.clone(),
                ignore_unsupported: self.ignore_unsupported,
            },
            backups: BackupOptions {
                enabled: self.backups,
                suffix: self.backup_suffix.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_flow_into_options() {
        let options = RunSettings::default().upgrade_options();
        assert_eq!(
            options.support,
            DependencyRef::versioned("uplift-support", "1.0.0")
        );
        assert!(options.backups.enabled);
        assert_eq!(options.backups.suffix, ".uplift.bak");
        assert!(!options.readiness.ignore_unsupported);
    }
}
