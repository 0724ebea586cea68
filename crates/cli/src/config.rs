#![forbid(unsafe_code)]

use anyhow::Context;
use qd_core::governance::{
    DEFAULT_VOTING_DURATION_HOURS, DEFAULT_VOTING_POOL_SIZE, GovernanceSettings,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "quorumdoc.yaml";
pub const ENV_CONFIG: &str = "QUORUMDOC_CONFIG";
pub const ENV_STORAGE_DIR: &str = "QUORUMDOC_STORAGE_DIR";
pub const ENV_LOG: &str = "QUORUMDOC_LOG";

const DEFAULT_STORAGE_DIR: &str = ".quorumdoc";
const DEFAULT_LOG_FILTER: &str = "info";

/// Resolved runtime configuration.
///
/// Precedence, lowest first: built-in defaults, the YAML file, environment
/// variables, command line flags (applied by the caller).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub storage_dir: PathBuf,
    pub log_filter: String,
    pub governance: GovernanceSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            governance: GovernanceSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    storage_dir: Option<PathBuf>,
    log_filter: Option<String>,
    governance: Option<GovernanceFile>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GovernanceFile {
    voting_pool_size: u32,
    approval_threshold: f64,
    voting_duration_hours: u32,
}

impl Default for GovernanceFile {
    fn default() -> Self {
        let defaults = GovernanceSettings::default();
        Self {
            voting_pool_size: DEFAULT_VOTING_POOL_SIZE,
            approval_threshold: defaults.approval_threshold(),
            voting_duration_hours: DEFAULT_VOTING_DURATION_HOURS,
        }
    }
}

impl Config {
    /// Loads `explicit` if given, else `$QUORUMDOC_CONFIG`, else
    /// `quorumdoc.yaml` in the working directory when it exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));
        let raw = match path {
            Some(path) => Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("read config {}", path.display()))?,
            ),
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Some(std::fs::read_to_string(local).context("read quorumdoc.yaml")?)
                } else {
                    None
                }
            }
        };
        Self::from_sources(raw.as_deref(), env)
    }

    pub fn from_sources(
        yaml: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(yaml) = yaml.filter(|raw| !raw.trim().is_empty()) {
            let file: ConfigFile = serde_yaml::from_str(yaml).context("parse config yaml")?;
            if let Some(dir) = file.storage_dir {
                config.storage_dir = dir;
            }
            if let Some(filter) = file.log_filter {
                config.log_filter = filter;
            }
            if let Some(governance) = file.governance {
                config.governance = GovernanceSettings::try_new(
                    governance.voting_pool_size,
                    governance.approval_threshold,
                    governance.voting_duration_hours,
                )
                .context("invalid governance in config")?;
            }
        }

        if let Some(dir) = env(ENV_STORAGE_DIR).filter(|v| !v.trim().is_empty()) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(filter) = env(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.governance.required_yes_votes(), 2);
    }

    #[test]
    fn yaml_then_env_overrides() {
        let yaml = "storage_dir: /var/lib/qd\nlog_filter: debug\ngovernance:\n  voting_pool_size: 10\n  approval_threshold: 0.6\n";
        let config = Config::from_sources(Some(yaml), env_of(&[])).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/qd"));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.governance.required_yes_votes(), 6);
        assert_eq!(config.governance.voting_duration_hours, 72);

        let config = Config::from_sources(
            Some(yaml),
            env_of(&[(ENV_STORAGE_DIR, "/tmp/qd"), (ENV_LOG, "qd_storage=trace")]),
        )
        .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/qd"));
        assert_eq!(config.log_filter, "qd_storage=trace");
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(Config::from_sources(Some("storage_dirr: x"), env_of(&[])).is_err());
        let zero_pool = "governance:\n  voting_pool_size: 0\n";
        assert!(Config::from_sources(Some(zero_pool), env_of(&[])).is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "log_filter: warn\n").unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.log_filter, "warn");
        assert!(Config::load(Some(dir.path().join("missing.yaml").as_path())).is_err());
    }
}
