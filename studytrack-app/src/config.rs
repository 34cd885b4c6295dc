use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use studytrack_core::{MasteryThresholds, SchedulerConfig, StudyConfig, DEFAULT_MAX_WRITE_RETRIES};
use studytrack_json::{paths::config_root, DEFAULT_MAX_BACKUPS};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSection {
    pub max_write_retries: u32,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    pub max_backups: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// Contents of `studytrack.toml`. Every table and key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub mastery: MasteryThresholds,
    pub service: ServiceSection,
    pub store: StoreSection,
}

impl AppConfig {
    pub fn study(&self) -> StudyConfig {
        StudyConfig {
            scheduler: self.scheduler.clone(),
            mastery: self.mastery.clone(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid config")
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(p) => Self::read(p),
            None => {
                let p = default_config_file();
                if p.exists() {
                    Self::read(&p)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("parsing {}", path.display()))
    }
}

pub fn default_config_file() -> PathBuf {
    config_root().join("studytrack.toml")
}
