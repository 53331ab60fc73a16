//! Configuration management for deej-web
//!
//! Handles loading, parsing, persisting and hot-reloading of the host's
//! YAML configuration file, and exposes the slider mapping to the web API
//! through [`ConfigAccessor`].

pub mod watcher;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use watcher::ConfigWatcher;

/// Slider index -> ordered list of process names (or reserved tokens like `master`)
pub type SliderMapping = BTreeMap<u32, Vec<String>>;

/// Read/write access to the slider mapping.
///
/// Implementations must make each `write_slider_mapping` call an atomic
/// replace; callers doing read-modify-write are not serialized against each
/// other.
#[async_trait]
pub trait ConfigAccessor: Send + Sync {
    /// Current mapping snapshot
    fn slider_mapping(&self) -> SliderMapping;

    /// Persist a full mapping snapshot
    async fn write_slider_mapping(&self, mapping: SliderMapping) -> Result<()>;
}

/// Targets for one slider (a single name or a list of names)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SliderTargets {
    Single(String),
    Many(Vec<String>),
}

impl SliderTargets {
    /// Flatten into the list form used by the API
    pub fn into_names(self) -> Vec<String> {
        match self {
            SliderTargets::Single(name) => vec![name],
            SliderTargets::Many(names) => names,
        }
    }

    /// Compact form written back to disk: one name stays a scalar
    pub fn from_names(mut names: Vec<String>) -> Self {
        if names.len() == 1 {
            SliderTargets::Single(names.remove(0))
        } else {
            SliderTargets::Many(names)
        }
    }
}

/// Root configuration structure (the host's `config.yaml`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub slider_mapping: BTreeMap<u32, SliderTargets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert_sliders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub com_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_reduction: Option<String>,
    /// Keys this crate doesn't know about, preserved on write
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl HostConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file is a valid, empty config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).context("Failed to parse YAML config")
    }

    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Save configuration to file, replacing it atomically
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        let tmp_path = temp_path_for(path);
        fs::write(&tmp_path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("Failed to replace config file: {}", path.display()))?;

        Ok(())
    }

    /// Slider mapping in API form
    pub fn mapping(&self) -> SliderMapping {
        self.slider_mapping
            .iter()
            .map(|(idx, targets)| (*idx, targets.clone().into_names()))
            .collect()
    }

    /// Replace the slider mapping, keeping every other setting
    pub fn set_mapping(&mut self, mapping: SliderMapping) {
        self.slider_mapping = mapping
            .into_iter()
            .map(|(idx, names)| (idx, SliderTargets::from_names(names)))
            .collect();
    }
}

/// Sibling temp file used for atomic replace
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "config.yaml".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// File-backed [`ConfigAccessor`] with an in-memory mapping cache
pub struct ConfigStore {
    path: PathBuf,
    mapping: RwLock<SliderMapping>,
    /// Serializes file writes so each one is a whole-file replace
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Open the store and load the current mapping from disk
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = HostConfig::load(&path).await?;
        let mapping = config.mapping();
        info!(
            "Loaded {} slider mapping(s) from {}",
            mapping.len(),
            path.display()
        );

        Ok(Self {
            path,
            mapping: RwLock::new(mapping),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the cached mapping (used by the hot-reload loop)
    pub fn apply(&self, mapping: SliderMapping) {
        debug!("Applying reloaded slider mapping ({} sliders)", mapping.len());
        *self.mapping.write() = mapping;
    }

    /// Re-read the mapping from disk
    pub async fn reload(&self) -> Result<()> {
        let config = HostConfig::load(&self.path).await?;
        self.apply(config.mapping());
        Ok(())
    }
}

#[async_trait]
impl ConfigAccessor for ConfigStore {
    fn slider_mapping(&self) -> SliderMapping {
        self.mapping.read().clone()
    }

    async fn write_slider_mapping(&self, mapping: SliderMapping) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // Re-read so settings edited by hand since startup survive the write
        let mut config = HostConfig::load(&self.path).await?;
        config.set_mapping(mapping.clone());
        config.save(&self.path).await?;

        *self.mapping.write() = mapping;
        info!("Slider mapping saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
slider_mapping:
  0: master
  1: chrome.exe
  3:
    - pathofexile_x64.exe
    - rocketleague.exe
invert_sliders: false
com_port: COM4
baud_rate: 9600
noise_reduction: default
custom_key: keep me
"#;

    #[test]
    fn test_parse_scalar_and_list_targets() {
        let config = HostConfig::from_yaml(SAMPLE).unwrap();
        let mapping = config.mapping();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[&0], vec!["master"]);
        assert_eq!(mapping[&1], vec!["chrome.exe"]);
        assert_eq!(mapping[&3], vec!["pathofexile_x64.exe", "rocketleague.exe"]);
        assert!(!mapping.contains_key(&2));
        assert_eq!(config.com_port.as_deref(), Some("COM4"));
        assert_eq!(config.baud_rate, Some(9600));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = HostConfig::from_yaml("  \n").unwrap();
        assert!(config.mapping().is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        assert!(HostConfig::from_yaml("slider_mapping: [unclosed").is_err());
    }

    #[test]
    fn test_set_mapping_uses_compact_form() {
        let mut config = HostConfig::default();
        let mut mapping = SliderMapping::new();
        mapping.insert(0, vec!["spotify.exe".to_string()]);
        mapping.insert(1, vec!["a.exe".to_string(), "b.exe".to_string()]);
        mapping.insert(2, vec![]);
        config.set_mapping(mapping.clone());

        assert_eq!(
            config.slider_mapping[&0],
            SliderTargets::Single("spotify.exe".to_string())
        );
        assert_eq!(config.slider_mapping[&2], SliderTargets::Many(vec![]));
        assert_eq!(config.mapping(), mapping);
    }

    #[tokio::test]
    async fn test_store_write_preserves_other_settings() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, SAMPLE)?;

        let store = ConfigStore::open(&config_path).await?;
        let mut mapping = store.slider_mapping();
        mapping.insert(4, vec!["discord.exe".to_string()]);
        store.write_slider_mapping(mapping).await?;

        // Cache updated immediately
        assert_eq!(store.slider_mapping()[&4], vec!["discord.exe"]);

        // File rewritten with everything else intact
        let reloaded = HostConfig::load(&config_path).await?;
        assert_eq!(reloaded.mapping()[&4], vec!["discord.exe"]);
        assert_eq!(reloaded.mapping()[&0], vec!["master"]);
        assert_eq!(reloaded.noise_reduction.as_deref(), Some("default"));
        assert_eq!(reloaded.invert_sliders, Some(false));
        assert_eq!(
            reloaded.extra.get("custom_key").and_then(|v| v.as_str()),
            Some("keep me")
        );

        // No temp file left behind
        assert!(!temp_path_for(&config_path).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_write_fails_when_file_removed() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, SAMPLE)?;

        let store = ConfigStore::open(&config_path).await?;
        let before = store.slider_mapping();
        std::fs::remove_file(&config_path)?;

        let mut mapping = before.clone();
        mapping.insert(9, vec!["x.exe".to_string()]);
        assert!(store.write_slider_mapping(mapping).await.is_err());
        assert_eq!(store.slider_mapping(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_reload_picks_up_external_edit() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, SAMPLE)?;

        let store = ConfigStore::open(&config_path).await?;
        std::fs::write(&config_path, "slider_mapping:\n  7: game.exe\n")?;
        store.reload().await?;

        let mapping = store.slider_mapping();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[&7], vec!["game.exe"]);
        Ok(())
    }
}
