//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{HostConfig, SliderMapping};

/// Delay before re-reading, so editors finish writing
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the config file and emits the reloaded slider mapping on change
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<SliderMapping>,
}

impl ConfigWatcher {
    /// Start watching the specified file
    pub fn new(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let (tx, rx) = mpsc::channel(10);

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();
        let watched_path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    // Atomic saves show up as create/rename, plain saves as modify
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    if !event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == watched_path.file_name())
                    {
                        return;
                    }
                    debug!("Config file changed: {:?}", event.paths);

                    let config_path = watched_path.clone();
                    let tx = tx.clone();

                    runtime_handle.spawn(async move {
                        tokio::time::sleep(RELOAD_DEBOUNCE).await;

                        match HostConfig::load(&config_path).await {
                            Ok(config) => {
                                info!("Configuration reloaded successfully");
                                if let Err(e) = tx.send(config.mapping()).await {
                                    error!("Failed to send config update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload config (keeping old config): {:#}", e);
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        // Watch the parent directory so rename-over-original is still seen
        let watch_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", watch_dir.display()))?;

        info!("Config file watcher started for: {}", config_path.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next reloaded mapping.
    /// Returns None if the watcher has been closed
    pub async fn next_mapping(&mut self) -> Option<SliderMapping> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigAccessor, ConfigStore};
    use std::fs;
    use tempfile::TempDir;

    /// Several events may fire for one write; wait until `slider` shows up
    async fn wait_for_slider(watcher: &mut ConfigWatcher, slider: u32) -> Option<SliderMapping> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while let Ok(Some(mapping)) =
            tokio::time::timeout_at(deadline, watcher.next_mapping()).await
        {
            if mapping.contains_key(&slider) {
                return Some(mapping);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_config_watcher_basic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "slider_mapping:\n  0: master\n")?;

        let mut watcher = ConfigWatcher::new(&config_path)?;

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(
            &config_path,
            "slider_mapping:\n  0: master\n  1:\n    - spotify.exe\n",
        )?;

        let mapping = wait_for_slider(&mut watcher, 1)
            .await
            .expect("no reload after an in-place write");
        assert_eq!(mapping[&0], vec!["master"]);
        assert_eq!(mapping[&1], vec!["spotify.exe"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_config_watcher_sees_atomic_replace() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "slider_mapping:\n  0: master\ncom_port: COM4\n")?;
        let store = ConfigStore::open(&config_path).await?;

        let mut watcher = ConfigWatcher::new(&config_path)?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Temp file plus rename over the original
        let mut mapping = store.slider_mapping();
        mapping.insert(2, vec!["discord.exe".to_string()]);
        store.write_slider_mapping(mapping).await?;

        let reloaded = wait_for_slider(&mut watcher, 2)
            .await
            .expect("no reload after a rename over the config file");
        assert_eq!(reloaded[&0], vec!["master"]);
        assert_eq!(reloaded[&2], vec!["discord.exe"]);

        Ok(())
    }
}
