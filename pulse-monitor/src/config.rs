//! Monitor configuration - stored as config.json in PULSE_HOME

use std::fs;
use std::path::{Path, PathBuf};

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How long to look for a sensor before giving up
    pub scan_timeout_secs: u64,
    /// Capacity of the event and notice channels
    pub event_buffer: usize,
    /// Which local Bluetooth adapter to use
    pub adapter_index: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 30,
            event_buffer: 64,
            adapter_index: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory; set PULSE_HOME")]
    NoHome,
    #[error("failed to access {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("invalid config file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

/// Get PULSE_HOME directory, creating it if needed
pub fn pulse_home() -> Result<PathBuf, ConfigError> {
    let home = match std::env::var("PULSE_HOME") {
        Ok(home) => PathBuf::from(home),
        Err(_) => dirs::home_dir().ok_or(ConfigError::NoHome)?.join(".pulse"),
    };

    if !home.exists() {
        fs::create_dir_all(&home).map_err(|e| ConfigError::Io(home.clone(), e))?;
    }

    Ok(home)
}

/// Load config.json from `home`, writing the defaults out if it does not exist yet
pub fn load_or_create(home: &Path) -> Result<MonitorConfig, ConfigError> {
    let path = home.join("config.json");

    if path.exists() {
        let data = fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let config = serde_json::from_str(&data).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    } else {
        let config = MonitorConfig::default();
        let data = serde_json::to_string_pretty(&config)
            .map_err(|e| ConfigError::Parse(path.clone(), e))?;
        fs::write(&path, data).map_err(|e| ConfigError::Io(path.clone(), e))?;
        log::info!("Created default config at {}", path.display());
        Ok(config)
    }
}
