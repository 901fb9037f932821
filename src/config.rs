//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use lr4::types::Timings;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceSelection,
    pub protocol: Timings,
    pub measure: MeasureConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lr4").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve an explicit path, falling back to the platform default
    pub fn resolve(path: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
        match path {
            Some(path) => Ok(path),
            None => Ok(Self::path().ok_or("could not determine config directory")?),
        }
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, Box<dyn Error>> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_with_header(path)?;
            info!("created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config with header comments for new files
    pub fn save_with_header(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# lr4 configuration file
# durations accept humantime values, e.g. "250ms" or "2s"

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceSelection {
    /// Serial number of the rangefinder to use when none is given on the command line
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MeasureConfig {
    /// Number of readings to take, 0 to keep going until interrupted
    pub count: u64,
    /// Delay between readings
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Prefix every reading with the local time
    pub timestamps: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            count: 1,
            interval: Duration::from_millis(500),
            timestamps: false,
        }
    }
}
