//! Configuration management for archivefs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default kernel attribute/entry cache TTL
pub const DEFAULT_ATTR_TTL_MS: u64 = 1000;

/// Default filesystem name shown in the mount table
pub const DEFAULT_FS_NAME: &str = "archivefs";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to overlay
    pub source_dir: PathBuf,

    /// Where the view is mounted
    pub mount_point: PathBuf,

    /// Mount options
    pub mount: MountConfig,

    /// How long the kernel may cache attributes and lookups (ms)
    pub attr_ttl_ms: u64,
}

/// Mount configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Filesystem name in the mount table
    pub fs_name: String,

    /// Allow other users to access the mount
    pub allow_other: bool,

    /// Allow root to access the mount
    pub allow_root: bool,

    /// Unmount automatically when the process exits
    pub auto_unmount: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_dir: PathBuf::new(),
            mount_point: PathBuf::new(),
            mount: MountConfig::default(),
            attr_ttl_ms: DEFAULT_ATTR_TTL_MS,
        }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        MountConfig {
            fs_name: DEFAULT_FS_NAME.to_string(),
            allow_other: false,
            allow_root: false,
            auto_unmount: true,
        }
    }
}

impl Config {
    /// Config for the given pair of directories with default options
    pub fn new(source_dir: PathBuf, mount_point: PathBuf) -> Self {
        Config {
            source_dir,
            mount_point,
            ..Default::default()
        }
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("archivefs").join("config.json"))
    }

    /// Load configuration from a file, with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load the file at the default location if one exists, else defaults
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("ARCHIVEFS_ALLOW_OTHER") {
            if let Some(flag) = parse_flag(&value) {
                self.mount.allow_other = flag;
            }
        }

        if let Ok(value) = std::env::var("ARCHIVEFS_ATTR_TTL_MS") {
            if let Ok(ms) = value.trim().parse::<u64>() {
                self.attr_ttl_ms = ms;
            }
        }

        if let Ok(value) = std::env::var("ARCHIVEFS_FS_NAME") {
            let name = value.trim();
            if !name.is_empty() {
                self.mount.fs_name = name.to_string();
            }
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.mount.allow_other && self.mount.allow_root {
            return Err(Error::InvalidConfig(
                "allow_other and allow_root are mutually exclusive".to_string(),
            ));
        }

        if self.mount.fs_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "Filesystem name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn attr_ttl(&self) -> Duration {
        Duration::from_millis(self.attr_ttl_ms)
    }

    /// Mount options handed to the kernel
    pub fn mount_options(&self) -> Vec<fuser::MountOption> {
        let mut options = vec![
            fuser::MountOption::FSName(self.mount.fs_name.clone()),
            fuser::MountOption::Subtype("archivefs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::DefaultPermissions,
        ];

        if self.mount.auto_unmount {
            options.push(fuser::MountOption::AutoUnmount);
        }
        if self.mount.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }
        if self.mount.allow_root {
            options.push(fuser::MountOption::AllowRoot);
        }

        options
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
