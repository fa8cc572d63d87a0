//! Configuration file support for FeedSafe.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/feedsafe/config.toml`.

use crate::catalog::BeverageCatalog;
use crate::{Error, Profile, Result, Strategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: Profile,

    #[serde(default)]
    pub planning: PlanningConfig,

    #[serde(default)]
    pub beverages: BeverageConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Planning and countdown parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default = "default_safety_margin_minutes")]
    pub safety_margin_minutes: i64,

    /// Usual time between feeds
    #[serde(default = "default_feed_interval_hours")]
    pub feed_interval_hours: f64,

    #[serde(default = "default_feed_amount_ml")]
    pub feed_amount_ml: f64,

    #[serde(default = "default_feed_duration_min")]
    pub feed_duration_min: u32,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            safety_margin_minutes: default_safety_margin_minutes(),
            feed_interval_hours: default_feed_interval_hours(),
            feed_amount_ml: default_feed_amount_ml(),
            feed_duration_min: default_feed_duration_min(),
        }
    }
}

/// User-defined drink, converted to standard drinks from ABV and volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CustomBeverage {
    pub id: String,
    pub name: String,
    pub abv_percent: f64,
    pub volume_ml: f64,
}

/// Custom beverages configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct BeverageConfig {
    #[serde(default)]
    pub custom: Vec<CustomBeverage>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join("feedsafe")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_safety_margin_minutes() -> i64 {
    30
}

fn default_feed_interval_hours() -> f64 {
    3.0
}

fn default_feed_amount_ml() -> f64 {
    120.0
}

fn default_feed_duration_min() -> u32 {
    20
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join("feedsafe").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the calculations cannot use
    pub fn validate(&self) -> Result<()> {
        let p = &self.profile;
        if let Some(w) = p.weight_kg {
            if !(w.is_finite() && w > 0.0) {
                return Err(Error::Config(format!("weight_kg must be positive, got {}", w)));
            }
        }
        if !(p.std_drink_grams.is_finite() && p.std_drink_grams > 0.0) {
            return Err(Error::Config(format!(
                "std_drink_grams must be positive, got {}",
                p.std_drink_grams
            )));
        }
        if !(p.conservative_factor.is_finite() && p.conservative_factor >= 1.0) {
            return Err(Error::Config(format!(
                "conservative_factor must be at least 1.0, got {}",
                p.conservative_factor
            )));
        }
        if self.planning.safety_margin_minutes < 0 {
            return Err(Error::Config("safety_margin_minutes must not be negative".into()));
        }
        if !(self.planning.feed_interval_hours.is_finite() && self.planning.feed_interval_hours > 0.0)
        {
            return Err(Error::Config(format!(
                "feed_interval_hours must be positive, got {}",
                self.planning.feed_interval_hours
            )));
        }
        Ok(())
    }

    /// Built-in beverages plus the configured custom drinks
    pub fn catalog(&self) -> BeverageCatalog {
        BeverageCatalog::with_custom(&self.beverages.custom, self.profile.std_drink_grams)
    }
}
