//! Runtime tunables.
//!
//! Every threshold the selection policy and the worker loops depend on is a
//! config field, not a constant: the service has changed these values across
//! event iterations. Values load from `config.toml` when present, falling
//! back to environment variables with the same key names.

use std::path::Path;
use std::time::Duration;

use crate::error::SwarmError;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_BASE_URL: &str = "SALIEN_SWARM_BASE_URL";
pub const ENV_LANGUAGE: &str = "SALIEN_SWARM_LANGUAGE";
pub const ENV_SCAN_INTERVAL_SECS: &str = "SALIEN_SWARM_SCAN_INTERVAL_SECS";
pub const ENV_ABANDON_THRESHOLD: &str = "SALIEN_SWARM_ABANDON_THRESHOLD";
pub const ENV_ENGAGEMENT_WINDOW_SECS: &str = "SALIEN_SWARM_ENGAGEMENT_WINDOW_SECS";
pub const ENV_WINDOW_JITTER_SECS: &str = "SALIEN_SWARM_WINDOW_JITTER_SECS";
pub const ENV_ZONE_POLL_SECS: &str = "SALIEN_SWARM_ZONE_POLL_SECS";
pub const ENV_CLAN_ID: &str = "SALIEN_SWARM_CLAN_ID";

pub const DEFAULT_BASE_URL: &str = "https://community.steam-api.com/";
pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_ABANDON_THRESHOLD: f64 = 0.90;
pub const DEFAULT_ENGAGEMENT_WINDOW: Duration = Duration::from_secs(120);
pub const DEFAULT_WINDOW_JITTER: Duration = Duration::from_secs(5);
pub const DEFAULT_ZONE_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BASE_SCORE_RATE: u64 = 5;
pub const DEFAULT_BOSS_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_BOSS_REPORT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BOSS_HEAL_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_BOSS_DAMAGE_TO_BOSS: u32 = 2500;
pub const DEFAULT_BOSS_DAMAGE_TAKEN: u32 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    pub base_url: String,
    pub language: String,
    /// Periodic full-scan cadence of the coordinator.
    pub scan_interval: Duration,
    /// Zones at or above this capture progress are not worth starting on.
    pub abandon_threshold: f64,
    /// Zones must have some engagement history; progress must exceed this.
    pub min_progress: f64,
    /// Nominal round length; the reported score is computed from this value,
    /// not the jittered actual wait.
    pub engagement_window: Duration,
    /// Upper bound of the uniform random extension added to each wait so
    /// workers drift apart.
    pub window_jitter: Duration,
    /// How often a worker re-checks mid-window that it is still in its zone.
    /// Floor of one second; the service does not want tighter polling.
    pub zone_poll_interval: Duration,
    /// Score points per second at the lowest difficulty.
    pub base_score_rate: u64,
    pub boss_tick: Duration,
    pub boss_report_interval: Duration,
    pub boss_heal_interval: Duration,
    pub boss_damage_to_boss: u32,
    pub boss_damage_taken: u32,
    pub clan_id: Option<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            abandon_threshold: DEFAULT_ABANDON_THRESHOLD,
            min_progress: 0.0,
            engagement_window: DEFAULT_ENGAGEMENT_WINDOW,
            window_jitter: DEFAULT_WINDOW_JITTER,
            zone_poll_interval: DEFAULT_ZONE_POLL_INTERVAL,
            base_score_rate: DEFAULT_BASE_SCORE_RATE,
            boss_tick: DEFAULT_BOSS_TICK,
            boss_report_interval: DEFAULT_BOSS_REPORT_INTERVAL,
            boss_heal_interval: DEFAULT_BOSS_HEAL_INTERVAL,
            boss_damage_to_boss: DEFAULT_BOSS_DAMAGE_TO_BOSS,
            boss_damage_taken: DEFAULT_BOSS_DAMAGE_TAKEN,
            clan_id: None,
        }
    }
}

impl SwarmConfig {
    /// Reads `config.toml` when it exists, else the environment.
    pub fn from_default_sources() -> Result<Self, SwarmError> {
        Self::from_path_or_env(Path::new(DEFAULT_CONFIG_FILE_NAME))
    }

    pub fn from_path_or_env(path: &Path) -> Result<Self, SwarmError> {
        if path.exists() {
            return Self::from_config_file(path);
        }
        Self::from_env()
    }

    pub fn from_config_file(path: &Path) -> Result<Self, SwarmError> {
        let content =
            std::fs::read_to_string(path).map_err(|err| SwarmError::ReadConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let value: toml::Value =
            toml::from_str(&content).map_err(|err| SwarmError::ParseConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let table = value
            .as_table()
            .ok_or_else(|| SwarmError::ParseConfigFile {
                path: path.display().to_string(),
                message: "root is not a TOML table".to_string(),
            })?
            .clone();

        Self::from_env_with(|key| {
            table
                .get(key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, SwarmError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(mut getter: F) -> Result<Self, SwarmError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = SwarmConfig::default();
        if let Some(value) = non_empty(getter(ENV_BASE_URL)) {
            config.base_url = value;
        }
        if let Some(value) = non_empty(getter(ENV_LANGUAGE)) {
            config.language = value;
        }
        if let Some(value) = getter(ENV_SCAN_INTERVAL_SECS) {
            config.scan_interval = parse_secs(ENV_SCAN_INTERVAL_SECS, &value)?;
        }
        if let Some(value) = getter(ENV_ABANDON_THRESHOLD) {
            config.abandon_threshold = parse_fraction(ENV_ABANDON_THRESHOLD, &value)?;
        }
        if let Some(value) = getter(ENV_ENGAGEMENT_WINDOW_SECS) {
            config.engagement_window = parse_secs(ENV_ENGAGEMENT_WINDOW_SECS, &value)?;
        }
        if let Some(value) = getter(ENV_WINDOW_JITTER_SECS) {
            config.window_jitter = parse_jitter_secs(ENV_WINDOW_JITTER_SECS, &value)?;
        }
        if let Some(value) = getter(ENV_ZONE_POLL_SECS) {
            config.zone_poll_interval = parse_secs(ENV_ZONE_POLL_SECS, &value)?;
        }
        config.clan_id = non_empty(getter(ENV_CLAN_ID));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SwarmError> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url cannot be empty"));
        }
        if !self.abandon_threshold.is_finite()
            || self.abandon_threshold <= 0.0
            || self.abandon_threshold > 1.0
        {
            return Err(invalid("abandon_threshold must be within (0, 1]"));
        }
        if !self.min_progress.is_finite()
            || self.min_progress < 0.0
            || self.min_progress >= self.abandon_threshold
        {
            return Err(invalid("min_progress must be in [0, abandon_threshold)"));
        }
        if self.scan_interval.is_zero() {
            return Err(invalid("scan_interval must be positive"));
        }
        if self.engagement_window.is_zero() {
            return Err(invalid("engagement_window must be positive"));
        }
        if self.zone_poll_interval < Duration::from_secs(1) {
            return Err(invalid("zone_poll_interval must be at least one second"));
        }
        if self.boss_tick.is_zero() || self.boss_report_interval < self.boss_tick {
            return Err(invalid(
                "boss_report_interval must be at least one boss_tick",
            ));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> SwarmError {
    SwarmError::InvalidConfig {
        reason: reason.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, SwarmError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(&format!("{key} requires a positive integer, got {value:?}")))
}

fn parse_jitter_secs(key: &str, value: &str) -> Result<Duration, SwarmError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| invalid(&format!("{key} requires an integer, got {value:?}")))
}

fn parse_fraction(key: &str, value: &str) -> Result<f64, SwarmError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|fraction| fraction.is_finite() && *fraction > 0.0 && *fraction <= 1.0)
        .ok_or_else(|| invalid(&format!("{key} requires a fraction in (0, 1], got {value:?}")))
}

fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        _ => None,
    }
}
