use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::error::{PersistenceError, PersistenceResult};
use crate::core::season::Season;
use crate::core::weather::clamp_percentage;
use crate::platform::{NativePlatform, Platform};

pub const DEFAULT_CONFIG_FILE: &str = "dcs_persistence_config.json";
pub const CONFIG_ENV_VAR: &str = "MIZKEEPER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default)]
    pub send_errors_to_discord: bool,

    #[serde(default)]
    pub error_discord_webhook: String,
}

/// On-disk shape, shared with the configuration editor. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    mission_path: String,

    #[serde(default)]
    hour_persistence_enabled: bool,

    #[serde(default)]
    weather_rotation_enabled: bool,

    #[serde(default = "default_season")]
    weather_season: String,

    #[serde(default)]
    weather_bad_weather_percentage: i64,

    #[serde(flatten)]
    notifications: NotificationSettings,

    #[serde(default)]
    seven_zip_path: Option<PathBuf>,

    #[serde(default)]
    server_executable: Option<PathBuf>,

    #[serde(default)]
    server_process_name: Option<String>,

    #[serde(default = "default_templates_dir")]
    weather_templates_dir: PathBuf,

    #[serde(default = "default_extracted_time_path")]
    extracted_time_path: PathBuf,

    #[serde(default)]
    time_source_command: Vec<String>,
}

fn default_season() -> String {
    "realistic".to_string()
}
fn default_templates_dir() -> PathBuf {
    PathBuf::from("weather")
}
fn default_extracted_time_path() -> PathBuf {
    PathBuf::from("extracted_time.json")
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub mission_path: PathBuf,
    pub hour_persistence_enabled: bool,
    pub weather_rotation_enabled: bool,
    pub season: Season,
    /// Already clamped to 0..=100.
    pub bad_weather_percentage: u8,
    pub notifications: NotificationSettings,
    pub seven_zip_path: PathBuf,
    pub server_executable: PathBuf,
    pub server_process_name: String,
    pub weather_templates_dir: PathBuf,
    pub extracted_time_path: PathBuf,
    pub time_source_command: Vec<String>,
}

impl PersistenceConfig {
    /// `--config` wins, then `MIZKEEPER_CONFIG`, then the working directory default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load(path: &Path) -> PersistenceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PersistenceError::PreconditionFailed(format!(
                "failed to load config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json(&content)?;
        info!(
            "Loaded config {}: mission={}, hour_persistence={}, weather_rotation={}",
            path.display(),
            config.mission_path.display(),
            config.hour_persistence_enabled,
            config.weather_rotation_enabled
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> PersistenceResult<Self> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|e| {
            PersistenceError::PreconditionFailed(format!("config is empty or invalid: {}", e))
        })?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> PersistenceResult<Self> {
        let mission_path = raw.mission_path.trim();
        if mission_path.is_empty() {
            return Err(PersistenceError::PreconditionFailed(
                "mission_path missing in config".to_string(),
            ));
        }

        let server_executable = raw
            .server_executable
            .unwrap_or_else(NativePlatform::default_server_executable);
        let server_process_name = raw
            .server_process_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                server_executable
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .ok_or_else(|| {
                PersistenceError::PreconditionFailed(
                    "server_process_name could not be derived from server_executable".to_string(),
                )
            })?;

        Ok(Self {
            mission_path: PathBuf::from(mission_path),
            hour_persistence_enabled: raw.hour_persistence_enabled,
            weather_rotation_enabled: raw.weather_rotation_enabled,
            season: raw.weather_season.parse().unwrap_or(Season::Realistic),
            bad_weather_percentage: clamp_percentage(raw.weather_bad_weather_percentage),
            notifications: raw.notifications,
            seven_zip_path: raw
                .seven_zip_path
                .unwrap_or_else(NativePlatform::default_archive_tool),
            server_executable,
            server_process_name,
            weather_templates_dir: raw.weather_templates_dir,
            extracted_time_path: raw.extracted_time_path,
            time_source_command: raw.time_source_command,
        })
    }

    pub fn any_workflow_enabled(&self) -> bool {
        self.hour_persistence_enabled || self.weather_rotation_enabled
    }
}
