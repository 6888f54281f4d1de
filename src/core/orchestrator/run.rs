use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::{MissionMutator, TimeUpdateReport, WeatherReport, Workflow};
use crate::core::config::PersistenceConfig;
use crate::core::error::{PersistenceError, PersistenceResult};
use crate::interfaces::notifier::{Severity, notify_best_effort};
use crate::interfaces::time_source::TimeSource;

/// Side record of the last successful time reading, kept for inspection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeArtifact {
    pub time_hms: String,
    pub time_seconds: u64,
}

pub fn save_time_artifact(path: &Path, hms: &str, seconds: u64) -> PersistenceResult<()> {
    let artifact = TimeArtifact {
        time_hms: hms.to_string(),
        time_seconds: seconds,
    };
    let json = serde_json::to_string_pretty(&artifact)
        .map_err(|e| PersistenceError::io("failed to encode extracted time", e.into()))?;
    std::fs::write(path, json).map_err(|e| {
        PersistenceError::io(format!("failed to save extracted time to {}", path.display()), e)
    })?;
    info!("Saved extracted time into {}", path.display());
    Ok(())
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub time: Option<TimeUpdateReport>,
    pub weather: Option<WeatherReport>,
}

impl RunSummary {
    pub fn is_noop(&self) -> bool {
        self.time.is_none() && self.weather.is_none()
    }
}

/// Run every workflow the configuration enables, time persistence first.
/// Stops at the first failing workflow.
pub async fn run_workflows(
    config: &PersistenceConfig,
    mutator: &MissionMutator,
    time_source: &dyn TimeSource,
) -> PersistenceResult<RunSummary> {
    info!("Hour persistence enabled: {}", config.hour_persistence_enabled);
    info!("Weather rotation enabled: {}", config.weather_rotation_enabled);

    let mut summary = RunSummary::default();
    if !config.any_workflow_enabled() {
        info!("Both hour persistence and weather rotation are disabled. Nothing to do.");
        return Ok(summary);
    }

    if config.hour_persistence_enabled {
        summary.time = Some(persist_from_source(config, mutator, time_source).await?);
    } else {
        info!("Hour persistence disabled in config. Skipping time extraction.");
    }

    if config.weather_rotation_enabled {
        summary.weather = Some(
            mutator
                .rotate_weather(&config.season, i64::from(config.bad_weather_percentage))
                .await?,
        );
    } else {
        info!("Weather rotation disabled in config. Skipping weather update.");
    }

    Ok(summary)
}

async fn persist_from_source(
    config: &PersistenceConfig,
    mutator: &MissionMutator,
    time_source: &dyn TimeSource,
) -> PersistenceResult<TimeUpdateReport> {
    let reading = time_source.read(&config.mission_path).await;
    if !reading.matched {
        let err = PersistenceError::PreconditionFailed(
            "mission time extraction failed (mismatch or scraping error)".to_string(),
        );
        return Err(mutator.report(Workflow::TimePersistence, err).await);
    }
    let (Some(hms), Some(seconds)) = (reading.time_text, reading.seconds) else {
        let err = PersistenceError::PreconditionFailed(
            "mission time not returned by extractor".to_string(),
        );
        return Err(mutator.report(Workflow::TimePersistence, err).await);
    };

    info!("Mission time extracted successfully: {} ({} seconds)", hms, seconds);
    if let Err(e) = save_time_artifact(&config.extracted_time_path, &hms, seconds) {
        warn!("{}", e);
        notify_best_effort(mutator.notifier(), Severity::Warning, &e.to_string()).await;
    }

    mutator.persist_time(seconds).await
}
