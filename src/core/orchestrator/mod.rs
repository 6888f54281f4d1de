//! Stop → extract → edit → repack → restart pipelines.
//!
//! Each workflow is fail-fast: the first failing step ends it, the failure is
//! logged and sent to the notifier, and nothing already done is rolled back.
//! If the server was stopped by this run it is started again before the
//! failure is returned.

mod run;

pub use run::{RunSummary, TimeArtifact, run_workflows, save_time_artifact};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, Span, error, info, info_span, warn};

use crate::core::archive::{ArchiveEditor, MISSION_ENTRY, ScratchArea, SevenZip};
use crate::core::config::PersistenceConfig;
use crate::core::descriptor;
use crate::core::error::{PersistenceError, PersistenceResult};
use crate::core::season::{Season, SeasonDate};
use crate::core::supervisor::{NativeProcessControl, ProcessSupervisor, StopOutcome};
use crate::core::weather::{WeatherPool, WeatherSelector};
use crate::interfaces::notifier::{Notifier, Severity, notify_best_effort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    TimePersistence,
    WeatherRotation,
}

impl Workflow {
    /// Wording used in operator notifications.
    pub fn purpose(&self) -> &'static str {
        match self {
            Workflow::TimePersistence => "mission time update",
            Workflow::WeatherRotation => "dynamic weather rotation",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::TimePersistence => write!(f, "Hour persistence"),
            Workflow::WeatherRotation => write!(f, "Weather rotation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeUpdateReport {
    pub previous: i64,
    pub updated: u64,
    pub server: StopOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub date: SeasonDate,
    pub pool: WeatherPool,
    pub template: PathBuf,
    pub server: StopOutcome,
}

pub struct MissionMutator {
    archive_path: PathBuf,
    archive: Arc<dyn ArchiveEditor>,
    supervisor: ProcessSupervisor,
    selector: WeatherSelector,
    notifier: Arc<dyn Notifier>,
    span: Span,
}

impl MissionMutator {
    pub fn new(
        archive_path: impl Into<PathBuf>,
        archive: Arc<dyn ArchiveEditor>,
        supervisor: ProcessSupervisor,
        selector: WeatherSelector,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            archive_path: archive_path.into(),
            archive,
            supervisor,
            selector,
            notifier,
            span: info_span!("orchestrator"),
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &PersistenceConfig, notifier: Arc<dyn Notifier>) -> Self {
        let supervisor = ProcessSupervisor::new(
            Arc::new(NativeProcessControl),
            notifier.clone(),
            config.server_process_name.clone(),
            config.server_executable.clone(),
        );
        Self::new(
            config.mission_path.clone(),
            Arc::new(SevenZip::new(config.seven_zip_path.clone())),
            supervisor,
            WeatherSelector::new(config.weather_templates_dir.clone()),
            notifier,
        )
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Log and notify a failure, unless the supervisor already announced it.
    pub(crate) async fn report(&self, workflow: Workflow, err: PersistenceError) -> PersistenceError {
        error!("{} failed: {}", workflow, err);
        if !err.reported_by_supervisor() {
            notify_best_effort(
                self.notifier.as_ref(),
                Severity::Error,
                &format!("{} failed: {}", workflow, err),
            )
            .await;
        }
        err
    }

    /// Add `elapsed_seconds` to the mission's authoritative start time.
    pub async fn persist_time(&self, elapsed_seconds: u64) -> PersistenceResult<TimeUpdateReport> {
        info!("Seconds to add to start_time: {}", elapsed_seconds);
        let ((previous, updated), server) = self
            .mutate(Workflow::TimePersistence, |text| {
                let update = descriptor::update_start_time(&text, elapsed_seconds)?;
                info!("Original start_time (last occurrence): {}", update.previous);
                info!("New start_time: {}", update.updated);
                Ok((update.text, (update.previous, update.updated)))
            })
            .await?;
        Ok(TimeUpdateReport {
            previous,
            updated,
            server,
        })
    }

    /// Set the season's date and swap in a randomly drawn weather block.
    pub async fn rotate_weather(
        &self,
        season: &Season,
        bad_weather_percentage: i64,
    ) -> PersistenceResult<WeatherReport> {
        self.rotate_weather_on(SeasonDate::for_season(season), season, bad_weather_percentage)
            .await
    }

    pub async fn rotate_weather_on(
        &self,
        date: SeasonDate,
        season: &Season,
        bad_weather_percentage: i64,
    ) -> PersistenceResult<WeatherReport> {
        info!("Season: {}", season);
        info!("Bad weather percentage: {}%", bad_weather_percentage);
        let ((pool, template), server) = self
            .mutate(Workflow::WeatherRotation, |text| {
                info!("Setting mission date for season '{}': {}", season, date);
                let dated = descriptor::replace_date_block(&text, date)?;
                let template = self.selector.choose(bad_weather_percentage)?;
                let rotated = descriptor::replace_weather_block(&dated, &template.text)?;
                Ok((rotated, (template.pool, template.path)))
            })
            .await?;
        Ok(WeatherReport {
            date,
            pool,
            template,
            server,
        })
    }

    async fn mutate<T, F>(&self, workflow: Workflow, edit: F) -> PersistenceResult<(T, StopOutcome)>
    where
        F: FnOnce(String) -> PersistenceResult<(String, T)>,
    {
        async {
            info!("---- {} process START ----", workflow);
            if !self.archive_path.is_file() {
                let err = PersistenceError::PreconditionFailed(format!(
                    "MIZ file not found: {}",
                    self.archive_path.display()
                ));
                return Err(self.report(workflow, err).await);
            }
            info!("Preparing to update MIZ: {}", self.archive_path.display());

            let stopped = match self.supervisor.stop_if_running(workflow.purpose()).await {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.report(workflow, err).await),
            };

            let value = match self.edit_archive(edit).await {
                Ok(value) => value,
                Err(err) => {
                    let err = self.report(workflow, err).await;
                    if let StopOutcome::Stopped(pid) = stopped {
                        warn!("Restarting server stopped earlier in this run (was PID {})", pid);
                        let recovery = format!("failed {}", workflow.purpose());
                        if let Err(start_err) = self.supervisor.start(&recovery).await {
                            error!("Recovery restart failed: {}", start_err);
                        }
                    }
                    return Err(err);
                }
            };

            if let Err(err) = self.supervisor.start(workflow.purpose()).await {
                return Err(self.report(workflow, err).await);
            }
            info!("---- {} process DONE ----", workflow);
            Ok((value, stopped))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Extract, edit and repack the mission entry inside a scratch area that is
    /// removed on every exit path.
    async fn edit_archive<T, F>(&self, edit: F) -> PersistenceResult<T>
    where
        F: FnOnce(String) -> PersistenceResult<(String, T)>,
    {
        let scratch = ScratchArea::new()?;
        let mission = self
            .archive
            .extract_entry(&self.archive_path, MISSION_ENTRY, scratch.path())
            .await?;

        let bytes = tokio::fs::read(&mission)
            .await
            .map_err(|e| PersistenceError::io("failed reading mission file", e))?;
        // Untouched lines must repack byte for byte.
        let text = String::from_utf8(bytes).map_err(|e| {
            PersistenceError::io(
                "mission file is not valid UTF-8",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        let (updated, value) = edit(text)?;

        tokio::fs::write(&mission, updated)
            .await
            .map_err(|e| PersistenceError::io("failed writing updated mission file", e))?;
        self.archive.update_entry(&self.archive_path, &mission).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests;
