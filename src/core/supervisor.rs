use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, error, info, info_span};

use crate::core::error::{PersistenceError, PersistenceResult};
use crate::interfaces::notifier::{Notifier, Severity, notify_best_effort};
use crate::platform::{NativePlatform, Platform};

/// Wait after a forced kill so the OS releases the server's lock on the archive.
pub const QUIESCENCE_WINDOW: Duration = Duration::from_secs(15);

/// Scan, kill and spawn primitives the supervisor is built on.
pub trait ProcessControl: Send + Sync {
    /// PIDs whose image name equals `name` exactly, in scan order.
    fn find_pids(&self, name: &str) -> std::io::Result<Vec<u32>>;

    fn kill(&self, pid: u32) -> std::io::Result<()>;

    fn spawn_detached(&self, executable: &Path) -> std::io::Result<u32>;
}

pub struct NativeProcessControl;

impl ProcessControl for NativeProcessControl {
    fn find_pids(&self, name: &str) -> std::io::Result<Vec<u32>> {
        Ok(NativePlatform::list_processes()?
            .into_iter()
            .filter(|(_, image)| image == name)
            .map(|(pid, _)| pid)
            .collect())
    }

    fn kill(&self, pid: u32) -> std::io::Result<()> {
        let output = NativePlatform::kill_process(pid)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    fn spawn_detached(&self, executable: &Path) -> std::io::Result<u32> {
        NativePlatform::spawn_detached(executable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running(u32),
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(u32),
    NotRunning,
}

/// Stops and restarts the dedicated server around archive mutations.
///
/// Holds no handle across runs: the server is found by image name every time.
pub struct ProcessSupervisor {
    control: Arc<dyn ProcessControl>,
    notifier: Arc<dyn Notifier>,
    process_name: String,
    executable: PathBuf,
    quiescence: Duration,
    span: Span,
}

impl ProcessSupervisor {
    pub fn new(
        control: Arc<dyn ProcessControl>,
        notifier: Arc<dyn Notifier>,
        process_name: impl Into<String>,
        executable: impl Into<PathBuf>,
    ) -> Self {
        Self {
            control,
            notifier,
            process_name: process_name.into(),
            executable: executable.into(),
            quiescence: QUIESCENCE_WINDOW,
            span: info_span!("supervisor"),
        }
    }

    pub fn with_quiescence(mut self, quiescence: Duration) -> Self {
        self.quiescence = quiescence;
        self
    }

    pub fn scan(&self) -> std::io::Result<ServerState> {
        let pids = self.control.find_pids(&self.process_name)?;
        Ok(match pids.first() {
            Some(pid) => ServerState::Running(*pid),
            None => ServerState::NotRunning,
        })
    }

    async fn report_failure(&self, err: PersistenceError) -> PersistenceError {
        error!("{}", err);
        notify_best_effort(self.notifier.as_ref(), Severity::Error, &err.to_string()).await;
        err
    }

    /// Kill the first matching server process and wait out the quiescence
    /// window. Returns at once, silently, when nothing is running.
    pub async fn stop_if_running(&self, purpose: &str) -> PersistenceResult<StopOutcome> {
        async {
            info!("Checking if {} is running...", self.process_name);
            let pid = match self.scan() {
                Ok(ServerState::Running(pid)) => pid,
                Ok(ServerState::NotRunning) => {
                    info!("{} is not running. Continuing normally.", self.process_name);
                    return Ok(StopOutcome::NotRunning);
                }
                Err(e) => {
                    let err = PersistenceError::StopFailed {
                        name: self.process_name.clone(),
                        detail: format!("process scan failed: {}", e),
                    };
                    return Err(self.report_failure(err).await);
                }
            };

            info!(
                "{} detected (PID {}). Stopping it to apply {}...",
                self.process_name, pid, purpose
            );
            notify_best_effort(
                self.notifier.as_ref(),
                Severity::Info,
                &format!("DCS server stopped to apply {}.", purpose),
            )
            .await;

            if let Err(e) = self.control.kill(pid) {
                let err = PersistenceError::StopFailed {
                    name: self.process_name.clone(),
                    detail: format!("kill of PID {} failed: {}", pid, e),
                };
                return Err(self.report_failure(err).await);
            }

            info!(
                "{} stopped. Waiting {}s before touching the mission...",
                self.process_name,
                self.quiescence.as_secs()
            );
            tokio::time::sleep(self.quiescence).await;
            Ok(StopOutcome::Stopped(pid))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Launch the server detached. Never retried.
    pub async fn start(&self, purpose: &str) -> PersistenceResult<u32> {
        async {
            info!("Starting server: {}", self.executable.display());
            match self.control.spawn_detached(&self.executable) {
                Ok(pid) => {
                    info!("{} started (PID {}).", self.process_name, pid);
                    notify_best_effort(
                        self.notifier.as_ref(),
                        Severity::Info,
                        &format!("DCS server restarted successfully after {}.", purpose),
                    )
                    .await;
                    Ok(pid)
                }
                Err(e) => {
                    let err = PersistenceError::StartFailed {
                        executable: self.executable.clone(),
                        detail: e.to_string(),
                    };
                    Err(self.report_failure(err).await)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory process table.
    #[derive(Default)]
    pub struct FakeProcesses {
        pub table: Mutex<Vec<(u32, String)>>,
        pub killed: Mutex<Vec<u32>>,
        pub spawned: Mutex<Vec<PathBuf>>,
        pub fail_scan: bool,
        pub fail_kill: bool,
        pub fail_spawn: bool,
    }

    impl FakeProcesses {
        pub fn running(entries: &[(u32, &str)]) -> Self {
            Self {
                table: Mutex::new(entries.iter().map(|(p, n)| (*p, n.to_string())).collect()),
                ..Self::default()
            }
        }

        pub fn killed(&self) -> Vec<u32> {
            self.killed.lock().unwrap().clone()
        }

        pub fn spawned(&self) -> Vec<PathBuf> {
            self.spawned.lock().unwrap().clone()
        }
    }

    impl ProcessControl for FakeProcesses {
        fn find_pids(&self, name: &str) -> std::io::Result<Vec<u32>> {
            if self.fail_scan {
                return Err(std::io::Error::other("ps unavailable"));
            }
            Ok(self
                .table
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, n)| n == name)
                .map(|(p, _)| *p)
                .collect())
        }

        fn kill(&self, pid: u32) -> std::io::Result<()> {
            if self.fail_kill {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "access denied",
                ));
            }
            self.killed.lock().unwrap().push(pid);
            self.table.lock().unwrap().retain(|(p, _)| *p != pid);
            Ok(())
        }

        fn spawn_detached(&self, executable: &Path) -> std::io::Result<u32> {
            if self.fail_spawn {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file",
                ));
            }
            self.spawned.lock().unwrap().push(executable.to_path_buf());
            let name = executable
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.table.lock().unwrap().push((4242, name));
            Ok(4242)
        }
    }
}
