use std::path::PathBuf;

use thiserror::Error;

/// Every way a mutation run can fail. Each variant maps to one failure kind a
/// workflow reports upstream; nothing here is retried.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("failed to extract '{entry}' from {archive}: {detail}")]
    ExtractionFailed {
        archive: PathBuf,
        entry: String,
        detail: String,
    },

    #[error("failed to update {archive} with {entry}: {detail}")]
    RepackFailed {
        archive: PathBuf,
        entry: PathBuf,
        detail: String,
    },

    #[error("field {0} not found in mission descriptor")]
    FieldNotFound(&'static str),

    #[error("block {0} not found in mission descriptor")]
    BlockNotFound(&'static str),

    #[error("failed to stop server process {name}: {detail}")]
    StopFailed { name: String, detail: String },

    #[error("failed to start server {executable}: {detail}")]
    StartFailed { executable: PathBuf, detail: String },

    #[error("no weather templates available in {0}")]
    NoTemplatesAvailable(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process-control failures are announced by the supervisor itself.
    pub fn reported_by_supervisor(&self) -> bool {
        matches!(self, Self::StopFailed { .. } | Self::StartFailed { .. })
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
