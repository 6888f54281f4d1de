use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{Instrument, Span, error, info, info_span};

use crate::core::error::{PersistenceError, PersistenceResult};

/// Name of the archive entry holding the mission descriptor.
pub const MISSION_ENTRY: &str = "mission";

/// Reads and writes single named entries of a packed mission archive.
#[async_trait]
pub trait ArchiveEditor: Send + Sync {
    /// Pull `entry` out of `archive` into `dest_dir` and return the extracted path.
    async fn extract_entry(
        &self,
        archive: &Path,
        entry: &str,
        dest_dir: &Path,
    ) -> PersistenceResult<PathBuf>;

    /// Overwrite the same-named entry of `archive` with the content of `entry_path`.
    async fn update_entry(&self, archive: &Path, entry_path: &Path) -> PersistenceResult<()>;
}

/// Scratch directory for one mutation. Removed when dropped, whichever way the
/// scope is left.
pub struct ScratchArea {
    dir: tempfile::TempDir,
}

impl ScratchArea {
    pub fn new() -> PersistenceResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("mizkeeper-")
            .tempdir()
            .map_err(|e| PersistenceError::io("failed to create scratch directory", e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// `7z`-compatible command line tool.
pub struct SevenZip {
    tool: PathBuf,
    span: Span,
}

struct ToolOutput {
    success: bool,
    detail: String,
}

impl SevenZip {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            span: info_span!("archive"),
        }
    }

    async fn run(&self, args: &[&OsStr]) -> std::io::Result<ToolOutput> {
        let rendered: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        info!("Running 7zip: {} {}", self.tool.display(), rendered.join(" "));

        let output = Command::new(&self.tool).args(args).output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exit status {}", output.status)
        } else {
            format!("exit status {}: {}", output.status, stderr)
        };
        Ok(ToolOutput {
            success: output.status.success(),
            detail,
        })
    }
}

#[async_trait]
impl ArchiveEditor for SevenZip {
    async fn extract_entry(
        &self,
        archive: &Path,
        entry: &str,
        dest_dir: &Path,
    ) -> PersistenceResult<PathBuf> {
        let fail = |detail: String| {
            error!("7zip error: {}", detail);
            PersistenceError::ExtractionFailed {
                archive: archive.to_path_buf(),
                entry: entry.to_string(),
                detail,
            }
        };

        let mut out_flag = OsString::from("-o");
        out_flag.push(dest_dir);
        let out = self
            .run(&[
                OsStr::new("e"),
                archive.as_os_str(),
                OsStr::new(entry),
                out_flag.as_os_str(),
                OsStr::new("-y"),
            ])
            .instrument(self.span.clone())
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !out.success {
            return Err(fail(out.detail));
        }

        let extracted = dest_dir.join(entry);
        if !extracted.is_file() {
            return Err(fail(format!("'{}' missing after extraction", entry)));
        }
        Ok(extracted)
    }

    async fn update_entry(&self, archive: &Path, entry_path: &Path) -> PersistenceResult<()> {
        let fail = |detail: String| {
            error!("7zip error: {}", detail);
            PersistenceError::RepackFailed {
                archive: archive.to_path_buf(),
                entry: entry_path.to_path_buf(),
                detail,
            }
        };

        let out = self
            .run(&[
                OsStr::new("u"),
                archive.as_os_str(),
                entry_path.as_os_str(),
                OsStr::new("-y"),
            ])
            .instrument(self.span.clone())
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !out.success {
            return Err(fail(out.detail));
        }
        Ok(())
    }
}
