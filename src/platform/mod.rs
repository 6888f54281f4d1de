use std::path::{Path, PathBuf};

/// Platform-specific operations abstracted behind a common interface.
/// Each OS provides its own `NativePlatform` implementation so call sites
/// remain free of `#[cfg]` blocks.
pub trait Platform {
    /// Archive tool used when the config does not name one.
    fn default_archive_tool() -> PathBuf;

    /// Dedicated server binary used when the config does not name one.
    fn default_server_executable() -> PathBuf;

    /// Snapshot of running processes as `(pid, image name)` pairs.
    fn list_processes() -> std::io::Result<Vec<(u32, String)>>;

    /// Forcibly terminate the process identified by `pid`.
    fn kill_process(pid: u32) -> std::io::Result<std::process::Output>;

    /// Launch `executable` with no arguments, detached from this process and
    /// with all standard streams discarded. Returns the child PID.
    fn spawn_detached(executable: &Path) -> std::io::Result<u32>;
}

/// Parse `ps -A -o pid= -o args=` output. `comm` is cut to 15 characters on
/// Linux, so the image name is taken from the first word of the full command
/// line instead. Both separators are accepted since Wine reports DOS paths.
pub fn parse_ps_listing(text: &str) -> Vec<(u32, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (pid, args) = line.split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let program = args.trim().split_whitespace().next()?;
            let name = program
                .rsplit(['/', '\\'])
                .find(|part| !part.is_empty())
                .unwrap_or(program);
            Some((pid, name.to_string()))
        })
        .collect()
}

/// Parse `tasklist /FO CSV /NH` output: `"image","pid","session",...`.
pub fn parse_tasklist_csv(text: &str) -> Vec<(u32, String)> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.trim().split("\",\"");
            let name = fields.next()?.trim_start_matches('"').to_string();
            let pid = fields.next()?.trim_matches('"').parse().ok()?;
            Some((pid, name))
        })
        .collect()
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
