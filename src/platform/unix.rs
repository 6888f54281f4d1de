use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use super::{Platform, parse_ps_listing};

pub struct NativePlatform;

impl Platform for NativePlatform {
    fn default_archive_tool() -> PathBuf {
        PathBuf::from("7z")
    }

    fn default_server_executable() -> PathBuf {
        PathBuf::from("DCS_server.exe")
    }

    fn list_processes() -> std::io::Result<Vec<(u32, String)>> {
        let output = std::process::Command::new("ps")
            .args(["-A", "-ww", "-o", "pid=", "-o", "args="])
            .output()?;
        if !output.status.success() {
            return Err(std::io::Error::other(format!(
                "ps exited with {}",
                output.status
            )));
        }
        Ok(parse_ps_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    fn kill_process(pid: u32) -> std::io::Result<std::process::Output> {
        std::process::Command::new("kill")
            .arg("-9")
            .arg(pid.to_string())
            .output()
    }

    fn spawn_detached(executable: &Path) -> std::io::Result<u32> {
        let child = std::process::Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()?;
        Ok(child.id())
    }
}
