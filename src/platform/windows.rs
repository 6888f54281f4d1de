use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use super::{Platform, parse_tasklist_csv};

const DETACHED_PROCESS: u32 = 0x0000_0008;
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

pub struct NativePlatform;

impl Platform for NativePlatform {
    fn default_archive_tool() -> PathBuf {
        PathBuf::from(r"C:\Program Files\7-Zip\7z.exe")
    }

    fn default_server_executable() -> PathBuf {
        PathBuf::from(r"C:\Program Files\Eagle Dynamics\DCS World Server\bin\DCS_server.exe")
    }

    fn list_processes() -> std::io::Result<Vec<(u32, String)>> {
        let output = std::process::Command::new("tasklist")
            .args(["/FO", "CSV", "/NH"])
            .output()?;
        if !output.status.success() {
            return Err(std::io::Error::other(format!(
                "tasklist exited with {}",
                output.status
            )));
        }
        Ok(parse_tasklist_csv(&String::from_utf8_lossy(&output.stdout)))
    }

    fn kill_process(pid: u32) -> std::io::Result<std::process::Output> {
        std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output()
    }

    fn spawn_detached(executable: &Path) -> std::io::Result<u32> {
        // Detached so the server outlives this run.
        let child = std::process::Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
            .spawn()?;
        Ok(child.id())
    }
}
