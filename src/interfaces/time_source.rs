use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

/// What the running server reported about its mission clock.
///
/// `matched == false` covers both a scraping failure and a different mission
/// being loaded than the configured one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeReading {
    pub matched: bool,
    pub time_text: Option<String>,
    pub seconds: Option<u64>,
}

impl TimeReading {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            time_text: None,
            seconds: None,
        }
    }
}

/// Unify separators and case so paths reported by the server compare equal to
/// the configured one.
pub fn normalize_mission_path(path: &str) -> String {
    path.replace('\\', "/")
        .replace("//", "/")
        .to_lowercase()
        .trim()
        .to_string()
}

/// `H:MM:SS` to seconds. Anything other than three numeric fields is rejected.
pub fn parse_hms(text: &str) -> Option<u64> {
    let mut parts = text.trim().split(':');
    let h: u64 = parts.next()?.trim().parse().ok()?;
    let m: u64 = parts.next()?.trim().parse().ok()?;
    let s: u64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600 + m * 60 + s)
}

/// Apply the mission identity check and convert the clock text.
pub fn evaluate_reading(expected_mission: &Path, loaded_mission: &str, time_text: &str) -> TimeReading {
    let expected = normalize_mission_path(&expected_mission.to_string_lossy());
    let loaded = normalize_mission_path(loaded_mission);
    info!("Normalized loaded:   {}", loaded);
    info!("Normalized expected: {}", expected);

    if loaded != expected {
        warn!("Mission mismatch: expected {} | found {}", expected, loaded);
        return TimeReading::unmatched();
    }

    let time_text = time_text.trim().to_string();
    let seconds = parse_hms(&time_text);
    if seconds.is_none() {
        warn!("Mission time {:?} is not in H:MM:SS form", time_text);
    }
    TimeReading {
        matched: true,
        time_text: Some(time_text),
        seconds,
    }
}

/// Source of the elapsed mission time on the running server.
#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn read(&self, expected_mission: &Path) -> TimeReading;
}

/// A reading supplied up front, e.g. from the command line.
pub struct StaticTimeSource {
    /// Mission the value belongs to; `None` means the configured mission.
    pub loaded_mission: Option<String>,
    pub time_text: String,
}

#[async_trait]
impl TimeSource for StaticTimeSource {
    async fn read(&self, expected_mission: &Path) -> TimeReading {
        let loaded = self
            .loaded_mission
            .clone()
            .unwrap_or_else(|| expected_mission.to_string_lossy().to_string());
        evaluate_reading(expected_mission, &loaded, &self.time_text)
    }
}

#[derive(Debug, Deserialize)]
struct ScraperReport {
    loaded_mission: String,
    mission_time: String,
}

/// Runs an external scraper. The expected mission path is appended as the last
/// argument and the scraper prints
/// `{"loaded_mission": "...", "mission_time": "H:MM:SS"}` on stdout.
pub struct CommandTimeSource {
    argv: Vec<String>,
    timeout: Duration,
}

const SCRAPER_TIMEOUT: Duration = Duration::from_secs(180);

impl CommandTimeSource {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: SCRAPER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TimeSource for CommandTimeSource {
    async fn read(&self, expected_mission: &Path) -> TimeReading {
        let Some((program, args)) = self.argv.split_first() else {
            error!("No time_source_command configured");
            return TimeReading::unmatched();
        };
        info!("Starting mission time extraction via {}", program);

        let mut cmd = Command::new(program);
        cmd.args(args).arg(expected_mission).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Time extraction could not start {}: {}", program, e);
                return TimeReading::unmatched();
            }
            Err(_) => {
                error!("Time extraction timed out after {:?}", self.timeout);
                return TimeReading::unmatched();
            }
        };

        if !output.status.success() {
            error!(
                "Time extraction failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return TimeReading::unmatched();
        }

        let report: ScraperReport = match serde_json::from_slice(&output.stdout) {
            Ok(report) => report,
            Err(e) => {
                error!("Time extraction produced unreadable output: {}", e);
                return TimeReading::unmatched();
            }
        };
        info!("Loaded mission: {}", report.loaded_mission);
        evaluate_reading(expected_mission, &report.loaded_mission, &report.mission_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_unifies_separators_and_case() {
        assert_eq!(
            normalize_mission_path("C:\\Missions\\Foo.miz"),
            normalize_mission_path("c:/missions/foo.miz")
        );
        assert_eq!(normalize_mission_path(" C:\\\\Saved\\X.miz "), "c:/saved/x.miz");
    }

    #[test]
    fn hms_conversion() {
        assert_eq!(parse_hms("10:00:00"), Some(36_000));
        assert_eq!(parse_hms(" 1:02:03 "), Some(3_723));
        assert_eq!(parse_hms("25:00:00"), Some(90_000));
        assert_eq!(parse_hms("10:00"), None);
        assert_eq!(parse_hms("1:2:3:4"), None);
        assert_eq!(parse_hms("aa:bb:cc"), None);
        assert_eq!(parse_hms(""), None);
    }

    #[test]
    fn mismatched_mission_is_unmatched() {
        let reading = evaluate_reading(
            Path::new("C:\\Missions\\Foo.miz"),
            "c:/missions/bar.miz",
            "01:00:00",
        );
        assert_eq!(reading, TimeReading::unmatched());
    }

    #[test]
    fn matching_mission_yields_seconds() {
        let reading = evaluate_reading(
            Path::new("C:\\Missions\\Foo.miz"),
            "c:/missions/foo.miz",
            "01:00:00",
        );
        assert!(reading.matched);
        assert_eq!(reading.time_text.as_deref(), Some("01:00:00"));
        assert_eq!(reading.seconds, Some(3_600));
    }

    #[test]
    fn malformed_time_is_matched_without_seconds() {
        let reading = evaluate_reading(Path::new("m.miz"), "M.MIZ", "soon");
        assert!(reading.matched);
        assert_eq!(reading.seconds, None);
    }

    #[tokio::test]
    async fn static_source_defaults_to_configured_mission() {
        let source = StaticTimeSource {
            loaded_mission: None,
            time_text: "00:00:30".to_string(),
        };
        let reading = source.read(Path::new("/srv/missions/a.miz")).await;
        assert_eq!(reading.seconds, Some(30));
    }

    #[tokio::test]
    async fn empty_command_is_unmatched() {
        let source = CommandTimeSource::new(Vec::new());
        assert!(!source.read(Path::new("a.miz")).await.matched);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_source_parses_scraper_report() {
        let source = CommandTimeSource::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"printf '{"loaded_mission": "%s", "mission_time": "02:00:05"}' "$0""#.to_string(),
        ]);
        let reading = source.read(Path::new("/srv/Missions/A.miz")).await;
        assert!(reading.matched);
        assert_eq!(reading.seconds, Some(7_205));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_source_failure_is_unmatched() {
        let source = CommandTimeSource::new(vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()])
            .with_timeout(Duration::from_secs(10));
        assert!(!source.read(Path::new("a.miz")).await.matched);
    }
}
