mod doctor;

use anyhow::{Result, bail};
use console::style;
use std::path::PathBuf;
use tracing::error;

use crate::core::config::PersistenceConfig;
use crate::core::orchestrator::{MissionMutator, RunSummary, run_workflows};
use crate::core::season::Season;
use crate::core::terminal::{self, GuideSection, print_error, print_info, print_success};
use crate::core::weather::clamp_percentage;
use crate::interfaces::notifier;
use crate::interfaces::time_source::{CommandTimeSource, StaticTimeSource, TimeSource};
use crate::logging::{DEFAULT_LOG_FILE, init_logging};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Workflows")
        .command("run", "Run every workflow enabled in the config (default)")
        .command(
            "persist-time",
            "Advance the mission start time by --time HH:MM:SS",
        )
        .command(
            "rotate-weather",
            "Set the season date and draw a new weather block",
        )
        .print();

    GuideSection::new("Diagnostics")
        .command("doctor", "Check config, archive tool, server and templates")
        .command("help", "Show this help")
        .print();

    GuideSection::new("Options")
        .command("--config <path>", "Config file (or MIZKEEPER_CONFIG)")
        .command("--log <path>", "Log file, appended to (default persistence.log)")
        .command("--mission <path>", "persist-time: mission the time was read from")
        .command("--season <tag>", "rotate-weather: realistic, summer, winter, autumn, spring")
        .command("--bad-weather <pct>", "rotate-weather: bad weather chance, 0-100")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("mizkeeper").green()
    );
}

/// Flags shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub log: PathBuf,
}

pub(crate) fn parse_global_flags(args: &[String], start: usize) -> GlobalArgs {
    let mut config = None;
    let mut log = PathBuf::from(DEFAULT_LOG_FILE);
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--log" => {
                if i + 1 < args.len() {
                    log = PathBuf::from(&args[i + 1]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    GlobalArgs { config, log }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PersistTimeArgs {
    pub time: String,
    pub mission: Option<String>,
}

pub(crate) fn parse_persist_time_args(args: &[String], start: usize) -> PersistTimeArgs {
    let mut time = String::new();
    let mut mission = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--time" | "-t" => {
                if i + 1 < args.len() {
                    time = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--mission" | "-m" => {
                if i + 1 < args.len() {
                    mission = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    PersistTimeArgs { time, mission }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RotateWeatherArgs {
    pub season: Option<Season>,
    pub bad_weather: Option<i64>,
}

pub(crate) fn parse_rotate_weather_args(args: &[String], start: usize) -> Result<RotateWeatherArgs> {
    let mut season = None;
    let mut bad_weather = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--season" | "-s" => {
                if i + 1 < args.len() {
                    season = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--bad-weather" | "-b" => {
                if i + 1 < args.len() {
                    let raw = &args[i + 1];
                    let Ok(pct) = raw.trim().parse::<i64>() else {
                        bail!("--bad-weather expects a whole percentage, got '{}'", raw);
                    };
                    bad_weather = Some(pct);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    Ok(RotateWeatherArgs {
        season,
        bad_weather,
    })
}

/// The command is the first argument unless it is a flag; `run` otherwise.
pub(crate) fn split_command(args: &[String]) -> (&str, usize) {
    match args.get(1) {
        Some(cmd) if !cmd.starts_with('-') || matches!(cmd.as_str(), "--help" | "-h") => {
            (cmd.as_str(), 2)
        }
        _ => ("run", 1),
    }
}

fn load_config(global: &GlobalArgs) -> Result<PersistenceConfig> {
    let path = PersistenceConfig::resolve_path(global.config.as_deref());
    PersistenceConfig::load(&path).map_err(|e| {
        error!("Config error, aborting run: {}", e);
        e.into()
    })
}

fn print_summary(summary: &RunSummary) {
    if summary.is_noop() {
        print_info("Both hour persistence and weather rotation are disabled. Nothing to do.");
        return;
    }
    if let Some(time) = &summary.time {
        print_success(&format!(
            "start_time {} -> {}",
            time.previous, time.updated
        ));
    }
    if let Some(weather) = &summary.weather {
        print_success(&format!(
            "date {} with {} weather from {}",
            weather.date,
            weather.pool,
            weather.template.display()
        ));
    }
}

async fn execute(config: &PersistenceConfig, source: &dyn TimeSource) -> Result<()> {
    let mutator = MissionMutator::from_config(config, notifier::from_settings(&config.notifications));
    let summary = run_workflows(config, &mutator, source).await?;
    print_summary(&summary);
    Ok(())
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (cmd, start) = split_command(&args);

    if matches!(cmd, "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }
    if !matches!(cmd, "run" | "persist-time" | "rotate-weather" | "doctor") {
        print_error(&format!("Unknown command: {}", cmd));
        print_help();
        return Ok(());
    }

    let global = parse_global_flags(&args, start);
    if cmd == "doctor" {
        doctor::run_doctor(&PersistenceConfig::resolve_path(global.config.as_deref())).await?;
        return Ok(());
    }

    init_logging(&global.log, false)?;
    let mut config = load_config(&global)?;

    match cmd {
        "persist-time" => {
            let parsed = parse_persist_time_args(&args, start);
            if parsed.time.is_empty() {
                print_help();
                bail!("--time HH:MM:SS is required for persist-time");
            }
            config.hour_persistence_enabled = true;
            config.weather_rotation_enabled = false;
            let source = StaticTimeSource {
                loaded_mission: parsed.mission,
                time_text: parsed.time,
            };
            execute(&config, &source).await
        }
        "rotate-weather" => {
            let parsed = parse_rotate_weather_args(&args, start)?;
            if let Some(season) = parsed.season {
                config.season = season;
            }
            if let Some(pct) = parsed.bad_weather {
                config.bad_weather_percentage = clamp_percentage(pct);
            }
            config.hour_persistence_enabled = false;
            config.weather_rotation_enabled = true;
            let source = StaticTimeSource {
                loaded_mission: None,
                time_text: String::new(),
            };
            execute(&config, &source).await
        }
        _ => {
            let source = CommandTimeSource::new(config.time_source_command.clone());
            execute(&config, &source).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_command_defaults_to_run() {
        assert_eq!(split_command(&argv(&["mizkeeper"])), ("run", 1));
        assert_eq!(
            split_command(&argv(&["mizkeeper", "--config", "x.json"])),
            ("run", 1)
        );
        assert_eq!(split_command(&argv(&["mizkeeper", "doctor"])), ("doctor", 2));
        assert_eq!(split_command(&argv(&["mizkeeper", "-h"])), ("-h", 2));
    }

    #[test]
    fn parse_global_flags_reads_config_and_log() {
        let args = argv(&["mizkeeper", "run", "--config", "cfg.json", "--log", "out.log"]);
        let parsed = parse_global_flags(&args, 2);
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(parsed.log, PathBuf::from("out.log"));

        let parsed = parse_global_flags(&argv(&["mizkeeper"]), 1);
        assert_eq!(parsed.config, None);
        assert_eq!(parsed.log, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn parse_persist_time_args_reads_time_and_mission() {
        let args = argv(&[
            "mizkeeper",
            "persist-time",
            "--time",
            "10:30:00",
            "--mission",
            "C:\\Missions\\Foo.miz",
        ]);
        let parsed = parse_persist_time_args(&args, 2);
        assert_eq!(parsed.time, "10:30:00");
        assert_eq!(parsed.mission.as_deref(), Some("C:\\Missions\\Foo.miz"));
    }

    #[test]
    fn parse_rotate_weather_args_reads_season_and_percentage() {
        let args = argv(&["mizkeeper", "rotate-weather", "--season", "winter", "--bad-weather", "70"]);
        let parsed = parse_rotate_weather_args(&args, 2).unwrap();
        assert_eq!(parsed.season, Some(Season::Winter));
        assert_eq!(parsed.bad_weather, Some(70));

        let parsed = parse_rotate_weather_args(&argv(&["mizkeeper", "rotate-weather"]), 2).unwrap();
        assert_eq!(parsed.bad_weather, None);
    }

    #[test]
    fn non_numeric_bad_weather_is_rejected() {
        for value in ["lots", "12.5", ""] {
            let args = argv(&["mizkeeper", "rotate-weather", "--bad-weather", value]);
            let err = parse_rotate_weather_args(&args, 2).unwrap_err();
            assert!(err.to_string().contains("--bad-weather"), "{}", err);
        }
    }
}
