use anyhow::Result;
use std::path::Path;

use crate::core::config::PersistenceConfig;
use crate::core::supervisor::{NativeProcessControl, ProcessControl};
use crate::core::terminal::{print_error, print_status, print_step, print_success, print_warn};
use crate::core::weather::{WeatherPool, WeatherSelector};

/// Check everything a run depends on without touching the server or the archive.
pub async fn run_doctor(config_path: &Path) -> Result<()> {
    print_step("mizkeeper Doctor - Checking the persistence setup...");
    println!();

    // 1. Config
    let config = match PersistenceConfig::load(config_path) {
        Ok(config) => {
            print_success(&format!("Config loaded: {}", config_path.display()));
            config
        }
        Err(e) => {
            print_error(&format!("{}", e));
            return Ok(());
        }
    };
    print_status("Hour persistence", &config.hour_persistence_enabled.to_string());
    print_status("Weather rotation", &config.weather_rotation_enabled.to_string());
    print_status("Season", &config.season.to_string());
    print_status(
        "Bad weather chance",
        &format!("{}%", config.bad_weather_percentage),
    );

    let mut problems = 0usize;

    // 2. Mission archive
    if config.mission_path.is_file() {
        print_success(&format!("Mission archive found: {}", config.mission_path.display()));
    } else {
        print_error(&format!("Mission archive missing: {}", config.mission_path.display()));
        problems += 1;
    }

    // 3. Archive tool
    match std::process::Command::new(&config.seven_zip_path).output() {
        Ok(out) => {
            let banner = String::from_utf8_lossy(&out.stdout)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or_default()
                .to_string();
            print_success(&format!("7-Zip is available: {}", banner));
        }
        Err(e) => {
            print_error(&format!(
                "7-Zip could not be run ({}): {}",
                config.seven_zip_path.display(),
                e
            ));
            problems += 1;
        }
    }

    // 4. Server executable
    if config.server_executable.is_file() {
        print_success(&format!("Server executable found: {}", config.server_executable.display()));
    } else {
        print_warn(&format!(
            "Server executable not found: {} (restarts will fail)",
            config.server_executable.display()
        ));
        problems += 1;
    }

    // 5. Weather pools
    if config.weather_rotation_enabled {
        let selector = WeatherSelector::new(config.weather_templates_dir.clone());
        for pool in [WeatherPool::Bad, WeatherPool::Good] {
            let count = selector.candidates(pool).len();
            if count == 0 {
                print_warn(&format!(
                    "No templates in {} (a {} weather draw will fail)",
                    selector.pool_dir(pool).display(),
                    pool
                ));
                problems += 1;
            } else {
                print_success(&format!("{} {} weather template(s)", count, pool));
            }
        }
    }

    // 6. Time source
    if config.hour_persistence_enabled && config.time_source_command.is_empty() {
        print_warn("Hour persistence is enabled but time_source_command is empty.");
        problems += 1;
    }

    // 7. Server process
    match NativeProcessControl.find_pids(&config.server_process_name) {
        Ok(pids) if pids.is_empty() => {
            print_status(&config.server_process_name, "not running");
        }
        Ok(pids) => {
            print_status(&config.server_process_name, &format!("running (PID {})", pids[0]));
        }
        Err(e) => {
            print_warn(&format!("Could not list processes: {}", e));
        }
    }

    // 8. Notifications
    let notifications = &config.notifications;
    if !notifications.send_errors_to_discord {
        print_status("Discord", "disabled");
    } else if notifications.error_discord_webhook.trim().is_empty() {
        print_warn("Discord notifications enabled but the webhook URL is empty.");
        problems += 1;
    } else {
        print_status("Discord", "webhook configured");
    }

    println!();
    if problems == 0 {
        print_success("Everything looks ready.");
    } else {
        print_error(&format!("{} problem(s) found. Please check the output above.", problems));
    }
    Ok(())
}
