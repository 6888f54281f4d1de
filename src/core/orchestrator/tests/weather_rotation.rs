use super::{BAD_TEMPLATE, DESCRIPTOR, FakeArchive, GOOD_TEMPLATE, Harness};
use crate::core::error::PersistenceError;
use crate::core::season::{Season, SeasonDate};
use crate::core::supervisor::StopOutcome;
use crate::core::weather::{GOOD_WEATHER_DIR, WeatherPool};
use crate::interfaces::notifier::Severity;

const WINTER_DATE: &str = "[\"date\"] = \n\t{\n\t\t[\"Day\"] = 1,\n\t\t[\"Year\"] = 2025,\n\t\t[\"Month\"] = 2,\n\t}, -- end of [\"date\"]";

#[tokio::test]
async fn winter_with_certain_bad_weather() {
    let h = Harness::new(FakeArchive::with_entry(DESCRIPTOR), Harness::running());

    let report = h
        .mutator
        .rotate_weather_on(SeasonDate::new(2025, 2, 1), &Season::Winter, 100)
        .await
        .unwrap();

    assert_eq!(report.pool, WeatherPool::Bad);
    assert_eq!(report.date, SeasonDate::new(2025, 2, 1));
    assert!(report.template.ends_with("storm.config"));
    assert_eq!(report.server, StopOutcome::Stopped(1234));

    let entry = h.archive.entry();
    assert!(entry.contains(WINTER_DATE), "{}", entry);
    assert!(entry.contains(BAD_TEMPLATE));
    assert!(!entry.contains("Preset3"));
    assert!(!entry.contains("[\"Year\"] = 2016"));
    assert!(entry.contains("\t[\"start_time\"] = 36000,"));
    assert!(entry.ends_with("} -- end of mission\n"));
    assert_eq!(h.processes.spawned().len(), 1);
    assert_eq!(
        h.notifier.messages()[0],
        (
            Severity::Info,
            "DCS server stopped to apply dynamic weather rotation.".to_string()
        )
    );
}

#[tokio::test]
async fn zero_percentage_always_draws_good_weather() {
    let h = Harness::new(FakeArchive::with_entry(DESCRIPTOR), Harness::stopped());

    let report = h
        .mutator
        .rotate_weather_on(SeasonDate::new(2025, 8, 1), &Season::Summer, -20)
        .await
        .unwrap();

    assert_eq!(report.pool, WeatherPool::Good);
    assert!(h.archive.entry().contains(GOOD_TEMPLATE));
}

#[tokio::test]
async fn unknown_season_uses_fallback_date() {
    let h = Harness::new(FakeArchive::with_entry(DESCRIPTOR), Harness::stopped());

    let season: Season = "bogus".parse().unwrap();
    let report = h.mutator.rotate_weather(&season, 0).await.unwrap();

    assert_eq!(report.date, SeasonDate::FALLBACK);
    assert!(h.archive.entry().contains("[\"Month\"] = 9,"));
}

#[tokio::test]
async fn empty_pool_aborts_and_restarts_server() {
    let h = Harness::new(FakeArchive::with_entry(DESCRIPTOR), Harness::running());
    std::fs::remove_file(h.weather_dir(GOOD_WEATHER_DIR).join("clear.config")).unwrap();

    let err = h
        .mutator
        .rotate_weather_on(SeasonDate::new(2025, 5, 1), &Season::Spring, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, PersistenceError::NoTemplatesAvailable(_)));
    assert_eq!(h.archive.calls(), vec!["extract mission"]);
    assert_eq!(h.archive.entry(), DESCRIPTOR);
    assert_eq!(h.processes.spawned().len(), 1);
    assert_eq!(h.notifier.count(Severity::Error), 1);
}

#[tokio::test]
async fn missing_date_block_is_fatal() {
    let without_date = "mission = \n{\n\t[\"weather\"] = \n\t{\n\t}, -- end of [\"weather\"]\n}\n";
    let h = Harness::new(FakeArchive::with_entry(without_date), Harness::stopped());

    let err = h
        .mutator
        .rotate_weather_on(SeasonDate::new(2025, 10, 1), &Season::Autumn, 50)
        .await
        .unwrap_err();

    assert!(matches!(err, PersistenceError::BlockNotFound(_)));
    assert_eq!(h.archive.entry(), without_date);
}

#[tokio::test]
async fn missing_weather_block_is_fatal() {
    let without_weather = "mission = \n{\n\t[\"date\"] = \n\t{\n\t\t[\"Year\"] = 2016,\n\t}, -- end of [\"date\"]\n}\n";
    let h = Harness::new(FakeArchive::with_entry(without_weather), Harness::stopped());

    let err = h
        .mutator
        .rotate_weather_on(SeasonDate::new(2025, 10, 1), &Season::Autumn, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, PersistenceError::BlockNotFound(_)));
    assert!(!h.archive.calls().contains(&"update".to_string()));
}
