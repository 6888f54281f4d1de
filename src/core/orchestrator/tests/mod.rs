mod weather_rotation;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::archive::ArchiveEditor;
use crate::core::error::{PersistenceError, PersistenceResult};
use crate::core::orchestrator::MissionMutator;
use crate::core::supervisor::ProcessSupervisor;
use crate::core::supervisor::testing::FakeProcesses;
use crate::core::weather::{BAD_WEATHER_DIR, GOOD_WEATHER_DIR, WeatherSelector};
use crate::interfaces::notifier::testing::RecordingNotifier;

pub(super) const SERVER: &str = "DCS_server.exe";

pub(super) const DESCRIPTOR: &str = "mission = \n{\n\t[\"trig\"] = \n\t{\n\t\t[\"start_time\"] = 100,\n\t}, -- end of [\"trig\"]\n\t[\"date\"] = \n\t{\n\t\t[\"Year\"] = 2016,\n\t\t[\"Day\"] = 14,\n\t\t[\"Month\"] = 6,\n\t}, -- end of [\"date\"]\n\t[\"weather\"] = \n\t{\n\t\t[\"clouds\"] = \n\t\t{\n\t\t\t[\"preset\"] = \"Preset3\",\n\t\t}, -- end of [\"clouds\"]\n\t}, -- end of [\"weather\"]\n\t[\"start_time\"] = 36000,\n} -- end of mission\n";

pub(super) const BAD_TEMPLATE: &str = "[\"weather\"] = \n\t{\n\t\t[\"name\"] = \"storm\",\n\t}, -- end of [\"weather\"]";
pub(super) const GOOD_TEMPLATE: &str = "[\"weather\"] = \n\t{\n\t\t[\"name\"] = \"clear\",\n\t}, -- end of [\"weather\"]";

/// Archive whose single `mission` entry lives in memory.
#[derive(Default)]
pub(super) struct FakeArchive {
    pub entry: Mutex<Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
    pub scratch_dirs: Mutex<Vec<PathBuf>>,
    pub fail_extract: bool,
    pub fail_update: bool,
}

impl FakeArchive {
    pub fn with_entry(text: &str) -> Self {
        Self::with_bytes(text.as_bytes().to_vec())
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            entry: Mutex::new(bytes),
            ..Self::default()
        }
    }

    pub fn entry(&self) -> String {
        String::from_utf8(self.entry_bytes()).unwrap()
    }

    pub fn entry_bytes(&self) -> Vec<u8> {
        self.entry.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        self.scratch_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveEditor for FakeArchive {
    async fn extract_entry(
        &self,
        archive: &Path,
        entry: &str,
        dest_dir: &Path,
    ) -> PersistenceResult<PathBuf> {
        self.calls.lock().unwrap().push(format!("extract {}", entry));
        self.scratch_dirs.lock().unwrap().push(dest_dir.to_path_buf());
        if self.fail_extract {
            return Err(PersistenceError::ExtractionFailed {
                archive: archive.to_path_buf(),
                entry: entry.to_string(),
                detail: "exit status 1: Can not open the file as archive".to_string(),
            });
        }
        let path = dest_dir.join(entry);
        std::fs::write(&path, self.entry_bytes()).unwrap();
        Ok(path)
    }

    async fn update_entry(&self, archive: &Path, entry_path: &Path) -> PersistenceResult<()> {
        self.calls.lock().unwrap().push("update".to_string());
        if self.fail_update {
            return Err(PersistenceError::RepackFailed {
                archive: archive.to_path_buf(),
                entry: entry_path.to_path_buf(),
                detail: "exit status 2".to_string(),
            });
        }
        *self.entry.lock().unwrap() = std::fs::read(entry_path).unwrap();
        Ok(())
    }
}

pub(super) struct Harness {
    pub dir: tempfile::TempDir,
    pub archive: Arc<FakeArchive>,
    pub processes: Arc<FakeProcesses>,
    pub notifier: Arc<RecordingNotifier>,
    pub mutator: MissionMutator,
}

impl Harness {
    pub fn new(archive: FakeArchive, processes: FakeProcesses) -> Self {
        Self::with_notifier(archive, processes, RecordingNotifier::default())
    }

    pub fn with_notifier(
        archive: FakeArchive,
        processes: FakeProcesses,
        notifier: RecordingNotifier,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("Foo.miz");
        std::fs::write(&archive_path, b"PK\x03\x04").unwrap();

        let weather = dir.path().join("weather");
        std::fs::create_dir_all(weather.join(BAD_WEATHER_DIR)).unwrap();
        std::fs::create_dir_all(weather.join(GOOD_WEATHER_DIR)).unwrap();
        std::fs::write(weather.join(BAD_WEATHER_DIR).join("storm.config"), BAD_TEMPLATE).unwrap();
        std::fs::write(weather.join(GOOD_WEATHER_DIR).join("clear.config"), GOOD_TEMPLATE).unwrap();

        let archive = Arc::new(archive);
        let processes = Arc::new(processes);
        let notifier = Arc::new(notifier);
        let supervisor = ProcessSupervisor::new(
            processes.clone(),
            notifier.clone(),
            SERVER,
            "/opt/dcs/bin/DCS_server.exe",
        )
        .with_quiescence(Duration::ZERO);
        let mutator = MissionMutator::new(
            archive_path,
            archive.clone(),
            supervisor,
            WeatherSelector::new(weather),
            notifier.clone(),
        );

        Self {
            dir,
            archive,
            processes,
            notifier,
            mutator,
        }
    }

    pub fn weather_dir(&self, pool: &str) -> PathBuf {
        self.dir.path().join("weather").join(pool)
    }

    pub fn running() -> FakeProcesses {
        FakeProcesses::running(&[(900, "explorer.exe"), (1234, SERVER)])
    }

    pub fn stopped() -> FakeProcesses {
        FakeProcesses::running(&[(900, "explorer.exe")])
    }
}
