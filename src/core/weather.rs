use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::core::error::{PersistenceError, PersistenceResult};

pub const BAD_WEATHER_DIR: &str = "bad_weather";
pub const GOOD_WEATHER_DIR: &str = "good_weather";
const TEMPLATE_EXTENSION: &str = "config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherPool {
    Bad,
    Good,
}

impl fmt::Display for WeatherPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherPool::Bad => write!(f, "bad"),
            WeatherPool::Good => write!(f, "good"),
        }
    }
}

/// A pre-authored `["weather"]` block read from one of the pools.
#[derive(Debug, Clone)]
pub struct WeatherTemplate {
    pub pool: WeatherPool,
    pub path: PathBuf,
    pub text: String,
}

/// Picks weather templates from `<root>/bad_weather` and `<root>/good_weather`.
#[derive(Debug, Clone)]
pub struct WeatherSelector {
    root: PathBuf,
}

pub fn clamp_percentage(weight: i64) -> u8 {
    weight.clamp(0, 100) as u8
}

impl WeatherSelector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pool_dir(&self, pool: WeatherPool) -> PathBuf {
        match pool {
            WeatherPool::Bad => self.root.join(BAD_WEATHER_DIR),
            WeatherPool::Good => self.root.join(GOOD_WEATHER_DIR),
        }
    }

    /// Roll 1..=100; a roll at or below the clamped weight picks the bad pool.
    pub fn roll_pool<R: Rng>(bad_weight: i64, rng: &mut R) -> WeatherPool {
        let weight = clamp_percentage(bad_weight);
        let roll: u8 = rng.gen_range(1..=100);
        info!("Bad weather percentage: {}%. Roll: {}", weight, roll);
        if roll <= weight {
            WeatherPool::Bad
        } else {
            WeatherPool::Good
        }
    }

    /// Candidate template files of a pool, sorted for stable listings.
    pub fn candidates(&self, pool: WeatherPool) -> Vec<PathBuf> {
        let dir = self.pool_dir(pool);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_template_extension(path))
            .collect();
        files.sort();
        files
    }

    pub fn choose(&self, bad_weight: i64) -> PersistenceResult<WeatherTemplate> {
        self.choose_with(bad_weight, &mut rand::thread_rng())
    }

    /// Never falls back to the other pool when the chosen one is empty.
    pub fn choose_with<R: Rng>(
        &self,
        bad_weight: i64,
        rng: &mut R,
    ) -> PersistenceResult<WeatherTemplate> {
        let pool = Self::roll_pool(bad_weight, rng);
        let dir = self.pool_dir(pool);
        info!("Selecting {} weather template from {}", pool, dir.display());

        let candidates = self.candidates(pool);
        let Some(path) = candidates.choose(rng) else {
            error!("No .config weather templates found in {}", dir.display());
            return Err(PersistenceError::NoTemplatesAvailable(dir));
        };

        let bytes = std::fs::read(path).map_err(|e| {
            PersistenceError::io(format!("failed to read weather template {}", path.display()), e)
        })?;
        info!("Selected weather template: {}", path.display());

        Ok(WeatherTemplate {
            pool,
            path: path.clone(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
}
