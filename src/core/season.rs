use chrono::{Datelike, Local, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Season tag as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Season {
    Realistic,
    Summer,
    Winter,
    Autumn,
    Spring,
    Other(String),
}

impl FromStr for Season {
    type Err = std::convert::Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag {
            "realistic" => Season::Realistic,
            "summer" => Season::Summer,
            "winter" => Season::Winter,
            "autumn" => Season::Autumn,
            "spring" => Season::Spring,
            other => Season::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Realistic => write!(f, "realistic"),
            Season::Summer => write!(f, "summer"),
            Season::Winter => write!(f, "winter"),
            Season::Autumn => write!(f, "autumn"),
            Season::Spring => write!(f, "spring"),
            Season::Other(tag) => write!(f, "{}", tag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl SeasonDate {
    pub const FALLBACK: SeasonDate = SeasonDate::new(2025, 9, 1);

    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Resolve a season against a reference day. Only `Realistic` looks at `today`.
    pub fn for_season_on(season: &Season, today: NaiveDate) -> Self {
        match season {
            Season::Realistic => Self::new(today.year(), today.month(), today.day()),
            Season::Summer => Self::new(2025, 8, 1),
            Season::Winter => Self::new(2025, 2, 1),
            Season::Autumn => Self::new(2025, 10, 1),
            Season::Spring => Self::new(2025, 5, 1),
            Season::Other(_) => Self::FALLBACK,
        }
    }

    pub fn for_season(season: &Season) -> Self {
        Self::for_season_on(season, Local::now().date_naive())
    }
}

impl fmt::Display for SeasonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.day, self.month, self.year)
    }
}
