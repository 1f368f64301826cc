//! Season identity and race-year bucketing.
//!
//! A season is one quarter of a race year. The race year spans the winter
//! boundary: Fall and Winter of calendar year N belong to race year N+1,
//! Spring and Summer of calendar year N to race year N.

pub mod windows;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One of the four competition seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Fall,
    Winter,
    Spring,
    Summer,
}

impl Season {
    /// Lowercase name used in storage keys and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Fall => "fall",
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
        }
    }

    /// Parse a season name (case-insensitive).
    pub fn parse(s: &str) -> Option<Season> {
        match s.to_lowercase().as_str() {
            "fall" => Some(Season::Fall),
            "winter" => Some(Season::Winter),
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one season of one calendar year, e.g. `2025-fall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeasonKey {
    /// Calendar year the season starts in.
    pub year: i32,
    pub season: Season,
}

impl SeasonKey {
    pub fn new(year: i32, season: Season) -> Self {
        Self { year, season }
    }

    /// Race year this season counts toward.
    ///
    /// Fall and Winter efforts of calendar year N score in race year N+1;
    /// Spring and Summer efforts of calendar year N score in race year N.
    pub fn race_year(&self) -> i32 {
        match self.season {
            Season::Fall | Season::Winter => self.year + 1,
            Season::Spring | Season::Summer => self.year,
        }
    }

    /// The four season keys of a race year, in Fall-to-Summer order.
    pub fn race_year_keys(race_year: i32) -> [SeasonKey; 4] {
        [
            SeasonKey::new(race_year - 1, Season::Fall),
            SeasonKey::new(race_year - 1, Season::Winter),
            SeasonKey::new(race_year, Season::Spring),
            SeasonKey::new(race_year, Season::Summer),
        ]
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.season)
    }
}

/// Error parsing a season key string.
#[derive(Debug, thiserror::Error)]
#[error("invalid season key: {0}")]
pub struct ParseSeasonKeyError(String);

impl FromStr for SeasonKey {
    type Err = ParseSeasonKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, season) = s
            .split_once('-')
            .ok_or_else(|| ParseSeasonKeyError(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| ParseSeasonKeyError(s.to_string()))?;
        let season = Season::parse(season).ok_or_else(|| ParseSeasonKeyError(s.to_string()))?;
        Ok(SeasonKey::new(year, season))
    }
}

// Season keys serialize as their display string so they can be used as
// JSON map keys.
impl Serialize for SeasonKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeasonKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
