//! Listening context and the score modifiers derived from it.
//!
//! Weather, activity and time of day each contribute a layer of directional
//! hints. Weather and time-of-day layers add to the running modifiers; the
//! activity layer overwrites the fields it names.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Weather {
    #[default]
    Sunny,
    Rainy,
    Cloudy,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    #[default]
    Relaxing,
    WorkingOut,
    Focusing,
    Partying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDay {
    Morning,
    #[default]
    Afternoon,
    Evening,
    Night,
}

impl Weather {
    /// Classify a WMO weather code as reported by the weather lookup.
    #[must_use]
    pub const fn from_wmo_code(code: u16, is_day: bool) -> Self {
        match code {
            0 | 1 if is_day => Self::Sunny,
            0 | 1 => Self::Clear,
            2 | 3 | 45 | 48 | 71..=77 | 85 | 86 => Self::Cloudy,
            51..=67 | 80..=82 | 95..=99 => Self::Rainy,
            _ => Self::Clear,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Rainy => "rainy",
            Self::Cloudy => "cloudy",
            Self::Clear => "clear",
        }
    }
}

impl Activity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Relaxing => "relaxing",
            Self::WorkingOut => "working-out",
            Self::Focusing => "focusing",
            Self::Partying => "partying",
        }
    }
}

impl TimeOfDay {
    /// Bucket a local hour (0-23).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => Self::Night,
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '_'], "-")
}

impl FromStr for Weather {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "sunny" => Ok(Self::Sunny),
            "rainy" => Ok(Self::Rainy),
            "cloudy" => Ok(Self::Cloudy),
            "clear" => Ok(Self::Clear),
            _ => Err(EngineError::InvalidContext(format!("weather `{s}'"))),
        }
    }
}

impl FromStr for Activity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "relaxing" => Ok(Self::Relaxing),
            "working-out" | "workout" => Ok(Self::WorkingOut),
            "focusing" => Ok(Self::Focusing),
            "partying" | "party" => Ok(Self::Partying),
            _ => Err(EngineError::InvalidContext(format!("activity `{s}'"))),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "night" => Ok(Self::Night),
            _ => Err(EngineError::InvalidContext(format!("time of day `{s}'"))),
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Environmental context supplied by the caller or a lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub weather: Weather,
    pub activity: Activity,
    pub time_of_day: TimeOfDay,
    pub location: String,
    /// Ambient temperature, informational only
    pub temperature: f64,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            weather: Weather::default(),
            activity: Activity::default(),
            time_of_day: TimeOfDay::default(),
            location: "home".to_string(),
            temperature: 72.0,
        }
    }
}

impl Context {
    #[must_use]
    pub fn new(weather: Weather, activity: Activity, time_of_day: TimeOfDay) -> Self {
        Self {
            weather,
            activity,
            time_of_day,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn modifiers(&self) -> ContextModifiers {
        ContextModifiers::from_context(self)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} weather, {} in the {} at {}",
            self.weather, self.activity, self.time_of_day, self.location
        )
    }
}

/// Signed directional hints fed into the context part of the track score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextModifiers {
    pub energy_boost: f64,
    pub valence_boost: f64,
    pub tempo_boost: f64,
    pub acoustic_boost: f64,
}

impl ContextModifiers {
    /// Deterministic mapping from context to modifiers.
    #[must_use]
    pub fn from_context(context: &Context) -> Self {
        let mut m = Self::default();

        match context.weather {
            Weather::Rainy => {
                m.acoustic_boost += 0.3;
                m.valence_boost -= 0.2;
                m.energy_boost -= 0.2;
            }
            Weather::Sunny => {
                m.valence_boost += 0.3;
                m.energy_boost += 0.2;
            }
            Weather::Cloudy | Weather::Clear => {}
        }

        match context.activity {
            Activity::WorkingOut => {
                m.energy_boost = 0.5;
                m.tempo_boost = 0.4;
            }
            Activity::Relaxing => {
                m.energy_boost = -0.3;
                m.acoustic_boost = 0.4;
            }
            Activity::Focusing => {
                m.acoustic_boost = 0.2;
                m.energy_boost = -0.1;
            }
            Activity::Partying => {}
        }

        match context.time_of_day {
            TimeOfDay::Morning => {
                m.energy_boost += 0.2;
                m.valence_boost += 0.2;
            }
            TimeOfDay::Night => {
                m.energy_boost -= 0.2;
                m.acoustic_boost += 0.2;
            }
            TimeOfDay::Afternoon | TimeOfDay::Evening => {}
        }

        m
    }
}
