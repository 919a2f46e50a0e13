//! # Behavior Tracking
//!
//! Keeps the append-only log of listening events and derives the listener's
//! skip tolerance from it.
//!
//! Once at least `min_events` (5) events exist, every new event triggers a
//! recompute over the trailing `window` (10) events:
//!
//! | rule (first match wins)     | threshold | patience |
//! |-----------------------------|-----------|----------|
//! | avg completion > 0.7        | 0.2       | high     |
//! | avg completion < 0.4        | 0.5       | low      |
//! | early skip rate > 0.5       | 0.4       | low      |
//! | otherwise                   | 0.3       | medium   |
//!
//! Lifetime skip counters are taken over the full history. Below
//! `min_events` the profile keeps its previous values.

use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::track::Track;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a play ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Completed,
    Skipped,
}

impl Action {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown listening action `{other}'")),
        }
    }
}

/// One finished play, as recorded at the moment it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningEvent {
    pub track_id: String,
    pub title: String,
    pub genre: String,
    /// Seconds listened
    pub elapsed: f64,
    /// `elapsed / duration`
    pub completion_ratio: f64,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
    pub context: Context,
}

impl ListeningEvent {
    /// Build an event for `track` after `elapsed` seconds, stamped now.
    #[must_use]
    pub fn new(track: &Track, elapsed: f64, action: Action, context: &Context) -> Self {
        Self::at(track, elapsed, action, context, Utc::now())
    }

    #[must_use]
    pub fn at(
        track: &Track,
        elapsed: f64,
        action: Action,
        context: &Context,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            genre: track.genre.clone(),
            elapsed,
            completion_ratio: completion_ratio(elapsed, track.duration),
            action,
            timestamp,
            context: context.clone(),
        }
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.action == Action::Skipped
    }
}

/// Fraction of `duration` covered by `elapsed`. Zero for a non-positive
/// duration rather than a division by zero.
#[must_use]
pub fn completion_ratio(elapsed: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        elapsed / duration
    } else {
        0.0
    }
}

/// How long the listener gives a track before skipping, as read from the
/// trailing window of events. Lower patience means a higher skip threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Patience {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Patience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Derived summary of recent listening behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub avg_completion_rate: f64,
    pub skip_threshold: f64,
    pub patience: Patience,
    pub total_skips: usize,
    pub early_skips: usize,
    pub late_skips: usize,
}

/// Skip threshold in effect before enough history exists.
pub const DEFAULT_SKIP_THRESHOLD: f64 = 0.3;

impl Default for BehaviorProfile {
    fn default() -> Self {
        Self {
            avg_completion_rate: 0.0,
            skip_threshold: DEFAULT_SKIP_THRESHOLD,
            patience: Patience::Medium,
            total_skips: 0,
            early_skips: 0,
            late_skips: 0,
        }
    }
}

/// Behavior tracker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub min_events: usize,
    pub window: usize,
    /// Completion ratio below which a play counts as an early skip
    pub early_skip_ratio: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            min_events: 5,
            window: 10,
            early_skip_ratio: 0.3,
        }
    }
}

/// Map trailing-window statistics to a threshold and patience label.
#[must_use]
pub fn resolve_threshold(avg_completion: f64, early_skip_rate: f64) -> (f64, Patience) {
    if avg_completion > 0.7 {
        (0.2, Patience::High)
    } else if avg_completion < 0.4 {
        (0.5, Patience::Low)
    } else if early_skip_rate > 0.5 {
        (0.4, Patience::Low)
    } else {
        (0.3, Patience::Medium)
    }
}

impl BehaviorProfile {
    /// Compute a fresh profile from `history`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientHistory`] when `history` holds fewer than
    /// `config.min_events` events.
    pub fn from_history(history: &[ListeningEvent], config: &BehaviorConfig) -> EngineResult<Self> {
        let need = config.min_events.max(1);
        if history.len() < need {
            return Err(EngineError::InsufficientHistory {
                have: history.len(),
                need,
            });
        }

        let window = &history[history.len().saturating_sub(config.window.max(1))..];
        #[allow(clippy::cast_precision_loss)]
        let n = window.len() as f64;
        let avg_completion = window.iter().map(|e| e.completion_ratio).sum::<f64>() / n;
        #[allow(clippy::cast_precision_loss)]
        let early_skip_rate = window
            .iter()
            .filter(|e| e.completion_ratio < config.early_skip_ratio)
            .count() as f64
            / n;

        let (skip_threshold, patience) = resolve_threshold(avg_completion, early_skip_rate);

        let skips = history.iter().filter(|e| e.is_skip());
        let total_skips = skips.clone().count();
        let early_skips = skips
            .filter(|e| e.completion_ratio < config.early_skip_ratio)
            .count();

        Ok(Self {
            avg_completion_rate: avg_completion,
            skip_threshold,
            patience,
            total_skips,
            early_skips,
            late_skips: total_skips - early_skips,
        })
    }
}

/// Append-only listening log plus the profile derived from it.
#[derive(Debug, Clone, Default)]
pub struct BehaviorTracker {
    config: BehaviorConfig,
    history: Vec<ListeningEvent>,
    profile: BehaviorProfile,
}

impl BehaviorTracker {
    #[must_use]
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            profile: BehaviorProfile::default(),
        }
    }

    /// Rebuild a tracker by replaying stored events in order.
    #[must_use]
    pub fn replay<I>(config: BehaviorConfig, events: I) -> Self
    where
        I: IntoIterator<Item = ListeningEvent>,
    {
        let mut tracker = Self::new(config);
        for event in events {
            tracker.record(event);
        }
        tracker
    }

    /// Append `event` and recompute the profile if enough history exists.
    pub fn record(&mut self, event: ListeningEvent) -> &BehaviorProfile {
        debug!(
            "Recording {} of `{}' at {:.0}%",
            event.action,
            event.title,
            event.completion_ratio * 100.0
        );
        self.history.push(event);

        match BehaviorProfile::from_history(&self.history, &self.config) {
            Ok(profile) => {
                info!(
                    "Skip threshold adjusted to {:.0}% (patience: {})",
                    profile.skip_threshold * 100.0,
                    profile.patience
                );
                self.profile = profile;
            }
            Err(e) => debug!("Keeping behavior profile: {e}"),
        }

        &self.profile
    }

    #[must_use]
    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    #[must_use]
    pub fn skip_threshold(&self) -> f64 {
        self.profile.skip_threshold
    }

    /// Whether the history is long enough for the profile to be recomputed
    /// on every recorded event.
    #[must_use]
    pub fn has_enough_history(&self) -> bool {
        self.history.len() >= self.config.min_events.max(1)
    }

    #[must_use]
    pub fn history(&self) -> &[ListeningEvent] {
        &self.history
    }

    #[must_use]
    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }
}
