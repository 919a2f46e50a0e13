//! # Listening Session
//!
//! Owns everything one listener's run needs: the catalog, the learned
//! preferences, the current context, the queue with its play position, the
//! behavior tracker and an adaptation log.
//!
//! ## Event Flow
//!
//! When the current track ends, by skip or by playing through, the session:
//!
//! 1. builds a [`ListeningEvent`] from the elapsed time,
//! 2. adapts the queue against the skip threshold in effect *before* the
//!    event,
//! 3. records the event with the behavior tracker,
//! 4. advances to the first queued track that has not yet been played.
//!
//! Playback time is simulated. [`Session::tick`] advances the clock by
//! [`TICK_INTERVAL`] seconds and ends the track once its duration is reached.

use crate::adapt::{Adaptation, QueueAdapter};
use crate::behavior::{Action, BehaviorProfile, BehaviorTracker, ListeningEvent};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::preference::PreferenceProfile;
use crate::queue::{Queue, QueueBuilder, QueueEntry};
use crate::track::Track;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Simulated seconds per [`Session::tick`].
pub const TICK_INTERVAL: f64 = 0.1;

/// A timestamped line in the adaptation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Chronological record of queue generation and adaptation decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptationLog {
    entries: Vec<LogEntry>,
}

impl AdaptationLog {
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `n` entries, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[LogEntry] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }
}

/// Result of one finished track.
#[derive(Debug, Clone)]
pub struct PlayOutcome {
    pub event: ListeningEvent,
    pub adaptation: Adaptation,
    /// Behavior profile after the event was recorded
    pub behavior: BehaviorProfile,
    /// Id of the track now current, or `None` if the queue is exhausted
    pub next: Option<String>,
}

/// One listener's session: the catalog, the live queue, a simulated
/// playback clock and the listening history that tunes the skip threshold.
///
/// Every finished track goes through the same sequence. The queue is adapted
/// with the threshold in effect *before* the event, and only then is the
/// event recorded. Randomness comes from the injected `rng`, so a seeded
/// `StdRng` replays a session exactly.
///
/// # Examples
///
/// ```
/// use attune::adapt::AdaptationKind;
/// use attune::config::EngineConfig;
/// use attune::session::Session;
/// use attune::track::demo_catalog;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut session = Session::new(demo_catalog(), &EngineConfig::default(), StdRng::seed_from_u64(7));
/// assert_eq!(session.generate_queue("")?.len(), 10);
///
/// // five seconds in is well below the default 30% threshold
/// session.seek(5.0)?;
/// let outcome = session.skip()?;
/// assert_eq!(outcome.adaptation.kind, AdaptationKind::EarlySkip);
/// assert_eq!(session.history().len(), 1);
/// # Ok::<(), attune::error::EngineError>(())
/// ```
pub struct Session<R: Rng> {
    catalog: Vec<Track>,
    preferences: Option<PreferenceProfile>,
    context: Context,
    builder: QueueBuilder,
    adapter: QueueAdapter,
    tracker: BehaviorTracker,
    queue: Queue,
    /// Index into `queue` of the track being played
    current: Option<usize>,
    /// Seconds into the current track
    elapsed: f64,
    playing: bool,
    log: AdaptationLog,
    rng: R,
}

impl<R: Rng> Session<R> {
    /// Start a session whose preferences are learned from the whole catalog.
    #[must_use]
    pub fn new(catalog: Vec<Track>, config: &EngineConfig, rng: R) -> Self {
        let preferences = PreferenceProfile::learn(&catalog);
        Self {
            catalog,
            preferences,
            context: Context::default(),
            builder: QueueBuilder::new(config.weights, config.queue),
            adapter: QueueAdapter::new(config.adaptation),
            tracker: BehaviorTracker::new(config.behavior),
            queue: Queue::new(),
            current: None,
            elapsed: 0.0,
            playing: false,
            log: AdaptationLog::default(),
            rng,
        }
    }

    /// Replace the learned preferences, e.g. with a seed-playlist profile.
    pub fn set_preferences(&mut self, preferences: PreferenceProfile) {
        self.preferences = Some(preferences);
    }

    /// Continue from previously stored listening history.
    pub fn restore_history<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = ListeningEvent>,
    {
        self.tracker = BehaviorTracker::replay(*self.tracker.config(), events);
        debug!(
            "Restored {} listening events (skip threshold {:.0}%)",
            self.tracker.history().len(),
            self.tracker.skip_threshold() * 100.0
        );
    }

    /// New context applies to the next generated queue and event snapshots.
    pub fn set_context(&mut self, context: Context) {
        info!("Context changed to {context}");
        self.context = context;
    }

    /// Build a fresh queue and cue its first track, paused.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCatalog`] if there is nothing to choose from.
    pub fn generate_queue(&mut self, keywords: &str) -> EngineResult<&Queue> {
        let preferences = self.preferences.as_ref().ok_or(EngineError::EmptyCatalog)?;
        self.queue = self
            .builder
            .build(&self.catalog, preferences, &self.context, keywords, &mut self.rng)?;
        self.current = if self.queue.is_empty() { None } else { Some(0) };
        self.elapsed = 0.0;
        self.playing = false;
        self.log.push("Initial queue generated based on preferences and context");
        Ok(&self.queue)
    }

    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] if no track is cued.
    pub fn play(&mut self) -> EngineResult<()> {
        let entry = self.current().ok_or(EngineError::NoActiveTrack)?;
        debug!("Playing `{}'", entry.track.title);
        self.playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] when resuming with no track cued.
    pub fn toggle(&mut self) -> EngineResult<()> {
        if self.playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump to `seconds` into the current track, within its duration.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] if no track is cued.
    pub fn seek(&mut self, seconds: f64) -> EngineResult<()> {
        let duration = self.current().ok_or(EngineError::NoActiveTrack)?.track.duration;
        self.elapsed = seconds.clamp(0.0, duration.max(0.0));
        Ok(())
    }

    /// Advance the playback clock. Returns the outcome when this tick
    /// reached the end of the current track.
    ///
    /// # Errors
    ///
    /// Only if finishing the track fails, which needs the current track to
    /// have vanished.
    pub fn tick(&mut self) -> EngineResult<Option<PlayOutcome>> {
        if !self.playing {
            return Ok(None);
        }
        let Some(duration) = self.current().map(|e| e.track.duration) else {
            self.playing = false;
            return Ok(None);
        };

        self.elapsed += TICK_INTERVAL;
        if self.elapsed >= duration {
            return self.finish(Action::Completed).map(Some);
        }
        Ok(None)
    }

    /// Play the current track to its natural end in one step.
    ///
    /// The clock jumps straight to the track's duration, so the cost does
    /// not depend on how long the track is.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] if no track is cued.
    pub fn play_through(&mut self) -> EngineResult<PlayOutcome> {
        self.play()?;
        let duration = self.current().ok_or(EngineError::NoActiveTrack)?.track.duration;
        self.elapsed = self.elapsed.max(duration);
        self.finish(Action::Completed)
    }

    /// End the current track as a skip at the current position.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] if nothing is cued.
    pub fn skip(&mut self) -> EngineResult<PlayOutcome> {
        self.finish(Action::Skipped)
    }

    /// End the current track as completed at the current position.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoActiveTrack`] if nothing is cued.
    pub fn complete(&mut self) -> EngineResult<PlayOutcome> {
        self.finish(Action::Completed)
    }

    fn finish(&mut self, action: Action) -> EngineResult<PlayOutcome> {
        let index = self.current.ok_or(EngineError::NoActiveTrack)?;
        let track = self
            .queue
            .get(index)
            .map(|e| e.track.clone())
            .ok_or(EngineError::NoActiveTrack)?;

        let event = ListeningEvent::new(&track, self.elapsed, action, &self.context);
        let played: HashSet<String> = self
            .queue
            .iter()
            .take(index + 1)
            .map(|e| e.id().to_string())
            .collect();

        let threshold = self.tracker.skip_threshold();
        let adaptation = match self
            .adapter
            .adapt(&event, threshold, &mut self.queue, &self.catalog, &mut self.rng)
        {
            Ok(adaptation) => adaptation,
            Err(e) => {
                warn!("Queue left unchanged: {e}");
                Adaptation::none()
            }
        };
        if let Some(note) = &adaptation.note {
            self.log.push(note.clone());
        }

        let behavior = *self.tracker.record(event.clone());
        if self.tracker.has_enough_history() {
            self.log.push(format!(
                "Skip threshold adjusted to {:.0}% (patience: {})",
                behavior.skip_threshold * 100.0,
                behavior.patience
            ));
        }

        self.elapsed = 0.0;
        self.current = self.queue.iter().position(|e| !played.contains(e.id()));
        let next = self.current().map(|e| e.id().to_string());
        if next.is_none() {
            self.playing = false;
            self.log.push("Queue completed");
            info!("Queue completed");
        }

        Ok(PlayOutcome {
            event,
            adaptation,
            behavior,
            next,
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<&QueueEntry> {
        self.current.and_then(|i| self.queue.get(i))
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Fraction of the current track played, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.current()
            .map_or(0.0, |e| crate::behavior::completion_ratio(self.elapsed, e.track.duration))
            .clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[must_use]
    pub fn catalog(&self) -> &[Track] {
        &self.catalog
    }

    #[must_use]
    pub fn preferences(&self) -> Option<&PreferenceProfile> {
        self.preferences.as_ref()
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[must_use]
    pub fn behavior(&self) -> &BehaviorProfile {
        self.tracker.profile()
    }

    #[must_use]
    pub fn skip_threshold(&self) -> f64 {
        self.tracker.skip_threshold()
    }

    #[must_use]
    pub fn history(&self) -> &[ListeningEvent] {
        self.tracker.history()
    }

    #[must_use]
    pub fn log(&self) -> &AdaptationLog {
        &self.log
    }
}
