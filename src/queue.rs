//! # Queue Generation
//!
//! Builds the initial play queue from a catalog, a preference profile, the
//! listening context and a keyword list.
//!
//! ## Selection
//!
//! 1. Score every catalog track (see [`crate::algorithm`]).
//! 2. Sort descending by score and keep the top `candidate_pool` (15).
//! 3. Shuffle that pool uniformly.
//! 4. Take the first `queue_size` (10) as the queue.
//!
//! The shuffle is deliberate: near-tied candidates should not always play in
//! rank order, so the queue is a random draw from the best candidates rather
//! than a strict top-N. All randomness comes from the caller's RNG, which
//! makes a seeded `StdRng` reproduce the same queue.

use crate::algorithm::{self, ScoringWeights};
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::preference::PreferenceProfile;
use crate::track::Track;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Hard upper bound on queue size.
pub const MAX_QUEUE_SIZE: usize = 50;

/// Queue sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub queue_size: usize,
    pub candidate_pool: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_size: 10,
            candidate_pool: 15,
        }
    }
}

impl QueueConfig {
    /// Queue size clamped to `1..=MAX_QUEUE_SIZE`.
    #[must_use]
    pub fn effective_queue_size(&self) -> usize {
        self.queue_size.clamp(1, MAX_QUEUE_SIZE)
    }

    /// Candidate pool, never smaller than the queue.
    #[must_use]
    pub fn effective_pool(&self) -> usize {
        self.candidate_pool.max(self.effective_queue_size())
    }
}

/// A queued track and the score it was selected with.
///
/// Tracks added during adaptation carry their similarity to the played track
/// instead of a preference score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub track: Track,
    pub score: f64,
}

impl QueueEntry {
    /// Id of the queued track.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.track.id
    }
}

/// Ordered play queue with unique track ids.
///
/// Uniqueness is enforced on insertion: [`Queue::push`] and
/// [`FromIterator`] both drop an entry whose id is already queued.
///
/// # Examples
///
/// ```
/// use attune::queue::{Queue, QueueEntry};
/// use attune::track::demo_catalog;
///
/// let catalog = demo_catalog();
/// let mut queue: Queue = catalog[..3]
///     .iter()
///     .map(|t| QueueEntry { track: t.clone(), score: 0.5 })
///     .collect();
///
/// assert!(!queue.push(QueueEntry { track: catalog[0].clone(), score: 0.9 }));
/// assert_eq!(queue.ids(), vec!["1", "2", "3"]);
///
/// let removed = queue.remove_where(|e| e.track.genre == "Electronic");
/// assert_eq!(removed.len(), 3);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}

impl Queue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueueEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Index of the entry for track `id`, if queued.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(QueueEntry::id).collect()
    }

    /// Append an entry. Returns `false` (and leaves the queue unchanged) if
    /// its track is already queued.
    pub fn push(&mut self, entry: QueueEntry) -> bool {
        if self.contains(entry.id()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Remove every entry matching `pred`, returning the removed entries in
    /// queue order.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<QueueEntry>
    where
        F: FnMut(&QueueEntry) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| pred(e));
        self.entries = kept;
        removed
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a QueueEntry;
    type IntoIter = std::slice::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<QueueEntry> for Queue {
    /// Later duplicates of an already collected id are dropped.
    fn from_iter<I: IntoIterator<Item = QueueEntry>>(iter: I) -> Self {
        let mut queue = Self::new();
        for entry in iter {
            queue.push(entry);
        }
        queue
    }
}

/// Scores and selects the initial queue.
///
/// Holds the scoring weights and queue sizing so one builder can serve every
/// regeneration in a session. See the module docs for the selection steps.
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    weights: ScoringWeights,
    config: QueueConfig,
}

impl QueueBuilder {
    #[must_use]
    pub fn new(weights: ScoringWeights, config: QueueConfig) -> Self {
        Self { weights, config }
    }

    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Build a queue of up to `queue_size` entries.
    ///
    /// `keywords` is the raw comma separated keyword string.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCatalog`] if `catalog` is empty. No partial queue
    /// is produced in that case.
    pub fn build<R: Rng + ?Sized>(
        &self,
        catalog: &[Track],
        profile: &PreferenceProfile,
        context: &Context,
        keywords: &str,
        rng: &mut R,
    ) -> EngineResult<Queue> {
        if catalog.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }

        let keywords = algorithm::parse_keywords(keywords);
        let modifiers = context.modifiers();
        debug!("Context modifiers for {context}: {modifiers:?}");

        let mut scored: Vec<(&Track, f64)> =
            algorithm::score_tracks(catalog, profile, &modifiers, &keywords, &self.weights).collect();
        algorithm::rank_by_score(&mut scored);
        scored.truncate(self.config.effective_pool());
        scored.shuffle(rng);

        let queue: Queue = scored
            .into_iter()
            .map(|(track, score)| QueueEntry {
                track: track.clone(),
                score,
            })
            .take(self.config.effective_queue_size())
            .collect();

        info!(
            "Generated queue of {} tracks from {} candidates ({})",
            queue.len(),
            catalog.len(),
            context
        );
        Ok(queue)
    }
}

/// Build a queue with the default weights and sizes.
///
/// # Errors
///
/// [`EngineError::EmptyCatalog`] if `catalog` is empty.
pub fn build_queue<R: Rng + ?Sized>(
    catalog: &[Track],
    profile: &PreferenceProfile,
    context: &Context,
    keywords: &str,
    rng: &mut R,
) -> EngineResult<Queue> {
    QueueBuilder::default().build(catalog, profile, context, keywords, rng)
}
