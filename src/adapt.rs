//! Live queue adaptation in response to skips and completions.
//!
//! The decision is taken against the skip threshold as it stood *before*
//! the event is folded into the behavior profile; callers run
//! [`QueueAdapter::adapt`] first and only then record the event.

use crate::algorithm::similarity;
use crate::behavior::{Action, ListeningEvent};
use crate::error::{EngineError, EngineResult};
use crate::queue::{Queue, QueueEntry};
use crate::track::Track;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Similarity and engagement bounds for adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Queued tracks at least this similar to an early-skipped track go too
    pub near_duplicate: f64,
    /// Replacements after an early skip must be less similar than this
    pub dissimilar: f64,
    /// Injections after high engagement must be more similar than this
    pub similar: f64,
    /// Completion ratio above which a play counts as high engagement
    pub high_engagement: f64,
    /// A replacement is only added while the queue is shorter than this
    pub min_queue_len: usize,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            near_duplicate: 0.8,
            dissimilar: 0.5,
            similar: 0.6,
            high_engagement: 0.85,
            min_queue_len: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdaptationKind {
    EarlySkip,
    HighEngagement,
    None,
}

/// What the adapter did to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub kind: AdaptationKind,
    /// Ids removed from the queue, in former queue order
    pub removed: Vec<String>,
    /// Id appended to the queue, if any
    pub added: Option<String>,
    /// Human readable summary, absent when nothing was decided
    pub note: Option<String>,
}

impl Adaptation {
    #[must_use]
    pub fn none() -> Self {
        Self {
            kind: AdaptationKind::None,
            removed: Vec::new(),
            added: None,
            note: None,
        }
    }

    /// Whether the queue was structurally modified.
    #[must_use]
    pub fn changed_queue(&self) -> bool {
        !self.removed.is_empty() || self.added.is_some()
    }
}

/// Reacts to a finished track by reshaping the live queue.
///
/// Two rules apply, checked in order:
///
/// - **Early skip.** A skip below the current threshold removes the track and
///   every queued track at least `near_duplicate` like it. If that leaves
///   fewer than `min_queue_len` entries, one unqueued catalog track below
///   `dissimilar` is appended.
/// - **High engagement.** Any event past `high_engagement`, skip or not,
///   appends one unqueued track above `similar`.
///
/// Anything else leaves the queue alone. A missing candidate never fails the
/// adaptation; it is logged and nothing is added.
#[derive(Debug, Clone, Default)]
pub struct QueueAdapter {
    config: AdaptationConfig,
}

impl QueueAdapter {
    #[must_use]
    pub fn new(config: AdaptationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Apply the adaptation rules for `event` to `queue`.
    ///
    /// `threshold` is the skip tolerance in effect before `event`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if the event's track is not in
    /// `catalog`. The queue is left untouched in that case.
    pub fn adapt<R: Rng + ?Sized>(
        &self,
        event: &ListeningEvent,
        threshold: f64,
        queue: &mut Queue,
        catalog: &[Track],
        rng: &mut R,
    ) -> EngineResult<Adaptation> {
        let played = catalog
            .iter()
            .find(|t| t.id == event.track_id)
            .ok_or_else(|| EngineError::UnknownTrack(event.track_id.clone()))?;
        let ratio = event.completion_ratio;

        let adaptation = if event.action == Action::Skipped && ratio < threshold {
            self.early_skip(played, ratio, threshold, queue, catalog, rng)
        } else if ratio > self.config.high_engagement {
            self.high_engagement(played, ratio, queue, catalog, rng)
        } else {
            debug!(
                "No adaptation for `{}' ({} at {:.0}%)",
                played.title,
                event.action,
                ratio * 100.0
            );
            Adaptation::none()
        };

        if let Some(note) = &adaptation.note {
            info!("{note}");
        }
        Ok(adaptation)
    }

    /// Drop the skipped track and its near-duplicates, then top the queue up
    /// with something safely different.
    fn early_skip<R: Rng + ?Sized>(
        &self,
        skipped: &Track,
        ratio: f64,
        threshold: f64,
        queue: &mut Queue,
        catalog: &[Track],
        rng: &mut R,
    ) -> Adaptation {
        let mut note = format!(
            "Early skip at {:.0}% (threshold: {:.0}%). Adjusting queue...",
            ratio * 100.0,
            threshold * 100.0
        );

        let removed: Vec<String> = queue
            .remove_where(|e| {
                e.id() == skipped.id || similarity(&e.track, skipped) >= self.config.near_duplicate
            })
            .into_iter()
            .map(|e| e.track.id)
            .collect();
        debug!("Removed {} queued tracks similar to `{}'", removed.len(), skipped.title);

        let mut added = None;
        if queue.len() < self.config.min_queue_len {
            let dissimilar = self.config.dissimilar;
            match pick_replacement(queue, catalog, rng, |t| similarity(t, skipped) < dissimilar) {
                Ok(track) => {
                    note.push_str(&format!(" Added \"{}\".", track.title));
                    added = Some(track.id.clone());
                    queue.push(QueueEntry {
                        score: similarity(track, skipped),
                        track: track.clone(),
                    });
                }
                Err(e) => debug!("Skipping replacement: {e}"),
            }
        }

        Adaptation {
            kind: AdaptationKind::EarlySkip,
            removed,
            added,
            note: Some(note),
        }
    }

    /// Queue one more track in the same vein as the one just enjoyed.
    fn high_engagement<R: Rng + ?Sized>(
        &self,
        played: &Track,
        ratio: f64,
        queue: &mut Queue,
        catalog: &[Track],
        rng: &mut R,
    ) -> Adaptation {
        let mut note = format!(
            "High engagement ({:.0}%). Adding similar tracks.",
            ratio * 100.0
        );

        let similar = self.config.similar;
        let mut added = None;
        match pick_replacement(queue, catalog, rng, |t| {
            t.id != played.id && similarity(t, played) > similar
        }) {
            Ok(track) => {
                note.push_str(&format!(" Queued \"{}\".", track.title));
                added = Some(track.id.clone());
                queue.push(QueueEntry {
                    score: similarity(track, played),
                    track: track.clone(),
                });
            }
            Err(e) => debug!("Skipping injection: {e}"),
        }

        Adaptation {
            kind: AdaptationKind::HighEngagement,
            removed: Vec::new(),
            added,
            note: Some(note),
        }
    }
}

/// Uniformly pick a catalog track that is not queued and passes `eligible`.
fn pick_replacement<'a, R, F>(
    queue: &Queue,
    catalog: &'a [Track],
    rng: &mut R,
    eligible: F,
) -> EngineResult<&'a Track>
where
    R: Rng + ?Sized,
    F: Fn(&Track) -> bool,
{
    let candidates: Vec<&Track> = catalog
        .iter()
        .filter(|t| !queue.contains(&t.id) && eligible(*t))
        .collect();

    candidates
        .choose(rng)
        .copied()
        .ok_or_else(|| EngineError::NoEligibleReplacement {
            reason: format!("none of {} catalog tracks qualify", catalog.len()),
        })
}

/// Adapt with the default bounds.
///
/// # Errors
///
/// [`EngineError::UnknownTrack`] if the event's track is not in `catalog`.
pub fn adapt_queue<R: Rng + ?Sized>(
    event: &ListeningEvent,
    threshold: f64,
    queue: &mut Queue,
    catalog: &[Track],
    rng: &mut R,
) -> EngineResult<Adaptation> {
    QueueAdapter::default().adapt(event, threshold, queue, catalog, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::track::demo_catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn queue_of(catalog: &[Track], ids: &[&str]) -> Queue {
        ids.iter()
            .map(|id| QueueEntry {
                track: catalog.iter().find(|t| t.id == *id).expect("demo id").clone(),
                score: 0.5,
            })
            .collect()
    }

    fn event_for(catalog: &[Track], id: &str, ratio: f64, action: Action) -> ListeningEvent {
        let track = catalog.iter().find(|t| t.id == id).expect("demo id");
        ListeningEvent::new(track, ratio * track.duration, action, &Context::default())
    }

    #[test]
    fn test_early_skip_removes_track_and_near_duplicates() {
        let catalog = demo_catalog();
        // 1, 2 and 3 are near-identical electronic tracks
        let mut queue = queue_of(&catalog, &["1", "2", "3", "7", "8", "9", "13", "16", "19", "20"]);
        let event = event_for(&catalog, "1", 0.1, Action::Skipped);
        let mut rng = StdRng::seed_from_u64(11);

        let adaptation = adapt_queue(&event, 0.3, &mut queue, &catalog, &mut rng).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::EarlySkip);
        assert!(adaptation.removed.contains(&"1".to_string()));
        assert!(!queue.contains("1"));
        let skipped = &catalog[0];
        for entry in &queue {
            if adaptation.added.as_deref() != Some(entry.id()) {
                assert!(similarity(&entry.track, skipped) < 0.8);
            }
        }
        for id in &adaptation.removed {
            let t = catalog.iter().find(|t| &t.id == id).expect("removed id");
            assert!(t.id == "1" || similarity(t, skipped) >= 0.8);
        }
    }

    #[test]
    fn test_early_skip_adds_dissimilar_replacement_when_short() {
        let catalog = demo_catalog();
        let mut queue = queue_of(&catalog, &["1", "2", "3", "10"]);
        let event = event_for(&catalog, "1", 0.05, Action::Skipped);
        let mut rng = StdRng::seed_from_u64(5);

        let adaptation = adapt_queue(&event, 0.3, &mut queue, &catalog, &mut rng).expect("adapt");

        let added = adaptation.added.expect("a replacement should be added");
        let added_track = catalog.iter().find(|t| t.id == added).expect("added id");
        assert!(similarity(added_track, &catalog[0]) < 0.5);
        assert!(queue.contains(&added));
        assert!(adaptation.note.expect("note").contains("Added"));
    }

    #[test]
    fn test_late_skip_leaves_queue_alone() {
        let catalog = demo_catalog();
        let mut queue = queue_of(&catalog, &["1", "2", "3"]);
        let before = queue.clone();
        let event = event_for(&catalog, "1", 0.5, Action::Skipped);

        let adaptation =
            adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(1)).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::None);
        assert!(!adaptation.changed_queue());
        assert_eq!(queue, before);
    }

    #[test]
    fn test_threshold_decides_early_skip() {
        let catalog = demo_catalog();
        let event = event_for(&catalog, "1", 0.35, Action::Skipped);

        let mut queue = queue_of(&catalog, &["1", "7"]);
        let a = adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(1)).expect("adapt");
        assert_eq!(a.kind, AdaptationKind::None);

        let mut queue = queue_of(&catalog, &["1", "7"]);
        let b = adapt_queue(&event, 0.5, &mut queue, &catalog, &mut StdRng::seed_from_u64(1)).expect("adapt");
        assert_eq!(b.kind, AdaptationKind::EarlySkip);
    }

    #[test]
    fn test_high_engagement_appends_one_similar_track() {
        let catalog = demo_catalog();
        let mut queue = queue_of(&catalog, &["1", "7", "8"]);
        let event = event_for(&catalog, "1", 0.9, Action::Completed);
        let mut rng = StdRng::seed_from_u64(21);

        let adaptation = adapt_queue(&event, 0.3, &mut queue, &catalog, &mut rng).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::HighEngagement);
        assert_eq!(queue.len(), 4);
        let added = adaptation.added.expect("a similar track exists");
        assert_ne!(added, "1");
        let added_track = catalog.iter().find(|t| t.id == added).expect("added id");
        assert!(similarity(added_track, &catalog[0]) > 0.6);
        assert_eq!(queue.get(3).map(QueueEntry::id), Some(added.as_str()));
    }

    #[test]
    fn test_high_engagement_without_candidates_changes_nothing() {
        let catalog = demo_catalog();
        let mut queue: Queue = catalog
            .iter()
            .map(|t| QueueEntry { track: t.clone(), score: 0.5 })
            .collect();
        let event = event_for(&catalog, "1", 0.95, Action::Completed);

        let adaptation =
            adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(2)).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::HighEngagement);
        assert!(adaptation.added.is_none());
        assert_eq!(queue.len(), catalog.len());
    }

    #[test]
    fn test_skip_after_high_completion_counts_as_engagement() {
        let catalog = demo_catalog();
        let mut queue = queue_of(&catalog, &["1", "7", "8"]);
        let event = event_for(&catalog, "1", 0.9, Action::Skipped);

        let adaptation =
            adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(4)).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::HighEngagement);
        assert!(adaptation.removed.is_empty());
        let added = adaptation.added.expect("similar electronic tracks are available");
        let added_track = catalog.iter().find(|t| t.id == added).expect("added id");
        assert!(similarity(added_track, &catalog[0]) > 0.6);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_early_skip_on_long_queue_adds_nothing() {
        let catalog = demo_catalog();
        let skipped = catalog.iter().find(|t| t.id == "9").expect("demo id");
        let mut ids = vec!["9"];
        ids.extend(
            catalog
                .iter()
                .filter(|t| t.id != skipped.id && similarity(t, skipped) < 0.8)
                .map(|t| t.id.as_str())
                .take(10),
        );
        assert_eq!(ids.len(), 11);
        let mut queue = queue_of(&catalog, &ids);
        let event = event_for(&catalog, "9", 0.1, Action::Skipped);

        let adaptation =
            adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(8)).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::EarlySkip);
        assert_eq!(adaptation.removed, vec!["9".to_string()]);
        assert!(adaptation.added.is_none());
        assert_eq!(queue.len(), 10);
    }

    fn folk(id: &str, tempo: f64, feature: f64) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Folk {id}"),
            artist: "Village Band".to_string(),
            genre: "Folk".to_string(),
            tempo,
            energy: feature,
            valence: feature,
            acousticness: feature,
            duration: 200.0,
            playback_ref: None,
        }
    }

    #[test]
    fn test_early_skip_without_dissimilar_candidate_only_removes() {
        // every track shares a genre, so nothing falls below 0.5 similarity
        let catalog = vec![
            folk("a", 100.0, 0.2),
            folk("b", 100.0, 0.7),
            folk("c", 110.0, 0.7),
            folk("d", 105.0, 0.2),
        ];
        let mut queue = queue_of(&catalog, &["a", "b", "d"]);
        let event = event_for(&catalog, "a", 0.1, Action::Skipped);

        let adaptation =
            adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(6)).expect("adapt");

        assert_eq!(adaptation.kind, AdaptationKind::EarlySkip);
        assert_eq!(adaptation.removed, vec!["a".to_string(), "d".to_string()]);
        assert!(adaptation.added.is_none());
        assert_eq!(queue.ids(), vec!["b"]);
        assert!(!adaptation.note.expect("note").contains("Added"));
    }

    #[test]
    fn test_unknown_track_is_reported() {
        let catalog = demo_catalog();
        let mut other = catalog[0].clone();
        other.id = "ghost".to_string();
        let event = ListeningEvent::new(&other, 10.0, Action::Skipped, &Context::default());
        let mut queue = queue_of(&catalog, &["1"]);

        let err = adapt_queue(&event, 0.3, &mut queue, &catalog, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert_eq!(err, EngineError::UnknownTrack("ghost".to_string()));
        assert_eq!(queue.len(), 1);
    }
}
