//! Preference model: a taste profile aggregated from a set of tracks.

use crate::error::{EngineError, EngineResult};
use crate::track::Track;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Averages and genre counts over a set of tracks.
///
/// Only constructible from a non-empty set, so the averages are always
/// defined and `genre_counts` always sums to `total_tracks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub avg_tempo: f64,
    pub avg_energy: f64,
    pub avg_valence: f64,
    pub avg_acousticness: f64,
    pub genre_counts: BTreeMap<String, usize>,
    pub total_tracks: usize,
}

impl PreferenceProfile {
    /// Learn a profile from `tracks`. Returns `None` for an empty set.
    #[must_use]
    pub fn learn<'a, I>(tracks: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut total = 0usize;
        let (mut tempo, mut energy, mut valence, mut acousticness) = (0.0, 0.0, 0.0, 0.0);
        let mut genre_counts = BTreeMap::new();

        for track in tracks {
            total += 1;
            tempo += track.tempo;
            energy += track.energy;
            valence += track.valence;
            acousticness += track.acousticness;
            *genre_counts.entry(track.genre.clone()).or_insert(0) += 1;
        }

        if total == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = total as f64;
        Some(Self {
            avg_tempo: tempo / n,
            avg_energy: energy / n,
            avg_valence: valence / n,
            avg_acousticness: acousticness / n,
            genre_counts,
            total_tracks: total,
        })
    }

    /// Learn from the catalog tracks named by a seed playlist.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownTrack`] if a seed id is not in the catalog,
    /// [`EngineError::EmptyCatalog`] if `seed_ids` is empty.
    pub fn from_seed<S: AsRef<str>>(catalog: &[Track], seed_ids: &[S]) -> EngineResult<Self> {
        let by_id: HashMap<&str, &Track> = catalog.iter().map(|t| (t.id.as_str(), t)).collect();
        let seeds = seed_ids
            .iter()
            .map(|id| {
                by_id
                    .get(id.as_ref())
                    .copied()
                    .ok_or_else(|| EngineError::UnknownTrack(id.as_ref().to_string()))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Self::learn(seeds).ok_or(EngineError::EmptyCatalog)
    }

    /// Share of the profile's tracks that carry `genre`.
    #[must_use]
    pub fn genre_share(&self, genre: &str) -> f64 {
        let count = self.genre_counts.get(genre).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let share = count as f64 / self.total_tracks as f64;
        share
    }
}
