//! Track scoring and similarity.
//!
//! A track's score is a weighted sum of how close its audio features sit to
//! the listener's averages, how common its genre is in the profile, whether
//! it matches any keyword, and how well it fits the current context.
//!
//! ```text
//! score = w_tempo    * (1 - |tempo - avg_tempo| / 150)
//!       + w_energy   * (1 - |energy - avg_energy|)
//!       + w_valence  * (1 - |valence - avg_valence|)
//!       + w_acoustic * (1 - |acousticness - avg_acousticness|)
//!       + w_genre    * genre_share
//!       + keyword_bonus                (if any keyword matches)
//!       + w_context  * context_score   (capped at 1.0 before weighting)
//! ```
//!
//! The tempo term is not clamped, so very distant tempos contribute a
//! negative amount.

use crate::context::ContextModifiers;
use crate::preference::PreferenceProfile;
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Fixed scoring weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub tempo: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub genre: f64,
    pub keyword_bonus: f64,
    pub context: f64,
    /// Tempo distance (BPM) at which the tempo term reaches zero
    pub tempo_range: f64,
    pub context_partials: ContextPartials,
}

/// Partial awards making up the context score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextPartials {
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub acoustic: f64,
    pub cap: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tempo: 0.1,
            energy: 0.1,
            valence: 0.1,
            acousticness: 0.1,
            genre: 0.2,
            keyword_bonus: 0.2,
            context: 0.2,
            tempo_range: 150.0,
            context_partials: ContextPartials::default(),
        }
    }
}

impl Default for ContextPartials {
    fn default() -> Self {
        Self {
            energy: 0.3,
            valence: 0.2,
            tempo: 0.3,
            acoustic: 0.3,
            cap: 1.0,
        }
    }
}

/// Split a comma separated keyword string into lowercased, trimmed,
/// non-empty keywords.
#[must_use]
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// How well a track fits the context modifiers, in `[0, cap]`.
///
/// The partial awards are independent; a track may collect several.
#[must_use]
pub fn context_score(track: &Track, modifiers: &ContextModifiers, partials: &ContextPartials) -> f64 {
    let mut score = 0.0;
    if modifiers.energy_boost > 0.0 && track.energy > 0.7 {
        score += partials.energy;
    }
    if modifiers.energy_boost < 0.0 && track.energy < 0.4 {
        score += partials.energy;
    }
    if modifiers.valence_boost > 0.0 && track.valence > 0.7 {
        score += partials.valence;
    }
    if modifiers.valence_boost < 0.0 && track.valence < 0.5 {
        score += partials.valence;
    }
    if modifiers.tempo_boost > 0.0 && track.tempo > 120.0 {
        score += partials.tempo;
    }
    if modifiers.acoustic_boost > 0.0 && track.acousticness > 0.6 {
        score += partials.acoustic;
    }
    score.min(partials.cap)
}

/// Closeness of a track's audio features to the profile averages.
#[inline]
fn preference_similarity(track: &Track, profile: &PreferenceProfile, weights: &ScoringWeights) -> f64 {
    weights.tempo * (1.0 - (track.tempo - profile.avg_tempo).abs() / weights.tempo_range)
        + weights.energy * (1.0 - (track.energy - profile.avg_energy).abs())
        + weights.valence * (1.0 - (track.valence - profile.avg_valence).abs())
        + weights.acousticness * (1.0 - (track.acousticness - profile.avg_acousticness).abs())
}

/// Score a single track. `keywords` must come from [`parse_keywords`].
#[must_use]
pub fn score_track(
    track: &Track,
    profile: &PreferenceProfile,
    modifiers: &ContextModifiers,
    keywords: &[String],
    weights: &ScoringWeights,
) -> f64 {
    let mut score = preference_similarity(track, profile, weights);
    score += weights.genre * profile.genre_share(&track.genre);

    if keywords.iter().any(|kw| track.matches_keyword(kw)) {
        score += weights.keyword_bonus;
    }

    score += weights.context * context_score(track, modifiers, &weights.context_partials);

    log::trace!("Scored `{}' ({}): {:.4}", track.title, track.id, score);
    score
}

/// Score every track, keeping catalog order.
#[must_use = "Iterator should be consumed to calculate scores"]
pub fn score_tracks<'a>(
    tracks: &'a [Track],
    profile: &'a PreferenceProfile,
    modifiers: &'a ContextModifiers,
    keywords: &'a [String],
    weights: &'a ScoringWeights,
) -> impl Iterator<Item = (&'a Track, f64)> + 'a {
    tracks
        .iter()
        .map(move |track| (track, score_track(track, profile, modifiers, keywords, weights)))
}

/// Sort scored tracks by descending score. Stable for ties.
pub fn rank_by_score<T>(scored: &mut [(T, f64)]) {
    scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
}

/// Similarity between two tracks, nominally in `[0, 1]`.
///
/// ```text
/// 0.3  * [same genre]
/// 0.2  * (1 - |Δenergy|)
/// 0.2  * (1 - |Δvalence|)
/// 0.15 * (1 - |Δtempo| / 150)
/// 0.15 * (1 - |Δacousticness|)
/// ```
///
/// Symmetric, and exactly 1.0 for a track against itself.
#[must_use]
pub fn similarity(a: &Track, b: &Track) -> f64 {
    let genre = if a.genre == b.genre { 0.3 } else { 0.0 };
    genre
        + 0.2 * (1.0 - (a.energy - b.energy).abs())
        + 0.2 * (1.0 - (a.valence - b.valence).abs())
        + 0.15 * (1.0 - (a.tempo - b.tempo).abs() / 150.0)
        + 0.15 * (1.0 - (a.acousticness - b.acousticness).abs())
}
