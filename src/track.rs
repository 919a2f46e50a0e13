//! Track records as supplied by the catalog source.
//!
//! The catalog is treated as read-only once loaded. Audio features are taken
//! as-is: no range validation is performed on tempo, energy, valence or
//! acousticness.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A single catalog track with its audio features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique within a catalog
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    /// Beats per minute
    pub tempo: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    /// Seconds
    pub duration: f64,
    /// Reference understood by the external player (e.g. a Spotify URI).
    #[serde(
        default,
        alias = "spotifyUri",
        alias = "spotify_uri",
        alias = "playbackRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub playback_ref: Option<String>,
}

impl Track {
    /// Case-insensitive substring match against genre, title and artist.
    /// `keyword` must already be lowercased.
    #[must_use]
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.genre.to_lowercase().contains(keyword)
            || self.title.to_lowercase().contains(keyword)
            || self.artist.to_lowercase().contains(keyword)
    }
}

/// Read a JSON array of tracks from `path`.
///
/// Duplicate ids are dropped (first occurrence wins).
///
/// # Errors
///
/// Fails if the file cannot be read or is not a JSON array of tracks.
pub fn load_catalog(path: &Path) -> Result<Vec<Track>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;
    Ok(dedup_tracks(tracks))
}

/// Remove tracks whose id was already seen, keeping catalog order.
#[must_use]
pub fn dedup_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| {
            let fresh = seen.insert(track.id.clone());
            if !fresh {
                warn!("Dropping duplicate catalog entry `{}' ({})", track.id, track.title);
            }
            fresh
        })
        .collect()
}

/// (title, artist, genre, tempo, energy, valence, acousticness, duration)
type DemoRow = (&'static str, &'static str, &'static str, f64, f64, f64, f64, f64);

const DEMO_ROWS: [DemoRow; 20] = [
    ("Electric Dreams", "Synthwave Collective", "Electronic", 128.0, 0.9, 0.8, 0.1, 240.0),
    ("Neon Nights", "Digital Pulse", "Electronic", 132.0, 0.85, 0.75, 0.15, 210.0),
    ("Cyber City", "Future Bass", "Electronic", 140.0, 0.95, 0.85, 0.05, 195.0),
    ("Summer Breeze", "Pop Stars", "Pop", 120.0, 0.7, 0.9, 0.3, 225.0),
    ("Dancing Tonight", "Chart Toppers", "Pop", 118.0, 0.75, 0.85, 0.25, 200.0),
    ("Heart on Fire", "Radio Hits", "Pop", 115.0, 0.65, 0.8, 0.35, 215.0),
    ("Quiet Morning", "Acoustic Soul", "Acoustic", 75.0, 0.3, 0.6, 0.9, 245.0),
    ("Rainy Day", "Coffee Shop", "Acoustic", 70.0, 0.25, 0.5, 0.95, 260.0),
    ("Sunset Meditation", "Calm Vibes", "Ambient", 60.0, 0.2, 0.55, 0.85, 300.0),
    ("Thunder Road", "Rock Legends", "Rock", 145.0, 0.9, 0.7, 0.2, 230.0),
    ("Revolution", "Guitar Heroes", "Rock", 150.0, 0.95, 0.65, 0.15, 220.0),
    ("Wild Spirit", "Alternative Edge", "Rock", 138.0, 0.85, 0.6, 0.25, 240.0),
    ("City Lights", "Urban Flow", "Hip Hop", 95.0, 0.7, 0.65, 0.1, 205.0),
    ("Hustle Hard", "Rap Game", "Hip Hop", 100.0, 0.8, 0.7, 0.05, 195.0),
    ("Dreams", "Conscious Rap", "Hip Hop", 88.0, 0.6, 0.6, 0.2, 225.0),
    ("Bedroom Pop", "Indie Kids", "Indie", 105.0, 0.5, 0.7, 0.6, 210.0),
    ("Coffee & Cigarettes", "Lo-Fi Dreams", "Indie", 98.0, 0.45, 0.55, 0.7, 235.0),
    ("Vintage Hearts", "Retro Indie", "Indie", 110.0, 0.55, 0.75, 0.5, 220.0),
    ("Smooth Operator", "Jazz Ensemble", "Jazz", 85.0, 0.4, 0.65, 0.8, 280.0),
    ("Midnight Blues", "Soul Collective", "Soul", 78.0, 0.35, 0.5, 0.75, 270.0),
];

/// Ids of the demo tracks that make up the demo user's own playlist.
pub const DEMO_SEED_PLAYLIST: [&str; 7] = ["1", "4", "7", "10", "13", "16", "19"];

/// Built-in 20 track catalog used by `attune demo` and the tests.
#[must_use]
pub fn demo_catalog() -> Vec<Track> {
    DEMO_ROWS
        .iter()
        .enumerate()
        .map(
            |(i, &(title, artist, genre, tempo, energy, valence, acousticness, duration))| {
                let id = (i + 1).to_string();
                Track {
                    playback_ref: Some(format!("spotify:track:{id}")),
                    id,
                    title: title.to_string(),
                    artist: artist.to_string(),
                    genre: genre.to_string(),
                    tempo,
                    energy,
                    valence,
                    acousticness,
                    duration,
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_demo_catalog_has_unique_ids() {
        let catalog = demo_catalog();
        let ids: HashSet<_> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(catalog.len(), 20);
        assert_eq!(ids.len(), 20);
        for seed in DEMO_SEED_PLAYLIST {
            assert!(ids.contains(seed), "seed id {seed} missing from demo catalog");
        }
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let track = demo_catalog().remove(0);
        assert!(track.matches_keyword("electronic"));
        assert!(track.matches_keyword("dreams"));
        assert!(track.matches_keyword("synthwave"));
        assert!(!track.matches_keyword("jazz"));
    }

    #[test]
    fn test_load_catalog_accepts_camel_case_uri_and_drops_duplicates() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            r#"[
                {{"id": "a", "title": "One", "artist": "X", "genre": "Pop", "tempo": 120,
                  "energy": 0.5, "valence": 0.5, "acousticness": 0.5, "duration": 200,
                  "spotifyUri": "spotify:track:a"}},
                {{"id": "a", "title": "Dup", "artist": "Y", "genre": "Rock", "tempo": 90,
                  "energy": 0.1, "valence": 0.1, "acousticness": 0.1, "duration": 100}},
                {{"id": "b", "title": "Two", "artist": "Z", "genre": "Jazz", "tempo": 80,
                  "energy": 0.3, "valence": 0.4, "acousticness": 0.9, "duration": 300}}
            ]"#
        )
        .expect("Failed to write catalog");

        let catalog = load_catalog(file.path()).expect("catalog should parse");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].title, "One");
        assert_eq!(catalog[0].playback_ref.as_deref(), Some("spotify:track:a"));
        assert_eq!(catalog[1].playback_ref, None);
    }

    #[test]
    fn test_load_catalog_reports_missing_file() {
        let err = load_catalog(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read catalog"));
    }
}
