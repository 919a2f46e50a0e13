//! SQLite persistence for the catalog and the listening history.
//!
//! Two tables:
//!
//! - `track` mirrors [`Track`] one row per track id.
//! - `event` is an append-only log of [`ListeningEvent`]s. The insertion
//!   sequence is the replay order, timestamps are stored as RFC 3339 text and
//!   the context snapshot as JSON.

use crate::behavior::{Action, ListeningEvent};
use crate::context::Context as ListeningContext;
use crate::track::Track;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS track (
        id           TEXT PRIMARY KEY,
        title        TEXT NOT NULL,
        artist       TEXT NOT NULL,
        genre        TEXT NOT NULL,
        tempo        REAL NOT NULL,
        energy       REAL NOT NULL,
        valence      REAL NOT NULL,
        acousticness REAL NOT NULL,
        duration     REAL NOT NULL,
        playback_ref TEXT
    );
    CREATE TABLE IF NOT EXISTS event (
        seq              INTEGER PRIMARY KEY AUTOINCREMENT,
        track_id         TEXT NOT NULL,
        title            TEXT NOT NULL,
        genre            TEXT NOT NULL,
        elapsed          REAL NOT NULL,
        completion_ratio REAL NOT NULL,
        action           TEXT NOT NULL,
        timestamp        TEXT NOT NULL,
        context          TEXT NOT NULL
    );
";

/// Handle on the Attune database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the parent directory cannot be created, the file cannot be
    /// opened, or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Rusqlite DB connection refused. DB location: {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Throwaway database, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Fails only if SQLite itself cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Invalid SQL command when creating tables")?;
        Ok(Self { conn })
    }

    /// Replace the stored catalog with `tracks`. Returns the number stored.
    ///
    /// # Errors
    ///
    /// Fails on any SQL error. The previous catalog survives a failed
    /// replacement.
    pub fn replace_catalog(&mut self, tracks: &[Track]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM track", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO track
                    (id, title, artist, genre, tempo, energy, valence, acousticness, duration, playback_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for track in tracks {
                stmt.execute(params![
                    track.id,
                    track.title,
                    track.artist,
                    track.genre,
                    track.tempo,
                    track.energy,
                    track.valence,
                    track.acousticness,
                    track.duration,
                    track.playback_ref,
                ])
                .with_context(|| format!("Invalid SQL statement when inserting track {}", track.id))?;
                trace!("Stored track {} `{}'", track.id, track.title);
            }
        }

        tx.commit().context("Committing catalog transaction failed")?;
        let count = self.track_count()?;
        debug!("Catalog replaced: {count} tracks");
        Ok(count)
    }

    /// All stored tracks, ordered by id.
    ///
    /// # Errors
    ///
    /// Fails on any SQL error.
    pub fn load_catalog(&self) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, artist, genre, tempo, energy, valence, acousticness, duration, playback_ref
             FROM track ORDER BY id",
        )?;
        let tracks = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    genre: row.get(3)?,
                    tempo: row.get(4)?,
                    energy: row.get(5)?,
                    valence: row.get(6)?,
                    acousticness: row.get(7)?,
                    duration: row.get(8)?,
                    playback_ref: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// # Errors
    ///
    /// Fails on any SQL error.
    pub fn track_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM track", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Append one event to the listening log.
    ///
    /// # Errors
    ///
    /// Fails if the context cannot be serialized or on any SQL error.
    pub fn append_event(&self, event: &ListeningEvent) -> Result<()> {
        let context = serde_json::to_string(&event.context)?;
        self.conn
            .execute(
                "INSERT INTO event
                    (track_id, title, genre, elapsed, completion_ratio, action, timestamp, context)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.track_id,
                    event.title,
                    event.genre,
                    event.elapsed,
                    event.completion_ratio,
                    event.action.label(),
                    event.timestamp.to_rfc3339(),
                    context,
                ],
            )
            .with_context(|| format!("Failed to store {} event for {}", event.action, event.track_id))?;
        Ok(())
    }

    /// The whole listening log in the order it was written.
    ///
    /// # Errors
    ///
    /// Fails on any SQL error or a row that no longer parses.
    pub fn load_events(&self) -> Result<Vec<ListeningEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT track_id, title, genre, elapsed, completion_ratio, action, timestamp, context
             FROM event ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(track_id, title, genre, elapsed, completion_ratio, action, timestamp, context)|
                 -> Result<ListeningEvent> {
                    let action: Action = action.parse().map_err(|e: String| anyhow!(e))?;
                    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                        .with_context(|| format!("Bad timestamp `{timestamp}' for {track_id}"))?
                        .with_timezone(&Utc);
                    let context: ListeningContext = serde_json::from_str(&context)
                        .with_context(|| format!("Bad context snapshot for {track_id}"))?;
                    Ok(ListeningEvent {
                        track_id,
                        title,
                        genre,
                        elapsed,
                        completion_ratio,
                        action,
                        timestamp,
                        context,
                    })
                },
            )
            .collect()
    }

    /// Forget all listening history. Returns the number of events removed.
    ///
    /// # Errors
    ///
    /// Fails on any SQL error.
    pub fn clear_events(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM event", [])?;
        debug!("Cleared {removed} listening events");
        Ok(removed)
    }
}
