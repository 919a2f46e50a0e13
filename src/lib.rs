//! Adaptive music queues that learn from listening habits.
//!
//! Core modules:
//! - [`algorithm`] - Track scoring and similarity
//! - [`queue`] - Initial queue generation
//! - [`behavior`] - Listening events and the skip-threshold profile
//! - [`adapt`] - Live queue adaptation after skips and completions
//! - [`session`] - One listener's queue, playback position and history
//!
//! ### Supporting Modules
//!
//! - [`track`] - Catalog records, JSON loading and the demo catalog
//! - [`preference`] - Preference profile learned from a set of tracks
//! - [`context`] - Weather, activity and time of day, and their modifiers
//! - [`config`] - Engine tuning and data directory management
//! - [`db`] - SQLite storage for the catalog and listening history
//! - [`error`] - Engine error type
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use attune::config::EngineConfig;
//! use attune::context::{Activity, Context, TimeOfDay, Weather};
//! use attune::session::Session;
//! use attune::track::demo_catalog;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut session = Session::new(demo_catalog(), &EngineConfig::default(), StdRng::seed_from_u64(42));
//! session.set_context(Context::new(Weather::Rainy, Activity::Focusing, TimeOfDay::Evening));
//!
//! let queue = session.generate_queue("jazz, piano")?;
//! println!("Generated queue with {} tracks", queue.len());
//!
//! // Skip the first track a few seconds in: the queue sheds similar tracks
//! session.seek(12.0)?;
//! let outcome = session.skip()?;
//! println!("{:?}", outcome.adaptation.note);
//!
//! // Let the next one play out: a similar track may be queued
//! let outcome = session.play_through()?;
//! println!("Skip threshold now {:.0}%", outcome.behavior.skip_threshold * 100.0);
//! # Ok::<(), attune::error::EngineError>(())
//! ```
//!
//! ## Algorithm Details
//!
//! ### Queue Generation
//! - Scores every track against the preference profile, keywords and context
//! - Keeps the 15 best candidates and shuffles them
//! - Takes the first 10 as the queue
//!
//! ### Adaptation
//! - An early skip (below the current skip threshold) removes the track and
//!   anything at least 0.8 similar to it, then tops a short queue up with a
//!   dissimilar track
//! - Playing more than 85% of a track queues one track more than 0.6 similar
//! - After five plays the skip threshold follows the trailing ten events

pub mod adapt;
pub mod algorithm;
pub mod behavior;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod preference;
pub mod queue;
pub mod session;
pub mod track;
