//! # Attune
//!
//! Command-line front end for the adaptive queue engine.
//!
//! ## Usage
//!
//! ```bash
//! # Load a catalog
//! attune import tracks.json
//!
//! # Queue for a rainy evening of focused work
//! attune queue --weather rainy --activity focusing --time evening
//!
//! # Play it, skipping the second track early
//! attune simulate --weather rainy complete skip@0.1 complete
//!
//! # See what the engine has learned
//! attune behavior
//! ```
//!
//! Logging is controlled through `RUST_LOG`, e.g.
//! `RUST_LOG=attune=debug attune simulate --demo complete`.

mod cli;
mod completion;

use anyhow::{bail, Result};
use attune::behavior::BehaviorTracker;
use attune::config::{EngineConfig, RuntimeConfig};
use attune::context::{Activity, Context, TimeOfDay, Weather};
use attune::db::Store;
use attune::error::EngineError;
use attune::preference::PreferenceProfile;
use attune::queue::Queue;
use attune::session::{PlayOutcome, Session};
use attune::track::{self, Track, DEMO_SEED_PLAYLIST};
use clap::{CommandFactory, Parser};
use cli::{QueueArgs, SimStep};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    debug!("Arguments: {args:?}");

    match &args.command {
        cli::Command::Import { path } => {
            let tracks = track::load_catalog(path)?;
            let runtime = runtime(&args)?;
            let mut store = Store::open(&runtime.db_path)?;
            let count = store.replace_catalog(&tracks)?;
            info!("Imported catalog from {}", path.display());
            println!("Imported {count} tracks into {}", runtime.db_path.display());
        }
        cli::Command::List => {
            let catalog = stored_catalog(&args)?;
            for t in &catalog {
                println!(
                    "{:>4}  {} - {}  [{}, {:.0} BPM, energy {:.2}, valence {:.2}, acoustic {:.2}, {}]",
                    t.id,
                    t.artist,
                    t.title,
                    t.genre,
                    t.tempo,
                    t.energy,
                    t.valence,
                    t.acousticness,
                    format_duration(t.duration)
                );
            }
            println!("{} tracks", catalog.len());
        }
        cli::Command::Profile { seed_playlist, demo } => {
            let catalog = if *demo { track::demo_catalog() } else { stored_catalog(&args)? };
            let profile = learn_profile(&catalog, seed_playlist)?;
            print_profile(&profile);
        }
        cli::Command::Queue { queue } => {
            let config = engine_config(&args, queue.demo)?;
            let catalog = catalog_for(&args, queue)?;
            let mut session = new_session(catalog, &config, queue)?;
            session.generate_queue(&queue.keywords)?;
            println!("Queue for {}:", session.context());
            print_queue(session.queue(), None);
        }
        cli::Command::Simulate { queue, dry_run, steps } => {
            simulate(&args, queue, *dry_run, steps)?;
        }
        cli::Command::Behavior { reset } => {
            let runtime = runtime(&args)?;
            let store = Store::open(&runtime.db_path)?;
            if *reset {
                let removed = store.clear_events()?;
                println!("Forgot {removed} listening events");
                return Ok(());
            }

            let config = runtime.engine_config()?;
            let tracker = BehaviorTracker::replay(config.behavior, store.load_events()?);
            let history = tracker.history().len();
            if history < tracker.config().min_events {
                println!(
                    "{history} listening events; defaults apply until {} have been recorded",
                    tracker.config().min_events
                );
            } else {
                println!("{history} listening events");
            }
            let p = tracker.profile();
            println!("  Average completion: {:.0}%", p.avg_completion_rate * 100.0);
            println!("  Skip threshold:     {:.0}%", p.skip_threshold * 100.0);
            println!("  Patience:           {}", p.patience);
            println!(
                "  Skips:              {} ({} early, {} late)",
                p.total_skips, p.early_skips, p.late_skips
            );
        }
        cli::Command::Demo { seed } => {
            demo(*seed)?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(*shell), &mut cmd);
        }
        cli::Command::CompleteTracks => {
            let runtime = runtime(&args)?;
            completion::print_track_completions(&Store::open(&runtime.db_path)?)?;
        }
    }

    Ok(())
}

fn runtime(args: &cli::Args) -> Result<RuntimeConfig> {
    RuntimeConfig::resolve(args.db.clone(), args.config.clone())
}

/// The demo runs on defaults unless a config file was named explicitly.
fn engine_config(args: &cli::Args, demo: bool) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::load(path),
        None if demo => Ok(EngineConfig::default()),
        None => runtime(args)?.engine_config(),
    }
}

fn stored_catalog(args: &cli::Args) -> Result<Vec<Track>> {
    let runtime = runtime(args)?;
    let catalog = Store::open(&runtime.db_path)?.load_catalog()?;
    if catalog.is_empty() {
        bail!(
            "No tracks in {}. Import a catalog with `attune import <file>` or pass --demo.",
            runtime.db_path.display()
        );
    }
    Ok(catalog)
}

fn catalog_for(args: &cli::Args, queue: &QueueArgs) -> Result<Vec<Track>> {
    if queue.demo {
        Ok(track::demo_catalog())
    } else {
        stored_catalog(args)
    }
}

fn learn_profile(catalog: &[Track], seed_playlist: &[String]) -> Result<PreferenceProfile> {
    if seed_playlist.is_empty() {
        Ok(PreferenceProfile::learn(catalog).ok_or(EngineError::EmptyCatalog)?)
    } else {
        Ok(PreferenceProfile::from_seed(catalog, seed_playlist)?)
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn new_session(catalog: Vec<Track>, config: &EngineConfig, queue: &QueueArgs) -> Result<Session<StdRng>> {
    let profile = learn_profile(&catalog, &queue.seed_playlist)?;
    let mut session = Session::new(catalog, config, make_rng(queue.seed));
    session.set_preferences(profile);
    session.set_context(queue.context.to_context());
    Ok(session)
}

fn simulate(args: &cli::Args, queue: &QueueArgs, dry_run: bool, steps: &[SimStep]) -> Result<()> {
    let config = engine_config(args, queue.demo)?;
    let catalog = catalog_for(args, queue)?;
    let store = if queue.demo {
        None
    } else {
        Some(Store::open(&runtime(args)?.db_path)?)
    };

    let mut session = new_session(catalog, &config, queue)?;
    if let Some(store) = &store {
        session.restore_history(store.load_events()?);
    }
    session.generate_queue(&queue.keywords)?;
    println!("Queue for {}:", session.context());
    print_queue(session.queue(), session.current_index());

    for step in steps {
        let outcome = play_step(&mut session, *step)?;
        print_outcome(&outcome);
        if let (Some(store), false) = (&store, dry_run) {
            store.append_event(&outcome.event)?;
        }
        if outcome.next.is_none() {
            println!("Queue completed");
            break;
        }
    }

    println!();
    print_queue(session.queue(), session.current_index());
    print_log(&session);
    Ok(())
}

fn play_step(session: &mut Session<StdRng>, step: SimStep) -> Result<PlayOutcome> {
    let outcome = match step {
        SimStep::Complete => session.play_through()?,
        SimStep::Skip(ratio) => {
            let duration = session
                .current()
                .ok_or(EngineError::NoActiveTrack)?
                .track
                .duration;
            session.seek(duration * ratio)?;
            session.skip()?
        }
    };
    Ok(outcome)
}

/// Sunny relaxing morning on the demo catalog, learning from the seed
/// playlist, with one early skip among full plays.
fn demo(seed: u64) -> Result<()> {
    let catalog = track::demo_catalog();
    let profile = PreferenceProfile::from_seed(&catalog, &DEMO_SEED_PLAYLIST)?;
    let mut session = Session::new(catalog, &EngineConfig::default(), StdRng::seed_from_u64(seed));
    session.set_preferences(profile);
    session.set_context(Context::new(Weather::Sunny, Activity::Relaxing, TimeOfDay::Morning));

    print_profile(session.preferences().ok_or(EngineError::EmptyCatalog)?);
    session.generate_queue("")?;
    println!("\nQueue for {}:", session.context());
    print_queue(session.queue(), session.current_index());
    println!();

    let script = [
        SimStep::Complete,
        SimStep::Skip(0.1),
        SimStep::Complete,
        SimStep::Skip(0.5),
        SimStep::Complete,
        SimStep::Complete,
    ];
    for step in script {
        let outcome = play_step(&mut session, step)?;
        print_outcome(&outcome);
        if outcome.next.is_none() {
            break;
        }
    }

    println!();
    print_queue(session.queue(), session.current_index());
    print_log(&session);
    Ok(())
}

fn print_profile(profile: &PreferenceProfile) {
    println!("Preference profile ({} tracks)", profile.total_tracks);
    println!("  Tempo:        {:.1} BPM", profile.avg_tempo);
    println!("  Energy:       {:.2}", profile.avg_energy);
    println!("  Valence:      {:.2}", profile.avg_valence);
    println!("  Acousticness: {:.2}", profile.avg_acousticness);
    println!("  Genres:");
    let mut genres: Vec<_> = profile.genre_counts.iter().collect();
    genres.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (genre, count) in genres {
        println!("    {genre}: {count}");
    }
}

fn print_queue(queue: &Queue, current: Option<usize>) {
    for (i, entry) in queue.iter().enumerate() {
        let marker = if Some(i) == current { "▶" } else { " " };
        println!(
            "{marker} {:>2}. {} - {} [{}] score {:.3}",
            i + 1,
            entry.track.artist,
            entry.track.title,
            entry.track.genre,
            entry.score
        );
    }
}

fn print_outcome(outcome: &PlayOutcome) {
    let event = &outcome.event;
    let symbol = if event.is_skip() { "✗" } else { "✓" };
    println!(
        "{symbol} {} `{}' at {:.0}% (threshold now {:.0}%, patience {})",
        event.action,
        event.title,
        event.completion_ratio * 100.0,
        outcome.behavior.skip_threshold * 100.0,
        outcome.behavior.patience
    );
    if !outcome.adaptation.removed.is_empty() {
        println!("    removed: {}", outcome.adaptation.removed.join(", "));
    }
    if let Some(added) = &outcome.adaptation.added {
        println!("    added:   {added}");
    }
}

fn print_log(session: &Session<StdRng>) {
    println!("\nAdaptation log:");
    for entry in session.log().recent(10) {
        println!("  [{}] {}", entry.timestamp.format("%H:%M:%S"), entry.message);
    }
}

fn format_duration(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(245.4), "4:05");
        assert_eq!(format_duration(-3.0), "0:00");
    }

    #[test]
    fn test_learn_profile_from_seed_or_catalog() {
        let catalog = track::demo_catalog();
        let all = learn_profile(&catalog, &[]).expect("profile");
        assert_eq!(all.total_tracks, 20);

        let seeded = learn_profile(&catalog, &["1".to_string(), "4".to_string()]).expect("profile");
        assert_eq!(seeded.total_tracks, 2);

        assert!(learn_profile(&catalog, &["nope".to_string()]).is_err());
        assert!(learn_profile(&[], &[]).is_err());
    }

    #[test]
    fn test_play_step_skip_uses_ratio_of_duration() {
        let catalog = track::demo_catalog();
        let mut session = Session::new(catalog, &EngineConfig::default(), StdRng::seed_from_u64(1));
        session.generate_queue("").expect("queue");

        let outcome = play_step(&mut session, SimStep::Skip(0.25)).expect("step");
        assert!((outcome.event.completion_ratio - 0.25).abs() < 1e-9);
        assert!(outcome.event.is_skip());
    }
}
