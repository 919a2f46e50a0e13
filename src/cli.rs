//! # Command-Line Interface Module
//!
//! Clap definitions for the `attune` binary.
//!
//! ## Commands
//!
//! - `import`: Load a JSON catalog into the database
//! - `list`: Show the stored catalog
//! - `profile`: Show the learned preference profile
//! - `queue`: Generate a queue for a context
//! - `simulate`: Play through a queue with scripted skips and completions
//! - `behavior`: Show (or reset) the listening behavior profile
//! - `demo`: Run the built-in 20-track demo session
//!
//! ## Examples
//!
//! ```bash
//! attune import tracks.json
//! attune queue --weather rainy --activity focusing --keywords "jazz, piano"
//! attune simulate --seed 7 complete skip@0.1 complete
//! ```

use attune::context::{Activity, Context, TimeOfDay, Weather};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "attune")]
#[command(about = "Attune: context-aware music queues that adapt to how you listen")]
#[command(version)]
pub struct Args {
    /// SQLite database holding the catalog and listening history
    #[arg(long, global = true, env = "ATTUNE_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Engine config file (JSON)
    #[arg(long, global = true, env = "ATTUNE_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Listening context flags shared by queue-producing commands.
#[derive(ClapArgs, Debug, Clone)]
pub struct ContextArgs {
    /// Weather: sunny, rainy, cloudy or clear
    #[arg(long, default_value = "sunny")]
    pub weather: Weather,

    /// Activity: relaxing, working-out, focusing or partying
    #[arg(long, default_value = "relaxing")]
    pub activity: Activity,

    /// Time of day: morning, afternoon, evening or night
    #[arg(long = "time", default_value = "afternoon", conflicts_with = "hour")]
    pub time_of_day: TimeOfDay,

    /// Derive the time of day from an hour (0-23) instead
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: Option<u32>,

    /// Free-form location label
    #[arg(long, default_value = "home")]
    pub location: String,
}

impl ContextArgs {
    #[must_use]
    pub fn to_context(&self) -> Context {
        let time_of_day = self.hour.map_or(self.time_of_day, TimeOfDay::from_hour);
        Context {
            location: self.location.clone(),
            ..Context::new(self.weather, self.activity, time_of_day)
        }
    }
}

/// Options for building a queue.
#[derive(ClapArgs, Debug, Clone)]
pub struct QueueArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    /// Comma separated keywords matched against title, artist and genre
    #[arg(short, long, default_value = "")]
    pub keywords: String,

    /// Learn preferences from these track ids instead of the whole catalog
    #[arg(long = "from", value_delimiter = ',')]
    pub seed_playlist: Vec<String>,

    /// Seed the random number generator for a reproducible queue
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the built-in demo catalog instead of the database
    #[arg(long)]
    pub demo: bool,
}

/// One scripted step of a simulated listening session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimStep {
    /// Skip after listening to this fraction of the track
    Skip(f64),
    /// Let the track play to its end
    Complete,
}

impl FromStr for SimStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.split_once('@') {
            None if s == "complete" || s == "play" => Ok(Self::Complete),
            None if s == "skip" => Ok(Self::Skip(0.0)),
            Some(("skip", ratio)) => {
                let ratio: f64 = ratio
                    .parse()
                    .map_err(|_| format!("invalid skip position `{ratio}'"))?;
                if (0.0..=1.0).contains(&ratio) {
                    Ok(Self::Skip(ratio))
                } else {
                    Err(format!("skip position {ratio} is outside 0..=1"))
                }
            }
            _ => Err(format!("unknown step `{s}' (expected complete, skip or skip@RATIO)")),
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a JSON track catalog, replacing the stored one
    ///
    /// The file must hold an array of track objects with id, title, artist,
    /// genre, tempo, energy, valence, acousticness and duration. Tracks with
    /// a repeated id are dropped.
    Import {
        /// Path to the catalog JSON file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// List all tracks in the database
    List,

    /// Show the preference profile learned from the catalog
    Profile {
        /// Learn from these track ids instead of the whole catalog
        #[arg(long = "from", value_delimiter = ',')]
        seed_playlist: Vec<String>,

        /// Use the built-in demo catalog instead of the database
        #[arg(long)]
        demo: bool,
    },

    /// Generate a queue for a listening context
    Queue {
        #[command(flatten)]
        queue: QueueArgs,
    },

    /// Play a generated queue with scripted skips and completions
    ///
    /// Each step ends the current track: `complete` plays it to the end,
    /// `skip@0.2` skips it after 20% of its duration. Events are stored
    /// in the listening history unless `--dry-run` is given.
    Simulate {
        #[command(flatten)]
        queue: QueueArgs,

        /// Do not store the resulting listening events
        #[arg(long)]
        dry_run: bool,

        /// Steps to play, in order
        #[arg(required = true)]
        steps: Vec<SimStep>,
    },

    /// Show the behavior profile built from the listening history
    Behavior {
        /// Forget the stored listening history
        #[arg(long)]
        reset: bool,
    },

    /// Run a short session on the built-in demo catalog
    Demo {
        /// Seed the random number generator
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Generate shell completions
    ///
    /// Usage: attune completion bash > ~/.local/share/bash-completion/completions/attune
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List stored track ids for completion (hidden command)
    #[command(hide = true)]
    CompleteTracks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_sim_step_parsing() {
        assert_eq!("complete".parse::<SimStep>(), Ok(SimStep::Complete));
        assert_eq!("Skip@0.25".parse::<SimStep>(), Ok(SimStep::Skip(0.25)));
        assert_eq!("skip".parse::<SimStep>(), Ok(SimStep::Skip(0.0)));
        assert!("skip@1.5".parse::<SimStep>().is_err());
        assert!("skip@soon".parse::<SimStep>().is_err());
        assert!("rewind".parse::<SimStep>().is_err());
    }

    #[test]
    fn test_queue_context_flags() {
        let args = Args::try_parse_from([
            "attune", "queue", "--weather", "Rainy", "--activity", "working out", "--hour", "22",
            "--keywords", "jazz", "--seed", "3",
        ])
        .expect("valid arguments");

        let Command::Queue { queue } = args.command else {
            panic!("expected queue command");
        };
        let context = queue.context.to_context();
        assert_eq!(context.weather, Weather::Rainy);
        assert_eq!(context.activity, Activity::WorkingOut);
        assert_eq!(context.time_of_day, TimeOfDay::Night);
        assert_eq!(queue.seed, Some(3));
        assert_eq!(queue.keywords, "jazz");
    }

    #[test]
    fn test_time_and_hour_conflict() {
        let result = Args::try_parse_from(["attune", "queue", "--time", "morning", "--hour", "9"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_simulate_requires_steps() {
        assert!(Args::try_parse_from(["attune", "simulate"]).is_err());
        let args = Args::try_parse_from(["attune", "simulate", "--dry-run", "--demo", "skip@0.1", "complete"])
            .expect("valid arguments");
        let Command::Simulate { steps, dry_run, .. } = args.command else {
            panic!("expected simulate command");
        };
        assert!(dry_run);
        assert_eq!(steps, vec![SimStep::Skip(0.1), SimStep::Complete]);
    }

    #[test]
    fn test_seed_playlist_is_comma_separated() {
        let args = Args::try_parse_from(["attune", "profile", "--from", "1,4,7"]).expect("valid arguments");
        let Command::Profile { seed_playlist, .. } = args.command else {
            panic!("expected profile command");
        };
        assert_eq!(seed_playlist, vec!["1", "4", "7"]);
    }
}
