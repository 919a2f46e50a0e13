//! # Shell Completion Module
//!
//! Completion scripts for the supported shells, plus the hidden
//! `complete-tracks` listing that scripts may call to offer stored track ids
//! for `--from`.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! attune completion bash > ~/.local/share/bash-completion/completions/attune
//!
//! # Generate zsh completions
//! attune completion zsh > ~/.config/zsh/completions/_attune
//! ```

use attune::db::Store;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// `id<TAB>title - artist` lines for every stored track.
///
/// Fish shows the part after the tab as a description; other shells can cut
/// it off.
pub fn get_track_completions(store: &Store) -> Result<Vec<String>> {
    Ok(store
        .load_catalog()?
        .into_iter()
        .map(|t| format!("{}\t{} - {}", t.id, t.title, t.artist))
        .collect())
}

pub fn print_track_completions(store: &Store) -> Result<()> {
    for line in get_track_completions(store)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Shell;
    use attune::track::demo_catalog;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(Shell::Zsh), CompletionShell::Zsh);
        assert_eq!(shell_to_completion_shell(Shell::Fish), CompletionShell::Fish);
        assert_eq!(shell_to_completion_shell(Shell::PowerShell), CompletionShell::PowerShell);
        assert_eq!(shell_to_completion_shell(Shell::Elvish), CompletionShell::Elvish);
    }

    #[test]
    fn test_track_completions_empty_db() {
        let store = Store::open_in_memory().expect("open");
        assert!(get_track_completions(&store).expect("completions").is_empty());
    }

    #[test]
    fn test_track_completions_list_ids() {
        let mut store = Store::open_in_memory().expect("open");
        store.replace_catalog(&demo_catalog()).expect("store");

        let lines = get_track_completions(&store).expect("completions");
        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.contains('\t')));
        assert!(lines.iter().any(|l| l.starts_with("19\t")));
    }
}
