//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for dfmuse using Clap derive macros.
//!
//! dfmuse has a single mode of operation: watch the gamelog and play music.
//! A session file must be named with `--load`; it is created on first use.
//!
//! ## Examples
//!
//! ```bash
//! dfmuse -l fortress.sav
//! dfmuse --load fortress.sav --gamelog "../Dwarf Fortress/gamelog.txt" --rules music.cfg
//! dfmuse -l fortress.sav --dry-run
//! dfmuse --completions bash > ~/.local/share/bash-completion/completions/dfmuse
//! ```

use crate::config::MoodConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
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
///
/// Every option except `--load` has a counterpart in the config file; a
/// flag given here wins over the file.
#[derive(Parser, Debug)]
#[command(name = "dfmuse")]
#[command(about = "dfmuse: Gamelog-driven soundtrack - watches a game log and plays mood music")]
#[command(version)]
pub struct Args {
    /// Session file holding the saved season and gamelog position
    ///
    /// Created with the default season if it does not exist yet.
    #[arg(short, long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub load: Option<PathBuf>,

    /// Gamelog to watch
    #[arg(long, value_name = "PATH", env = "DFMUSE_GAMELOG", value_hint = clap::ValueHint::FilePath)]
    pub gamelog: Option<PathBuf>,

    /// Rule file mapping log patterns to music
    #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub rules: Option<PathBuf>,

    /// JSON config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Apply every unread gamelog line at startup, not just the last one
    #[arg(long)]
    pub replay_backlog: bool,

    /// Refuse rule files with malformed records instead of skipping them
    #[arg(long)]
    pub strict_rules: bool,

    /// Log what would be played without opening an audio device
    #[arg(long)]
    pub dry_run: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Args {
    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, mut config: MoodConfig) -> MoodConfig {
        if let Some(gamelog) = &self.gamelog {
            config.gamelog = gamelog.clone();
        }
        if let Some(rules) = &self.rules {
            config.rules = rules.clone();
        }
        config.replay_backlog |= self.replay_backlog;
        config.strict_rules |= self.strict_rules;
        config
    }
}

/// Printed when `--load` is missing.
pub const LOAD_USAGE: &str = "No file specified for loading. Usage: dfmuse -l <session file>";
