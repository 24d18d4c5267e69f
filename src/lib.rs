//! Gamelog-driven soundtrack: follows a game's text log and picks music to match.
//!
//! Core modules:
//! - [`tailer`] - Incremental gamelog reading with byte watermarks
//! - [`rules`] - Pattern-to-music bindings, first match wins
//! - [`state`] - Priority state machine for the main and effect channels
//! - [`jukebox`] - Track/folder resolution and season fallback
//! - [`season`] - Session persistence (season + gamelog position)
//! - [`daemon`] - The single-threaded watch loop
//!
//! ### Supporting Modules
//!
//! - [`audio`] - Audio output seam, rodio backend and dry-run recorder
//! - [`config`] - JSON configuration and platform directories
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use dfmuse::audio::DryRunOutput;
//! use dfmuse::config::MoodConfig;
//! use dfmuse::daemon::{self, MoodDaemon};
//! use dfmuse::season::SeasonStore;
//!
//! let config = MoodConfig::default();
//! let store = SeasonStore::new("fortress.sav");
//! let mut daemon = MoodDaemon::new(&config, store, DryRunOutput::new())?;
//!
//! daemon::install_interrupt_handler();
//! daemon.start(daemon::interrupted())?; // Runs until Ctrl-C
//! daemon.shutdown(true)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Priorities
//!
//! Each rule carries a priority. `-1` loops an ambient effect and `-2` fades it
//! out; `0` changes the season; `1` plays a one-shot track; `2` and up are
//! looping overrides that lower-priority events cannot interrupt. When the main
//! channel falls silent, season music resumes.
//!
//! ## Error Handling
//!
//! Unplayable tracks and empty folders fall back to season music and are only
//! logged. A corrupt session file is the one error that stops the program.

pub mod audio;
pub mod cli;
pub mod completion;
pub mod config;
pub mod daemon;
pub mod jukebox;
pub mod rules;
pub mod season;
pub mod state;
pub mod tailer;
