//! # dfmuse - Gamelog-Driven Soundtrack
//!
//! Watches a game's text log and changes the music to fit what is happening.
//!
//! ## Usage
//!
//! ```bash
//! # Watch with the session stored in fortress.sav
//! dfmuse -l fortress.sav
//!
//! # Point at a specific gamelog and rule file
//! dfmuse -l fortress.sav --gamelog "../Dwarf Fortress/gamelog.txt" --rules music.cfg
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use dfmuse::audio::{AudioOutput, DryRunOutput, RodioOutput};
use dfmuse::config::{self, MoodConfig};
use dfmuse::daemon::{self, MoodDaemon};
use dfmuse::season::SeasonStore;
use dfmuse::{cli, completion};
use log::{debug, info};
use std::io;

/// Main entry point for dfmuse.
///
/// Initializes logging, parses command-line arguments, merges them over the
/// config file, and runs the watch loop until Ctrl-C.
///
/// # Logging
///
/// Logs at `info` by default; `RUST_LOG` overrides it:
/// - `RUST_LOG=debug dfmuse -l fortress.sav` - Enable debug logging
/// - `RUST_LOG=dfmuse::tailer=debug dfmuse -l fortress.sav` - Module-specific logging
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();

    if let Some(shell) = args.completions {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let Some(session_path) = args.load.clone() else {
        eprintln!("{}", cli::LOAD_USAGE);
        std::process::exit(2);
    };

    let config = args.apply_overrides(config::load_config(args.config.as_deref())?);
    debug!("Effective config: {config:?}");
    let store = SeasonStore::new(session_path);

    daemon::install_interrupt_handler();

    if args.dry_run {
        run(&config, store, DryRunOutput::new())
    } else {
        run(&config, store, RodioOutput::new(config.effect_fade())?)
    }
}

fn run<A: AudioOutput>(config: &MoodConfig, store: SeasonStore, audio: A) -> Result<()> {
    let mut daemon = MoodDaemon::new(config, store, audio)?;
    daemon.start(daemon::interrupted())?;

    let save = daemon::prompt_save(&mut io::stdin().lock(), &mut io::stdout())?;
    daemon.shutdown(save)?;
    info!("Goodbye");
    Ok(())
}
