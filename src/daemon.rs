//! # Mood Daemon
//!
//! The watch loop that ties everything together. Each cycle:
//!
//! 1. waits (bounded by the poll interval) for the gamelog to change
//! 2. feeds every new line, in order, through the rules into the state machine
//!    and plays the resulting actions
//! 3. if the main channel has gone quiet, falls back to season music
//!
//! Everything runs on one thread, so playback decisions are applied in exactly
//! the order the lines were written.
//!
//! ## Startup and Shutdown
//!
//! On startup the session file supplies the season and the gamelog position
//! (it is created if missing). The unread backlog is fetched once; by default
//! only its last line is applied, which picks up the most recent mood without
//! replaying a whole game's worth of music changes.
//!
//! The loop ends when [`interrupted`] becomes true (Ctrl-C). The caller then
//! asks the operator whether to save, and calls [`MoodDaemon::shutdown`].

use crate::audio::AudioOutput;
use crate::config::MoodConfig;
use crate::jukebox;
use crate::rules::{ParsePolicy, RuleBook};
use crate::season::{PersistedSession, SeasonStore};
use crate::state::PlaybackState;
use crate::tailer::{LogSource, LogTailer, PollingLogSource};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT to [`interrupted`] instead of killing the process.
pub fn install_interrupt_handler() {
    let handler = on_interrupt as extern "C" fn(libc::c_int);
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

/// The flag set by the interrupt handler.
pub fn interrupted() -> &'static AtomicBool {
    &INTERRUPTED
}

/// Loop timings and startup behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSettings {
    pub poll_interval: Duration,
    pub effect_fade: Duration,
    pub replay_backlog: bool,
}

impl From<&MoodConfig> for DaemonSettings {
    fn from(config: &MoodConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            effect_fade: config.effect_fade(),
            replay_backlog: config.replay_backlog,
        }
    }
}

/// Owns the tailer, rules, playback state and audio output for one session.
pub struct MoodDaemon<A: AudioOutput, S: LogSource = PollingLogSource> {
    tailer: LogTailer<S>,
    rules: RuleBook,
    state: PlaybackState,
    audio: A,
    store: SeasonStore,
    settings: DaemonSettings,
}

impl<A: AudioOutput> MoodDaemon<A> {
    /// Opens the rule file and gamelog named in `config`.
    pub fn new(config: &MoodConfig, store: SeasonStore, audio: A) -> Result<Self> {
        let policy = if config.strict_rules {
            ParsePolicy::Strict
        } else {
            ParsePolicy::Skip
        };
        let rules = RuleBook::open(&config.rules, policy)?;
        let tailer = LogTailer::open(&config.gamelog, config.cushion_bytes)?;
        let state = PlaybackState::new(&config.default_season);

        Ok(Self::from_parts(tailer, rules, state, audio, store, DaemonSettings::from(config)))
    }
}

impl<A: AudioOutput, S: LogSource> MoodDaemon<A, S> {
    pub fn from_parts(
        tailer: LogTailer<S>,
        rules: RuleBook,
        state: PlaybackState,
        audio: A,
        store: SeasonStore,
        settings: DaemonSettings,
    ) -> Self {
        Self {
            tailer,
            rules,
            state,
            audio,
            store,
            settings,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn tailer(&self) -> &LogTailer<S> {
        &self.tailer
    }

    /// Restores season and gamelog position from the session file.
    ///
    /// A missing file is created from the current state; a corrupt one is an error.
    pub fn restore(&mut self) -> Result<()> {
        let defaults = PersistedSession::new(self.state.season(), self.tailer.watermark().read_offset);
        let session = self.store.load_or_create(&defaults)?;
        self.state.set_season(session.season);
        self.tailer.resume_from(session.offset);
        Ok(())
    }

    /// Applies the unread backlog: only its last line unless replay is enabled.
    pub fn catch_up(&mut self) -> Result<()> {
        let lines = self.tailer.fetch_new_lines()?;
        debug!("{} backlog lines", lines.len());

        if self.settings.replay_backlog {
            for line in &lines {
                self.handle_line(line);
            }
        } else if let Some(line) = lines.last() {
            self.handle_line(line);
        }
        Ok(())
    }

    /// Matches one gamelog line and plays whatever it calls for.
    pub fn handle_line(&mut self, line: &str) {
        let Some((target, priority)) = self
            .rules
            .rules()
            .find_match(line)
            .map(|(target, priority)| (target.to_string(), priority))
        else {
            return;
        };

        info!("Match found: {line}");
        let action = self.state.apply(&target, priority);
        if let Err(e) = jukebox::execute(&mut self.audio, &mut self.state, action, self.settings.effect_fade) {
            warn!("Could not play {target}: {e}");
        }
    }

    /// Falls back to season music if the main channel is idle.
    pub fn check_idle(&mut self) {
        if !self.audio.is_main_idle() {
            return;
        }

        debug!("Main channel idle, resuming {}", self.state.season());
        let action = self.state.on_main_idle();
        if let Err(e) = jukebox::execute(&mut self.audio, &mut self.state, action, self.settings.effect_fade) {
            error!("Season music {} is unplayable: {e}", self.state.season());
        }
    }

    /// One wait-fetch-play-fallback round.
    pub fn run_cycle(&mut self) -> Result<()> {
        let changed = self.tailer.wait_for_growth(self.settings.poll_interval)
            && (self.tailer.has_grown() || self.tailer.is_truncated());

        if changed {
            for line in self.tailer.fetch_new_lines()? {
                self.handle_line(&line);
            }
        }

        self.check_idle();
        Ok(())
    }

    /// Restores the session, catches up, and loops until `stop` is set.
    pub fn start(&mut self, stop: &AtomicBool) -> Result<()> {
        info!("Watching {}", self.tailer.path().display());
        self.restore()?;
        if let Err(e) = self.catch_up() {
            warn!("Could not read gamelog backlog: {e:#}");
        }

        while !stop.load(Ordering::SeqCst) {
            if let Err(e) = self.run_cycle() {
                error!("Error in watch loop: {e:#}");
                std::thread::sleep(self.settings.poll_interval);
            }
        }

        info!("Quitting.");
        Ok(())
    }

    /// The season and delivered gamelog position as they would be saved.
    pub fn session(&self) -> PersistedSession {
        PersistedSession::new(self.state.season(), self.tailer.watermark().read_offset)
    }

    /// Persists the session if asked to.
    pub fn shutdown(&self, save: bool) -> Result<()> {
        if save {
            self.store.save(&self.session())?;
        } else {
            info!("Session not saved");
        }
        Ok(())
    }
}

/// Asks whether to save until the operator answers `y` or `n`.
///
/// End of input counts as `n`.
pub fn prompt_save<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool> {
    let mut answer = String::new();
    loop {
        write!(output, "Do you want to save the season? (y/n): ")?;
        output.flush()?;

        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            warn!("No answer on stdin, not saving");
            return Ok(false);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => continue,
        }
    }
}
