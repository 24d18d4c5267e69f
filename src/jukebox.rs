//! # Jukebox Module
//!
//! Turns [`PlaybackAction`]s into calls on an [`AudioOutput`].
//!
//! A rule target may name a single track or a folder. For a folder one track
//! is picked uniformly at random. If the target cannot be played the season
//! music is tried instead, once; if that fails as well the error is returned.

use crate::audio::{AudioError, AudioOutput};
use crate::state::{PlaybackAction, PlaybackState, Repeat};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which track ended up on the main channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Target(PathBuf),
    Fallback(PathBuf),
}

/// Resolves a rule target to a concrete track.
///
/// Existing directories yield a random regular file from inside them; any
/// other path is returned as is.
pub fn resolve_target(target: &Path) -> Result<PathBuf, AudioError> {
    if !target.is_dir() {
        return Ok(target.to_path_buf());
    }

    let entries = fs::read_dir(target).map_err(|source| AudioError::ReadFolder {
        path: target.to_path_buf(),
        source,
    })?;
    let tracks: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    tracks
        .choose(&mut thread_rng())
        .cloned()
        .ok_or_else(|| AudioError::EmptyFolder {
            path: target.to_path_buf(),
        })
}

fn play<A: AudioOutput + ?Sized>(audio: &mut A, target: &str, repeat: Repeat) -> Result<PathBuf, AudioError> {
    let track = resolve_target(Path::new(target))?;
    audio.play_main(&track, repeat)?;
    info!("Playing {}", track.display());
    Ok(track)
}

/// Plays `target` on the main channel, or `season` if that fails.
pub fn play_main_or_fallback<A: AudioOutput + ?Sized>(
    audio: &mut A,
    target: &str,
    repeat: Repeat,
    season: &str,
) -> Result<PlayOutcome, AudioError> {
    match play(audio, target, repeat) {
        Ok(track) => Ok(PlayOutcome::Target(track)),
        Err(e) if target != season => {
            warn!("{e}; falling back to {season}");
            play(audio, season, Repeat::Forever).map(PlayOutcome::Fallback)
        }
        Err(e) => Err(e),
    }
}

/// Carries out one action. A fallback to season music also drops the
/// main priority back to the season level.
pub fn execute<A: AudioOutput + ?Sized>(
    audio: &mut A,
    state: &mut PlaybackState,
    action: PlaybackAction,
    effect_fade: Duration,
) -> Result<(), AudioError> {
    match action {
        PlaybackAction::PlayMain { target, repeat } => {
            let outcome = play_main_or_fallback(audio, &target, repeat, state.season())?;
            if let PlayOutcome::Fallback(_) = outcome {
                state.fell_back();
            }
        }
        PlaybackAction::PlayEffectLoop { target } => {
            let track = resolve_target(Path::new(&target))?;
            audio.play_effect_loop(&track)?;
            info!("Looping effect {}", track.display());
        }
        PlaybackAction::StopEffect => audio.stop_effect(effect_fade),
        PlaybackAction::Nothing => {}
    }
    Ok(())
}
