//! # Audio Output Module
//!
//! Two independent channels:
//!
//! - **main**: the music track chosen by the state machine
//! - **effect**: one looping ambient sound (rain, wind, ...)
//!
//! [`RodioOutput`] drives a real sound device. [`DryRunOutput`] only records
//! what would have been played, for checking rule files against a log
//! without speakers and for tests.

use crate::state::Repeat;
use log::{debug, info};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// File extensions the decoders are built with.
pub const AUDIO_EXTENSIONS: &[&str] = &["ogg", "mp3", "wav"];

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("cannot list folder {}: {source}", path.display())]
    ReadFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("folder {} has no tracks", path.display())]
    EmptyFolder { path: PathBuf },

    #[error("audio device unavailable: {0}")]
    Device(String),
}

/// What the playback core needs from a sound backend.
pub trait AudioOutput {
    /// Replaces whatever is on the main channel with `file`.
    fn play_main(&mut self, file: &Path, repeat: Repeat) -> Result<(), AudioError>;

    /// True once the main channel has nothing left to play.
    fn is_main_idle(&self) -> bool;

    /// Replaces the ambient effect with `file`, looping forever.
    fn play_effect_loop(&mut self, file: &Path) -> Result<(), AudioError>;

    /// Fades the ambient effect out over `fade`.
    fn stop_effect(&mut self, fade: Duration);
}

fn open_track(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Sound device output built on rodio.
pub struct RodioOutput {
    // Dropping the stream silences every sink.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    main: Option<Sink>,
    effect: Option<Sink>,
    effect_fade_in: Duration,
}

impl RodioOutput {
    /// Opens the default output device.
    pub fn new(effect_fade_in: Duration) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
        info!("Opened default audio device");
        Ok(Self {
            _stream: stream,
            handle,
            main: None,
            effect: None,
            effect_fade_in,
        })
    }

    fn new_sink(&self) -> Result<Sink, AudioError> {
        Sink::try_new(&self.handle).map_err(|e| AudioError::Device(e.to_string()))
    }
}

impl AudioOutput for RodioOutput {
    fn play_main(&mut self, file: &Path, repeat: Repeat) -> Result<(), AudioError> {
        let source = open_track(file)?;
        let sink = self.new_sink()?;
        match repeat {
            Repeat::Once => sink.append(source),
            Repeat::Forever => sink.append(source.repeat_infinite()),
        }
        // The previous sink stops when dropped.
        self.main = Some(sink);
        Ok(())
    }

    fn is_main_idle(&self) -> bool {
        self.main.as_ref().map_or(true, Sink::empty)
    }

    fn play_effect_loop(&mut self, file: &Path) -> Result<(), AudioError> {
        let source = open_track(file)?;
        let sink = self.new_sink()?;
        sink.append(source.repeat_infinite().fade_in(self.effect_fade_in));
        self.effect = Some(sink);
        Ok(())
    }

    fn stop_effect(&mut self, fade: Duration) {
        let Some(sink) = self.effect.take() else {
            debug!("No ambient effect to stop");
            return;
        };

        thread::spawn(move || {
            const STEPS: u32 = 20;
            let start = sink.volume();
            for step in (0..STEPS).rev() {
                sink.set_volume(start * step as f32 / STEPS as f32);
                thread::sleep(fade / STEPS);
            }
            sink.stop();
        });
    }
}

/// One call recorded by [`DryRunOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Main { file: PathBuf, repeat: Repeat },
    EffectLoop { file: PathBuf },
    StopEffect,
}

/// Output that plays nothing and remembers every request.
///
/// A file must exist and carry one of [`AUDIO_EXTENSIONS`] to count as
/// playable. A one-shot track is reported finished as soon as it is polled.
#[derive(Debug, Default)]
pub struct DryRunOutput {
    history: Vec<AudioEvent>,
    main_looping: bool,
}

impl DryRunOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[AudioEvent] {
        &self.history
    }

    /// Main-channel tracks requested so far, oldest first.
    pub fn main_tracks(&self) -> Vec<&Path> {
        self.history
            .iter()
            .filter_map(|event| match event {
                AudioEvent::Main { file, .. } => Some(file.as_path()),
                _ => None,
            })
            .collect()
    }

    fn check(file: &Path) -> Result<(), AudioError> {
        File::open(file).map_err(|source| AudioError::Open {
            path: file.to_path_buf(),
            source,
        })?;

        let supported = file
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if supported {
            Ok(())
        } else {
            Err(AudioError::Decode {
                path: file.to_path_buf(),
                reason: "unsupported format".to_string(),
            })
        }
    }
}

impl AudioOutput for DryRunOutput {
    fn play_main(&mut self, file: &Path, repeat: Repeat) -> Result<(), AudioError> {
        Self::check(file)?;
        info!("[dry run] main: {} ({repeat:?})", file.display());
        self.main_looping = repeat == Repeat::Forever;
        self.history.push(AudioEvent::Main {
            file: file.to_path_buf(),
            repeat,
        });
        Ok(())
    }

    fn is_main_idle(&self) -> bool {
        !self.main_looping
    }

    fn play_effect_loop(&mut self, file: &Path) -> Result<(), AudioError> {
        Self::check(file)?;
        info!("[dry run] effect: {}", file.display());
        self.history.push(AudioEvent::EffectLoop {
            file: file.to_path_buf(),
        });
        Ok(())
    }

    fn stop_effect(&mut self, fade: Duration) {
        info!("[dry run] stop effect ({}ms fade)", fade.as_millis());
        self.history.push(AudioEvent::StopEffect);
    }
}
