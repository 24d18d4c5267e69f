//! # Playback State Machine
//!
//! Decides what a matched rule does to the music. Every rule carries a
//! priority that selects one of these bands:
//!
//! | priority | effect |
//! |---|---|
//! | -1 | start (or replace) the looping ambient effect |
//! | -2 | fade the ambient effect out |
//! | 0 | change season; play it unless a priority > 1 track is active |
//! | 1 | one-shot foreground track |
//! | >= 2 | looping override track, ignored while a higher one plays |
//!
//! The ambient effect lives on its own channel and never touches the main
//! priority. When the main channel runs dry the daemon calls
//! [`PlaybackState::on_main_idle`] to go back to season music.

use log::{debug, warn};

/// How often a main-channel track plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Forever,
}

/// Instruction for the audio layer produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackAction {
    PlayMain { target: String, repeat: Repeat },
    PlayEffectLoop { target: String },
    StopEffect,
    /// The event was recorded or ignored without audible change.
    Nothing,
}

pub const PRIORITY_EFFECT: i32 = -1;
pub const PRIORITY_STOP_EFFECT: i32 = -2;
pub const PRIORITY_SEASON: i32 = 0;
pub const PRIORITY_FOREGROUND: i32 = 1;

/// Current main-channel priority and the season to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    priority: i32,
    season: String,
}

impl PlaybackState {
    pub fn new(season: impl Into<String>) -> Self {
        Self {
            priority: PRIORITY_SEASON,
            season: season.into(),
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    /// Replaces the season without emitting anything, e.g. after restoring a session.
    pub fn set_season(&mut self, season: impl Into<String>) {
        self.season = season.into();
    }

    /// Applies one matched rule and returns what should be played.
    pub fn apply(&mut self, target: &str, priority: i32) -> PlaybackAction {
        match priority {
            PRIORITY_EFFECT => PlaybackAction::PlayEffectLoop {
                target: target.to_string(),
            },
            PRIORITY_STOP_EFFECT => PlaybackAction::StopEffect,
            PRIORITY_SEASON => {
                self.season = target.to_string();
                if self.priority <= PRIORITY_FOREGROUND {
                    self.priority = PRIORITY_SEASON;
                    PlaybackAction::PlayMain {
                        target: self.season.clone(),
                        repeat: Repeat::Forever,
                    }
                } else {
                    debug!("Season set to {target}, held back by priority {}", self.priority);
                    PlaybackAction::Nothing
                }
            }
            p if p >= PRIORITY_FOREGROUND => {
                if p < self.priority {
                    debug!("Ignoring {target} (priority {p} < {})", self.priority);
                    return PlaybackAction::Nothing;
                }
                self.priority = p;
                let repeat = if p == PRIORITY_FOREGROUND {
                    Repeat::Once
                } else {
                    Repeat::Forever
                };
                PlaybackAction::PlayMain {
                    target: target.to_string(),
                    repeat,
                }
            }
            p => {
                warn!("Unknown priority {p} for {target}, ignoring");
                PlaybackAction::Nothing
            }
        }
    }

    /// Season music replaced a track that failed to play.
    pub fn fell_back(&mut self) {
        self.priority = PRIORITY_SEASON;
    }

    /// The main channel finished: drop back to season music.
    pub fn on_main_idle(&mut self) -> PlaybackAction {
        self.priority = PRIORITY_SEASON;
        PlaybackAction::PlayMain {
            target: self.season.clone(),
            repeat: Repeat::Forever,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(target: &str, repeat: Repeat) -> PlaybackAction {
        PlaybackAction::PlayMain {
            target: target.to_string(),
            repeat,
        }
    }

    #[test]
    fn test_season_change_plays_when_idle() {
        let mut state = PlaybackState::new("music/explore");
        assert_eq!(state.apply("music/spring", 0), play("music/spring", Repeat::Forever));
        assert_eq!(state.season(), "music/spring");
        assert_eq!(state.priority(), 0);
    }

    #[test]
    fn test_season_change_overrides_foreground() {
        let mut state = PlaybackState::new("music/explore");
        state.apply("music/menu.ogg", 1);
        assert_eq!(state.apply("music/winter", 0), play("music/winter", Repeat::Forever));
        assert_eq!(state.priority(), 0);
    }

    #[test]
    fn test_season_change_held_by_override() {
        let mut state = PlaybackState::new("music/explore");
        state.apply("music/siege.ogg", 4);
        assert_eq!(state.apply("music/summer", 0), PlaybackAction::Nothing);
        assert_eq!(state.season(), "music/summer");
        assert_eq!(state.priority(), 4);
    }

    #[test]
    fn test_repeated_season_event_replays() {
        let mut state = PlaybackState::new("music/explore");
        let first = state.apply("music/autumn", 0);
        let second = state.apply("music/autumn", 0);
        assert_eq!(first, second);
        assert_eq!(first, play("music/autumn", Repeat::Forever));
    }

    #[test]
    fn test_foreground_plays_once() {
        let mut state = PlaybackState::new("music/explore");
        assert_eq!(state.apply("music/menu.ogg", 1), play("music/menu.ogg", Repeat::Once));
        assert_eq!(state.priority(), 1);
    }

    #[test]
    fn test_lower_priority_ignored() {
        let mut state = PlaybackState::new("music/explore");
        assert_eq!(state.apply("music/ambush.ogg", 3), play("music/ambush.ogg", Repeat::Forever));
        assert_eq!(state.apply("music/menu.ogg", 1), PlaybackAction::Nothing);
        assert_eq!(state.apply("music/raid.ogg", 2), PlaybackAction::Nothing);
        assert_eq!(state.priority(), 3);
    }

    #[test]
    fn test_equal_or_higher_priority_overrides() {
        let mut state = PlaybackState::new("music/explore");
        state.apply("music/ambush.ogg", 3);
        assert_eq!(state.apply("music/ambush2.ogg", 3), play("music/ambush2.ogg", Repeat::Forever));
        assert_eq!(state.apply("music/beast.ogg", 5), play("music/beast.ogg", Repeat::Forever));
        assert_eq!(state.priority(), 5);
    }

    #[test]
    fn test_effect_channel_independent() {
        let mut state = PlaybackState::new("music/explore");
        state.apply("music/beast.ogg", 5);
        assert_eq!(
            state.apply("sfx/rain.ogg", -1),
            PlaybackAction::PlayEffectLoop { target: "sfx/rain.ogg".to_string() }
        );
        assert_eq!(state.apply("sfx/rain.ogg", -2), PlaybackAction::StopEffect);
        assert_eq!(state.priority(), 5);
        assert_eq!(state.season(), "music/explore");
    }

    #[test]
    fn test_idle_falls_back_to_season() {
        let mut state = PlaybackState::new("music/explore");
        state.apply("music/beast.ogg", 5);
        state.apply("music/spring", 0);
        assert_eq!(state.on_main_idle(), play("music/spring", Repeat::Forever));
        assert_eq!(state.priority(), 0);
    }

    #[test]
    fn test_unknown_negative_priority_ignored() {
        let mut state = PlaybackState::new("music/explore");
        assert_eq!(state.apply("music/odd", -7), PlaybackAction::Nothing);
        assert_eq!(state, PlaybackState::new("music/explore"));
    }
}
