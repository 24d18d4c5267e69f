//! # Season Store
//!
//! Persists the current season together with the gamelog read position so
//! that a restart resumes both the mood and the tailing where they stopped.
//!
//! The file holds a single line, `<season>|<offset>`:
//!
//! ```text
//! music/autumn|1048576
//! ```
//!
//! Saving writes a temporary file next to the target and renames it into
//! place, so a crash never leaves a half-written record behind.

use anyhow::{bail, Context, Result};
use log::info;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

const SEPARATOR: char = '|';

/// Season and gamelog offset as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub season: String,
    pub offset: u64,
}

impl PersistedSession {
    pub fn new(season: impl Into<String>, offset: u64) -> Self {
        Self {
            season: season.into(),
            offset,
        }
    }
}

impl fmt::Display for PersistedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.season, self.offset)
    }
}

impl FromStr for PersistedSession {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let line = s.lines().next().unwrap_or_default();
        let (season, offset) = line
            .rsplit_once(SEPARATOR)
            .with_context(|| format!("expected `season{SEPARATOR}offset`, found {line:?}"))?;
        let offset = offset
            .trim()
            .parse()
            .with_context(|| format!("offset {offset:?} is not a byte count"))?;
        Ok(Self::new(season, offset))
    }
}

/// Reads and writes one session file.
#[derive(Debug, Clone)]
pub struct SeasonStore {
    path: PathBuf,
}

impl SeasonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the session file, failing if it is missing or corrupt.
    pub fn load(&self) -> Result<PersistedSession> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let session = text
            .parse()
            .with_context(|| format!("Corrupt session file {}", self.path.display()))?;
        Ok(session)
    }

    /// Reads the session file, first writing `defaults` to it if it does not exist.
    pub fn load_or_create(&self, defaults: &PersistedSession) -> Result<PersistedSession> {
        match fs::metadata(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No session at {}, creating one", self.path.display());
                self.save(defaults)?;
            }
            _ => {}
        }

        let session = self.load()?;
        info!("Loaded {}", session.season);
        Ok(session)
    }

    /// Replaces the session file atomically.
    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        if session.season.contains([SEPARATOR, '\n', '\r']) {
            bail!("Season {:?} cannot be saved: it contains a separator", session.season);
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        write!(tmp, "{session}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;

        info!("Saved {} to {}.", session.season, self.path.display());
        Ok(())
    }
}
