//! # Log Tailer Module
//!
//! Incrementally reads a gamelog that another process keeps appending to.
//!
//! ## Watermark
//!
//! The tailer tracks two byte positions:
//!
//! - `file_size`: the size observed by the last fetch, used as the growth signal
//! - `read_offset`: the position up to which complete lines have been delivered
//!
//! `read_offset <= file_size` always holds. A trailing line without its newline
//! stays between the two and is delivered once it is terminated, so a write
//! that straddles two polls is never split or duplicated.
//!
//! A file that became smaller than the recorded size has been rotated or
//! truncated; tailing restarts from byte 0.
//!
//! ## Change detection
//!
//! How the tailer waits for new data is delegated to a [`LogSource`]. The
//! bundled [`PollingLogSource`] compares file sizes on a short interval, which
//! works the same on every platform.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Capability the tailer needs from its environment.
pub trait LogSource {
    /// Current size of the file in bytes.
    fn size(&self, path: &Path) -> io::Result<u64>;

    /// Blocks for at most `timeout` until the size of `path` differs from
    /// `known_size`. Returns `true` if a change was seen.
    fn wait_for_growth(&self, path: &Path, known_size: u64, timeout: Duration) -> bool;
}

/// [`LogSource`] that polls file metadata.
#[derive(Debug, Clone)]
pub struct PollingLogSource {
    step: Duration,
}

impl PollingLogSource {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl Default for PollingLogSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl LogSource for PollingLogSource {
    fn size(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn wait_for_growth(&self, path: &Path, known_size: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(size) = self.size(path) {
                if size != known_size {
                    return true;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.step.min(deadline - now));
        }
    }
}

/// Byte bookkeeping for a tailed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark {
    pub file_size: u64,
    pub read_offset: u64,
}

/// Follows one appended log file.
#[derive(Debug)]
pub struct LogTailer<S: LogSource = PollingLogSource> {
    path: PathBuf,
    source: S,
    watermark: Watermark,
}

impl LogTailer<PollingLogSource> {
    /// Opens `path` with the polling source, starting `cushion` bytes before its end.
    pub fn open(path: impl Into<PathBuf>, cushion: u64) -> Result<Self> {
        Self::with_source(path, cushion, PollingLogSource::default())
    }
}

impl<S: LogSource> LogTailer<S> {
    /// Starts tailing `path` with the first fetch beginning `cushion` bytes before
    /// the current end of file.
    pub fn with_source(path: impl Into<PathBuf>, cushion: u64, source: S) -> Result<Self> {
        let path = path.into();
        let size = source
            .size(&path)
            .with_context(|| format!("Cannot read gamelog {}", path.display()))?;

        let watermark = Watermark {
            file_size: size,
            read_offset: size.saturating_sub(cushion),
        };
        debug!("Tailing {} from byte {} of {size}", path.display(), watermark.read_offset);

        Ok(Self { path, source, watermark })
    }

    /// Moves the read position to a previously saved offset.
    ///
    /// An offset past the end of the file means the log was replaced since it
    /// was saved, so reading restarts at the beginning.
    pub fn resume_from(&mut self, offset: u64) {
        if offset > self.watermark.file_size {
            warn!(
                "Saved position {offset} is past the end of {} ({} bytes), reading from the start",
                self.path.display(),
                self.watermark.file_size
            );
            self.watermark.read_offset = 0;
        } else {
            self.watermark.read_offset = offset;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Current on-disk size, straight from the source.
    pub fn size(&self) -> io::Result<u64> {
        self.source.size(&self.path)
    }

    /// True if the file is larger than it was at the last fetch.
    pub fn has_grown(&self) -> bool {
        matches!(self.size(), Ok(size) if size > self.watermark.file_size)
    }

    /// True if the file is smaller than it was at the last fetch.
    pub fn is_truncated(&self) -> bool {
        matches!(self.size(), Ok(size) if size < self.watermark.file_size)
    }

    /// Waits up to `timeout` for the file size to change.
    pub fn wait_for_growth(&self, timeout: Duration) -> bool {
        self.source
            .wait_for_growth(&self.path, self.watermark.file_size, timeout)
    }

    /// Returns every complete line written since the last fetch, in file order.
    ///
    /// Lines are decoded lossily and returned without their terminators.
    pub fn fetch_new_lines(&mut self) -> Result<Vec<String>> {
        let size = self
            .size()
            .with_context(|| format!("Cannot read gamelog {}", self.path.display()))?;
        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open gamelog {}", self.path.display()))?;

        if size < self.watermark.file_size || size < self.watermark.read_offset {
            warn!(
                "{} shrank from {} to {size} bytes, restarting from the beginning",
                self.path.display(),
                self.watermark.file_size
            );
            self.watermark.read_offset = 0;
        }

        let start = self.watermark.read_offset;
        file.seek(SeekFrom::Start(start))?;

        let mut buf = Vec::with_capacity((size - start) as usize);
        file.take(size - start)
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read gamelog {}", self.path.display()))?;

        // Bytes after the last newline belong to a line that is still being written.
        let complete = buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let lines: Vec<String> = String::from_utf8_lossy(&buf[..complete])
            .lines()
            .map(str::to_owned)
            .collect();

        self.watermark.read_offset = start + complete as u64;
        self.watermark.file_size = start + buf.len() as u64;
        debug!(
            "Fetched {} lines, offset {} size {}",
            lines.len(),
            self.watermark.read_offset,
            self.watermark.file_size
        );

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_log(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("gamelog.txt");
        fs::write(&path, content).expect("Failed to write gamelog");
        (temp_dir, path)
    }

    fn append(path: &Path, content: &[u8]) {
        let mut file = fs::OpenOptions::new().append(true).open(path).expect("Failed to open gamelog");
        file.write_all(content).expect("Failed to append");
    }

    #[test]
    fn test_starts_at_end_without_cushion() {
        let (_dir, path) = create_test_log("old line\n");
        let mut tailer = LogTailer::open(&path, 0).unwrap();
        assert!(!tailer.has_grown());
        assert!(tailer.fetch_new_lines().unwrap().is_empty());
    }

    #[test]
    fn test_cushion_exposes_backlog() {
        let (_dir, path) = create_test_log("first\nsecond\nthird\n");
        let mut tailer = LogTailer::open(&path, 13).unwrap();
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["second", "third"]);

        let mut whole = LogTailer::open(&path, u64::MAX).unwrap();
        assert_eq!(whole.watermark().read_offset, 0);
        assert_eq!(whole.fetch_new_lines().unwrap().len(), 3);
    }

    #[test]
    fn test_sequential_appends_no_duplicates() {
        let (_dir, path) = create_test_log("");
        let mut tailer = LogTailer::open(&path, 0).unwrap();

        append(&path, b"Spring has arrived!\n");
        assert!(tailer.has_grown());
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["Spring has arrived!"]);
        assert!(!tailer.has_grown());

        append(&path, b"A megabeast approaches!\nThe megabeast has been slain.\n");
        assert_eq!(
            tailer.fetch_new_lines().unwrap(),
            vec!["A megabeast approaches!", "The megabeast has been slain."]
        );

        let watermark = tailer.watermark();
        assert_eq!(watermark.read_offset, watermark.file_size);
        assert_eq!(watermark.file_size, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_partial_line_held_until_terminated() {
        let (_dir, path) = create_test_log("");
        let mut tailer = LogTailer::open(&path, 0).unwrap();

        append(&path, b"complete\nA megab");
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["complete"]);
        let watermark = tailer.watermark();
        assert_eq!(watermark.read_offset, 9);
        assert_eq!(watermark.file_size, 16);

        // Growth that does not finish the line yields nothing.
        append(&path, b"east");
        assert!(tailer.has_grown());
        assert!(tailer.fetch_new_lines().unwrap().is_empty());

        append(&path, b" approaches!\n");
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["A megabeast approaches!"]);
        assert!(tailer.fetch_new_lines().unwrap().is_empty());
    }

    #[test]
    fn test_truncation_resets_to_start() {
        let (_dir, path) = create_test_log("one\ntwo\nthree\n");
        let mut tailer = LogTailer::open(&path, 0).unwrap();

        fs::write(&path, "new\n").unwrap();
        assert!(tailer.is_truncated());
        assert!(!tailer.has_grown());
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["new"]);
        assert_eq!(tailer.watermark().read_offset, 4);
    }

    #[test]
    fn test_resume_from_saved_offset() {
        let (_dir, path) = create_test_log("before\nafter\n");
        let mut tailer = LogTailer::open(&path, 0).unwrap();
        tailer.resume_from(7);
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_resume_past_end_reads_from_start() {
        let (_dir, path) = create_test_log("fresh log\n");
        let mut tailer = LogTailer::open(&path, 0).unwrap();
        tailer.resume_from(10_000);
        assert_eq!(tailer.watermark().read_offset, 0);
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["fresh log"]);
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let (_dir, path) = create_test_log("");
        let mut tailer = LogTailer::open(&path, 0).unwrap();
        append(&path, b"windows line\r\n\xff\xfebroken\n");
        let lines = tailer.fetch_new_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "windows line");
        assert!(lines[1].ends_with("broken"));
    }

    #[test]
    fn test_missing_log_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(LogTailer::open(temp_dir.path().join("gamelog.txt"), 0).is_err());
    }

    #[test]
    fn test_wait_for_growth_times_out() {
        let (_dir, path) = create_test_log("quiet\n");
        let tailer = LogTailer::open(&path, 0).unwrap();
        let start = Instant::now();
        assert!(!tailer.wait_for_growth(Duration::from_millis(60)));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    /// Reports whatever size the test sets, regardless of the file.
    struct FixedSizeSource {
        size: Cell<u64>,
    }

    impl LogSource for FixedSizeSource {
        fn size(&self, _path: &Path) -> io::Result<u64> {
            Ok(self.size.get())
        }

        fn wait_for_growth(&self, _path: &Path, known_size: u64, _timeout: Duration) -> bool {
            self.size.get() != known_size
        }
    }

    #[test]
    fn test_fetch_reads_only_up_to_source_size() {
        let (_dir, path) = create_test_log("");
        let source = FixedSizeSource { size: Cell::new(0) };
        let mut tailer = LogTailer::with_source(&path, 0, source).unwrap();

        append(&path, b"first\nsecond\n");
        tailer.source.size.set(6);
        assert!(tailer.has_grown());
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["first"]);
        assert_eq!(tailer.watermark(), Watermark { file_size: 6, read_offset: 6 });

        tailer.source.size.set(13);
        assert_eq!(tailer.fetch_new_lines().unwrap(), vec!["second"]);
        assert_eq!(tailer.watermark().read_offset, 13);
    }

    #[test]
    fn test_wait_for_growth_sees_append() {
        let (_dir, path) = create_test_log("");
        let tailer = LogTailer::open(&path, 0).unwrap();
        append(&path, b"noise\n");
        assert!(tailer.wait_for_growth(Duration::from_millis(500)));
    }
}
