//! Size-rotated, age-retained log file sink.
//!
//! [`RollingFile`] appends formatted log lines to `<directory>/<file_name>`.
//! When a write would grow the active file past the configured size, the
//! file is renamed to `<stem>.<UTC timestamp>.<ext>`, a fresh one is
//! opened, and rotated siblings older than the retention window are
//! removed.
//!
//! Every I/O failure is swallowed: a broken sink drops lines but never
//! fails the caller. The file is reopened on the next write.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use tracing_subscriber::fmt::MakeWriter;

/// Timestamp inserted between stem and extension of a rotated file.
const ROTATION_STAMP: &str = "%Y-%m-%d_%H-%M-%S_%6f";

/// Thread-safe rolling log file, usable as a `tracing-subscriber` writer.
#[derive(Debug, Clone)]
pub struct RollingFile {
    state: Arc<Mutex<RollingState>>,
}

#[derive(Debug)]
struct RollingState {
    directory: PathBuf,
    file_name: String,
    max_bytes: u64,
    retention: TimeDelta,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    /// Create a sink writing to `directory/file_name`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        max_bytes: u64,
        retention_days: u32,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RollingState {
                directory: directory.into(),
                file_name: file_name.into(),
                max_bytes,
                retention: TimeDelta::days(i64::from(retention_days)),
                file: None,
                written: 0,
            })),
        }
    }

    /// Path of the file currently being appended to.
    pub fn active_path(&self) -> PathBuf {
        self.lock().active_path()
    }

    /// Append one entry, rotating first if it would overflow the file.
    pub fn append(&self, entry: &[u8]) {
        self.lock().append(entry);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RollingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RollingState {
    fn active_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    fn append(&mut self, entry: &[u8]) {
        let len = u64::try_from(entry.len()).unwrap_or(u64::MAX);

        if self.file.is_none() {
            self.open();
        }
        if self.file.is_some()
            && self.written > 0
            && self.written.saturating_add(len) > self.max_bytes
        {
            self.rotate();
            self.open();
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };
        if file.write_all(entry).is_ok() {
            self.written = self.written.saturating_add(len);
        } else {
            self.file = None;
        }
    }

    fn open(&mut self) {
        if fs::create_dir_all(&self.directory).is_err() {
            return;
        }
        let Ok(file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())
        else {
            return;
        };
        self.written = file.metadata().map_or(0, |m| m.len());
        self.file = Some(file);
    }

    fn rotate(&mut self) {
        self.file = None;
        self.written = 0;

        let stamp = Utc::now().format(ROTATION_STAMP);
        let rotated = self.directory.join(self.rotated_name(&stamp.to_string()));
        let _ = fs::rename(self.active_path(), rotated);

        self.prune();
    }

    fn rotated_name(&self, stamp: &str) -> String {
        match split_name(&self.file_name) {
            (stem, Some(ext)) => format!("{stem}.{stamp}.{ext}"),
            (stem, None) => format!("{stem}.{stamp}"),
        }
    }

    /// Only `<stem>.<rotation stamp>[.<ext>]` counts; other siblings are
    /// never pruned.
    fn is_rotated(&self, name: &str) -> bool {
        let (stem, ext) = split_name(&self.file_name);
        let Some(rest) = name.strip_prefix(stem).and_then(|r| r.strip_prefix('.')) else {
            return false;
        };
        let stamp = match ext {
            Some(ext) => rest.strip_suffix(ext).and_then(|r| r.strip_suffix('.')),
            None => Some(rest),
        };
        stamp.is_some_and(|stamp| NaiveDateTime::parse_from_str(stamp, ROTATION_STAMP).is_ok())
    }

    /// Delete rotated files whose last write is older than the retention window.
    fn prune(&self) {
        let Ok(entries) = fs::read_dir(&self.directory) else {
            return;
        };
        let now = Utc::now();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !self.is_rotated(&name.to_string_lossy()) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let modified: DateTime<Utc> = modified.into();
            if now.signed_duration_since(modified) > self.retention {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// Split `backend.log` into (`backend`, `Some("log")`).
fn split_name(file_name: &str) -> (&str, Option<&str>) {
    let path = Path::new(file_name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) {
        (Some(stem), ext) => (stem, ext),
        (None, _) => (file_name, None),
    }
}

/// Per-event writer handed out by [`RollingFile`].
#[derive(Debug)]
pub struct RollingWriter {
    sink: RollingFile,
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RollingFile {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter { sink: self.clone() }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("textbook-rolling-{}", uuid::Uuid::new_v4()))
    }

    fn rotated_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n != "backend.log")
            .collect();
        names.sort();
        names
    }

    #[test]
    fn appends_to_active_file() {
        let dir = scratch_dir();
        let sink = RollingFile::new(&dir, "backend.log", 1024, 7);

        sink.append(b"first\n");
        sink.append(b"second\n");

        let contents = fs::read_to_string(dir.join("backend.log")).unwrap();
        assert_eq!(contents, "first\nsecond\n");
        assert!(rotated_files(&dir).is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rotates_when_size_exceeded() {
        let dir = scratch_dir();
        let sink = RollingFile::new(&dir, "backend.log", 10, 7);

        sink.append(b"12345678\n");
        sink.append(b"abcdefgh\n");

        let active = fs::read_to_string(dir.join("backend.log")).unwrap();
        assert_eq!(active, "abcdefgh\n");

        let rotated = rotated_files(&dir);
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].starts_with("backend."));
        assert!(rotated[0].ends_with(".log"));
        let old = fs::read_to_string(dir.join(&rotated[0])).unwrap();
        assert_eq!(old, "12345678\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn oversized_entry_goes_to_empty_file() {
        let dir = scratch_dir();
        let sink = RollingFile::new(&dir, "backend.log", 4, 7);

        sink.append(b"much longer than four bytes\n");

        let active = fs::read_to_string(dir.join("backend.log")).unwrap();
        assert_eq!(active, "much longer than four bytes\n");
        assert!(rotated_files(&dir).is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn resumes_size_of_existing_file() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("backend.log"), b"123456789\n").unwrap();

        let sink = RollingFile::new(&dir, "backend.log", 12, 7);
        sink.append(b"xyz\n");

        assert_eq!(rotated_files(&dir).len(), 1);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rotation_prunes_expired_files_only() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();

        let expired = dir.join("backend.2020-01-01_00-00-00_000000.log");
        let recent = dir.join("backend.2020-01-02_00-00-00_000000.log");
        let unrelated = dir.join("other.log");
        let operator_copy = dir.join("backend.old.log");
        for path in [&expired, &recent, &unrelated, &operator_copy] {
            fs::write(path, b"old\n").unwrap();
        }
        let eight_days_ago = SystemTime::now() - Duration::from_secs(8 * 24 * 3600);
        let one_day_ago = SystemTime::now() - Duration::from_secs(24 * 3600);
        for (path, modified) in [
            (&expired, eight_days_ago),
            (&recent, one_day_ago),
            (&unrelated, eight_days_ago),
            (&operator_copy, eight_days_ago),
        ] {
            File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(modified)
                .unwrap();
        }

        let sink = RollingFile::new(&dir, "backend.log", 8, 7);
        sink.append(b"1234567\n");
        sink.append(b"rotate!\n");

        assert!(!expired.exists());
        assert!(recent.exists());
        assert!(unrelated.exists());
        assert!(operator_copy.exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unwritable_directory_is_silent() {
        let blocker = scratch_dir();
        fs::write(&blocker, b"not a directory").unwrap();

        let sink = RollingFile::new(blocker.join("logs"), "backend.log", 1024, 7);
        sink.append(b"dropped\n");
        let mut writer = sink.make_writer();
        assert_eq!(writer.write(b"dropped\n").unwrap(), 8);

        fs::remove_file(blocker).unwrap();
    }

    #[test]
    fn rotated_name_matching() {
        let sink = RollingFile::new("logs", "backend.log", 1024, 7);
        let state = sink.lock();
        assert!(state.is_rotated("backend.2026-10-19_10-00-00_000001.log"));
        assert!(!state.is_rotated("backend.log"));
        assert!(!state.is_rotated("backendx.log"));
        assert!(!state.is_rotated("backend.2026-10-19.txt"));
        assert!(!state.is_rotated("backend.old.log"));
        assert!(!state.is_rotated("backend.2026-10-19_10-00-00_000001.log.bak"));
        assert!(!state.is_rotated("backend.2026-13-40_10-00-00_000001.log"));
    }

    #[test]
    fn rotated_name_round_trips_through_matcher() {
        let sink = RollingFile::new("logs", "backend.log", 1024, 7);
        let state = sink.lock();
        let stamp = Utc::now().format(ROTATION_STAMP).to_string();
        assert!(state.is_rotated(&state.rotated_name(&stamp)));

        let bare = RollingFile::new("logs", "backend", 1024, 7);
        let state = bare.lock();
        assert!(state.is_rotated(&state.rotated_name(&stamp)));
        assert!(!state.is_rotated("backend"));
    }
}
