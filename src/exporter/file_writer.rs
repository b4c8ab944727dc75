//! Appending file writer with optional size-based rotation.
//!
//! Without a rotation policy the destination simply grows. With one, the
//! current file is rolled once the next write would push it past the size
//! threshold, and old backups are pruned by count and by age.
//!
//! Backups live next to the destination and are named
//! `<stem>-<timestamp>.<ext>`, e.g. `traces-2024-01-02T03-04-05.006.json`.
//! The timestamp is in UTC unless the policy asks for local time. A second
//! roll within the same millisecond gets a sequence suffix,
//! `traces-2024-01-02T03-04-05.006-1.json`, so no backup is ever replaced.

use crate::config::Rotation;
use chrono::{Local, NaiveDateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Size threshold used when the policy leaves `max_megabytes` at zero.
pub const DEFAULT_MAX_MEGABYTES: u32 = 100;

const MEGABYTE: u64 = 1024 * 1024;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Thread-safe appending writer.
///
/// The file is opened lazily on first write so that construction succeeds
/// even before the destination exists. An internal `Mutex` serializes
/// writes and rotation.
///
/// # Example
///
/// ```rust,no_run
/// use otlp_file_sink::config::Rotation;
/// use otlp_file_sink::exporter::FileWriter;
/// use std::path::PathBuf;
///
/// let writer = FileWriter::new(
///     PathBuf::from("/tmp/traces.json"),
///     Some(Rotation { max_megabytes: 10, max_backups: 3, ..Rotation::default() }),
/// );
/// writer.write_all(b"{}\n")?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct FileWriter {
    file_path: PathBuf,
    rotation: Option<Rotation>,
    writer: Mutex<Option<File>>,
}

impl FileWriter {
    /// Creates a writer for `file_path`; `None` disables rotation.
    #[must_use]
    pub const fn new(file_path: PathBuf, rotation: Option<Rotation>) -> Self {
        Self {
            file_path,
            rotation,
            writer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Appends `payload` and flushes it, rolling the file first if needed.
    ///
    /// A payload larger than the threshold is still written whole, into a
    /// fresh file.
    ///
    /// # Errors
    ///
    /// Fails if rotation, opening, writing or flushing fails, or if another
    /// thread panicked while holding the lock.
    pub fn write_all(&self, payload: &[u8]) -> std::io::Result<()> {
        let mut writer = self.lock()?;

        self.check_and_rotate(&mut writer, payload.len())?;

        if writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            *writer = Some(file);
        }

        let file = writer.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "No file available")
        })?;

        file.write_all(payload)?;
        file.flush()?;
        drop(writer);

        Ok(())
    }

    /// Rolls the current file now, regardless of its size.
    ///
    /// Does nothing when the writer has no rotation policy.
    ///
    /// # Errors
    ///
    /// Fails if the rename or the backup directory scan fails.
    pub fn rotate(&self) -> std::io::Result<()> {
        let Some(rotation) = self.rotation else {
            return Ok(());
        };
        let mut writer = self.lock()?;
        *writer = None;
        self.rotate_files(&rotation)
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, Option<File>>> {
        self.writer.lock().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, format!("Mutex poisoned: {e}"))
        })
    }

    fn check_and_rotate(&self, writer: &mut Option<File>, incoming: usize) -> std::io::Result<()> {
        let Some(rotation) = self.rotation else {
            return Ok(());
        };

        let current = fs::metadata(&self.file_path).map_or(0, |m| m.len());
        let incoming = u64::try_from(incoming).unwrap_or(u64::MAX);

        if current > 0 && current.saturating_add(incoming) > threshold_bytes(&rotation) {
            *writer = None;
            self.rotate_files(&rotation)?;
        }
        Ok(())
    }

    fn rotate_files(&self, rotation: &Rotation) -> std::io::Result<()> {
        let now = now(rotation.local_time);

        if self.file_path.exists() {
            let backup_path = self.free_backup_path(now);
            tracing::debug!(
                path = ?self.file_path,
                backup = ?backup_path,
                "rotating output file"
            );
            fs::rename(&self.file_path, &backup_path)?;
        }

        self.cleanup_old_backups(rotation, now)
    }

    /// Backup path for a file rolled at `at`.
    fn backup_path(&self, at: NaiveDateTime) -> PathBuf {
        self.sequenced_backup_path(at, 0)
    }

    /// Backup path for the `sequence`-th roll within the same millisecond.
    fn sequenced_backup_path(&self, at: NaiveDateTime, sequence: u32) -> PathBuf {
        let stem = self
            .file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = at.format(BACKUP_TIME_FORMAT);
        let suffix = match sequence {
            0 => String::new(),
            n => format!("-{n}"),
        };

        let name = match self.file_path.extension() {
            Some(ext) => format!("{stem}-{timestamp}{suffix}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{timestamp}{suffix}"),
        };
        self.directory().join(name)
    }

    /// First backup path for `at` that does not exist yet.
    fn free_backup_path(&self, at: NaiveDateTime) -> PathBuf {
        let mut sequence = 0;
        loop {
            let candidate = self.sequenced_backup_path(at, sequence);
            if !candidate.exists() {
                return candidate;
            }
            sequence += 1;
        }
    }

    /// Roll time and sequence encoded in a backup's name, or `None` if
    /// `path` is not one of this writer's backups.
    fn backup_timestamp(&self, path: &Path) -> Option<(NaiveDateTime, u32)> {
        let name = path.file_name()?.to_str()?;
        let stem = self.file_path.file_stem()?.to_str()?;

        let rest = name.strip_prefix(stem)?.strip_prefix('-')?;
        let stamped = match self.file_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
            None => rest,
        };

        if let Ok(at) = NaiveDateTime::parse_from_str(stamped, BACKUP_TIME_FORMAT) {
            return Some((at, 0));
        }

        let (timestamp, sequence) = stamped.rsplit_once('-')?;
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let at = NaiveDateTime::parse_from_str(timestamp, BACKUP_TIME_FORMAT).ok()?;
        Some((at, sequence.parse().ok()?))
    }

    fn directory(&self) -> PathBuf {
        match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Removes backups beyond `max_backups` (newest kept) and, when
    /// `max_days` is set, backups older than that many days.
    ///
    /// Individual deletion failures are logged and skipped.
    fn cleanup_old_backups(&self, rotation: &Rotation, now: NaiveDateTime) -> std::io::Result<()> {
        let mut backups: Vec<((NaiveDateTime, u32), PathBuf)> = fs::read_dir(self.directory())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter_map(|path| self.backup_timestamp(&path).map(|ts| (ts, path)))
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0));

        let keep = match rotation.max_backups {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };
        let cutoff = (rotation.max_days > 0)
            .then(|| now - chrono::Duration::days(i64::from(rotation.max_days)));

        for (index, ((rolled_at, _), path)) in backups.iter().enumerate() {
            let expired = cutoff.is_some_and(|cutoff| *rolled_at < cutoff);
            if index >= keep || expired {
                if let Err(e) = fs::remove_file(path) {
                    tracing::warn!(path = ?path, error = %e, "failed to remove old backup");
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}

fn threshold_bytes(rotation: &Rotation) -> u64 {
    let megabytes = match rotation.max_megabytes {
        0 => DEFAULT_MAX_MEGABYTES,
        n => n,
    };
    u64::from(megabytes) * MEGABYTE
}

fn now(local_time: bool) -> NaiveDateTime {
    if local_time {
        Local::now().naive_local()
    } else {
        Utc::now().naive_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn backups_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "traces.json")
            .collect();
        names.sort();
        names
    }

    fn rotation(max_backups: u32, max_days: u32) -> Rotation {
        Rotation {
            max_megabytes: 1,
            max_days,
            max_backups,
            local_time: false,
        }
    }

    #[test]
    fn backup_names_embed_the_roll_time() {
        let writer = FileWriter::new(PathBuf::from("/var/log/traces.json"), None);
        let at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 6)
            .unwrap();

        let backup = writer.backup_path(at);
        assert_eq!(
            backup,
            PathBuf::from("/var/log/traces-2024-01-02T03-04-05.006.json")
        );
        assert_eq!(writer.backup_timestamp(&backup), Some((at, 0)));
        assert_eq!(
            writer.backup_timestamp(&writer.sequenced_backup_path(at, 2)),
            Some((at, 2))
        );
        assert_eq!(
            writer.sequenced_backup_path(at, 2),
            PathBuf::from("/var/log/traces-2024-01-02T03-04-05.006-2.json")
        );
        assert_eq!(writer.backup_timestamp(Path::new("/var/log/traces.json")), None);
        assert_eq!(writer.backup_timestamp(Path::new("/var/log/other-2024.json")), None);
    }

    #[test]
    fn relative_path_without_directory_uses_cwd() {
        let writer = FileWriter::new(PathBuf::from("traces"), None);
        let at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_milli_opt(7, 8, 9, 10)
            .unwrap();
        assert_eq!(
            writer.backup_path(at),
            PathBuf::from("./traces-2024-05-06T07-08-09.010")
        );
    }

    #[test]
    fn without_rotation_writes_append_and_never_roll() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        let writer = FileWriter::new(path.clone(), None);

        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.rotate().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert!(backups_in(dir.path()).is_empty());
    }

    #[test]
    fn crossing_the_threshold_rolls_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        let writer = FileWriter::new(path.clone(), Some(rotation(3, 0)));

        let chunk = vec![b'x'; 600 * 1024];
        writer.write_all(&chunk).unwrap();
        writer.write_all(&chunk).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), chunk.len() as u64);
        let backups = backups_in(dir.path());
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("traces-") && backups[0].ends_with(".json"));
    }

    #[test]
    fn rotation_keeps_only_the_newest_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        for name in [
            "traces-2020-01-01T00-00-00.000.json",
            "traces-2020-01-02T00-00-00.000.json",
            "traces-2020-01-03T00-00-00.000.json",
        ] {
            fs::write(dir.path().join(name), b"old").unwrap();
        }

        let writer = FileWriter::new(path, Some(rotation(2, 0)));
        writer.write_all(b"current\n").unwrap();
        writer.rotate().unwrap();

        let backups = backups_in(dir.path());
        assert_eq!(backups.len(), 2);
        assert!(backups.contains(&"traces-2020-01-03T00-00-00.000.json".to_string()));
        assert!(!backups.contains(&"traces-2020-01-01T00-00-00.000.json".to_string()));
    }

    #[test]
    fn rolls_within_one_millisecond_keep_every_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        let writer = FileWriter::new(path, Some(rotation(10, 0)));

        for batch in 0..5 {
            writer.write_all(format!("batch{batch}\n").as_bytes()).unwrap();
            writer.rotate().unwrap();
        }

        let backups = backups_in(dir.path());
        assert_eq!(backups.len(), 5);

        let mut contents: Vec<String> = backups
            .iter()
            .map(|name| fs::read_to_string(dir.path().join(name)).unwrap())
            .collect();
        contents.sort();
        assert_eq!(
            contents,
            vec!["batch0\n", "batch1\n", "batch2\n", "batch3\n", "batch4\n"]
        );
    }

    #[test]
    fn same_millisecond_backups_are_pruned_oldest_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        for name in [
            "traces-2020-01-01T00-00-00.000.json",
            "traces-2020-01-01T00-00-00.000-1.json",
            "traces-2020-01-01T00-00-00.000-2.json",
        ] {
            fs::write(dir.path().join(name), b"old").unwrap();
        }

        let writer = FileWriter::new(path, Some(rotation(2, 0)));
        writer.rotate().unwrap();

        assert_eq!(
            backups_in(dir.path()),
            vec![
                "traces-2020-01-01T00-00-00.000-1.json".to_string(),
                "traces-2020-01-01T00-00-00.000-2.json".to_string(),
            ]
        );
    }

    #[test]
    fn rotation_prunes_backups_older_than_max_days() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");

        let stale = Utc::now().naive_utc() - chrono::Duration::days(10);
        let fresh = Utc::now().naive_utc() - chrono::Duration::days(1);
        let writer = FileWriter::new(path, Some(rotation(100, 3)));
        fs::write(writer.backup_path(stale), b"stale").unwrap();
        fs::write(writer.backup_path(fresh), b"fresh").unwrap();
        fs::write(dir.path().join("unrelated.log"), b"keep").unwrap();

        writer.rotate().unwrap();

        assert!(!writer.backup_path(stale).exists());
        assert!(writer.backup_path(fresh).exists());
        assert!(dir.path().join("unrelated.log").exists());
    }
}
