//! Rotating File Audit Log
//!
//! Appends one line per completed probe to the active log file. Once the file
//! grows past the size limit it is retired into `<path>.<n>.gz` and a fresh
//! active file is opened at the original path.
//!
//! ## Rotation
//! 1. Pick the next archive index `n` (strictly increasing, gap-free from 1)
//! 2. Rename the active file to `<path>.<n>`
//! 3. Reopen a fresh active file (on failure, rename back and keep the old handle)
//! 4. Stream-compress `<path>.<n>` into `<path>.<n>.gz`
//! 5. Delete `<path>.<n>` once the archive is complete
//!
//! A segment whose compression failed keeps its index and is retried at the
//! next rotation, as is any segment left behind by a previous process.
//!
//! Append and rotation run under one lock, so no write can land in a file
//! that is being renamed.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::domain::entities::AuditRecord;
use crate::domain::repository::AuditLog;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("Failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to write log record: {0}")]
    Write(#[source] io::Error),

    #[error("Log rotation failed while {stage}: {source}")]
    Rotate {
        stage: RotationStage,
        source: io::Error,
    },

    #[error("Log writer task failed: {0}")]
    Task(String),
}

/// Step of the rotation sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    Rename,
    Reopen,
    Compress,
    RemoveSegment,
}

impl std::fmt::Display for RotationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RotationStage::Rename => "renaming the active file",
            RotationStage::Reopen => "reopening the active file",
            RotationStage::Compress => "compressing the rotated segment",
            RotationStage::RemoveSegment => "removing the uncompressed segment",
        };
        f.write_str(s)
    }
}

fn rotate_err(stage: RotationStage) -> impl FnOnce(io::Error) -> AuditLogError {
    move |source| AuditLogError::Rotate { stage, source }
}

/// `<path>.<n>`
pub fn segment_path(path: &Path, index: u32) -> PathBuf {
    with_suffix(path, &format!(".{}", index))
}

/// `<path>.<n>.gz`
pub fn archive_path(path: &Path, index: u32) -> PathBuf {
    with_suffix(path, &format!(".{}.gz", index))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// First index at or after `from` with neither a segment nor an archive on disk
fn next_free_index(path: &Path, from: u32) -> u32 {
    let mut index = from.max(1);
    while archive_path(path, index).exists() || segment_path(path, index).exists() {
        index += 1;
    }
    index
}

/// Stream `src` into a new gzip file at `dst`; a partial `dst` is removed on failure
fn compress(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let output = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    let result = io::copy(&mut input, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());

    if result.is_err() {
        let _ = fs::remove_file(dst);
    }
    result
}

struct ActiveLog {
    file: File,
    /// Lower bound for the next archive index
    next_index: u32,
    /// Renamed segments still waiting for their archive
    pending: Vec<u32>,
}

struct Inner {
    path: PathBuf,
    max_size_bytes: u64,
    active: Mutex<ActiveLog>,
}

/// Size-rotated, gzip-archived audit log
#[derive(Clone)]
pub struct RotatingFileLog {
    inner: Arc<Inner>,
}

impl RotatingFileLog {
    /// Open (or create) the active log file in append mode
    pub fn open(path: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self, AuditLogError> {
        let path = path.into();
        let file = open_append(&path).map_err(|source| AuditLogError::Open {
            path: path.clone(),
            source,
        })?;
        let next_index = next_free_index(&path, 1);
        let pending: Vec<u32> = (1..next_index)
            .filter(|&index| segment_path(&path, index).exists())
            .collect();

        tracing::info!(
            path = %path.display(),
            max_size_bytes,
            next_archive = next_index,
            leftover_segments = pending.len(),
            "Audit log opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                max_size_bytes,
                active: Mutex::new(ActiveLog {
                    file,
                    next_index,
                    pending,
                }),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Append one record, rotating if the file grew past the limit
    ///
    /// Returns the archive written by this call, if any.
    pub fn append(&self, record: &AuditRecord) -> Result<Option<PathBuf>, AuditLogError> {
        self.inner.append(record.to_line().as_bytes())
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ActiveLog> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, line: &[u8]) -> Result<Option<PathBuf>, AuditLogError> {
        let mut active = self.lock();
        active.file.write_all(line).map_err(AuditLogError::Write)?;

        let size = active.file.metadata().map_err(AuditLogError::Write)?.len();
        if size <= self.max_size_bytes {
            return Ok(None);
        }
        self.rotate(&mut active).map(Some)
    }

    fn rotate(&self, active: &mut ActiveLog) -> Result<PathBuf, AuditLogError> {
        self.retry_pending(active);

        let index = next_free_index(&self.path, active.next_index);
        let segment = segment_path(&self.path, index);

        if let Err(e) = fs::rename(&self.path, &segment) {
            // Active file was removed under us; start a new one
            if e.kind() == io::ErrorKind::NotFound {
                if let Ok(file) = open_append(&self.path) {
                    active.file = file;
                }
            }
            return Err(rotate_err(RotationStage::Rename)(e));
        }

        match open_append(&self.path) {
            Ok(file) => active.file = file,
            Err(e) => {
                // Keep appending to the old handle at its original name
                if let Err(undo) = fs::rename(&segment, &self.path) {
                    tracing::error!(
                        error = %undo,
                        segment = %segment.display(),
                        "Could not restore active log after failed reopen"
                    );
                }
                return Err(rotate_err(RotationStage::Reopen)(e));
            }
        }
        active.next_index = index + 1;

        match self.archive_segment(index) {
            Ok(archive) => {
                tracing::info!(archive = %archive.display(), "Audit log rotated");
                Ok(archive)
            }
            Err(e) => {
                // The plaintext segment keeps its index until a retry succeeds
                active.pending.push(index);
                Err(e)
            }
        }
    }

    /// Compress `<path>.<n>` into `<path>.<n>.gz`, then drop the plaintext
    fn archive_segment(&self, index: u32) -> Result<PathBuf, AuditLogError> {
        let segment = segment_path(&self.path, index);
        let archive = archive_path(&self.path, index);

        // A complete archive may exist if only the removal failed last time
        if !archive.exists() {
            compress(&segment, &archive).map_err(rotate_err(RotationStage::Compress))?;
        }
        fs::remove_file(&segment).map_err(rotate_err(RotationStage::RemoveSegment))?;
        Ok(archive)
    }

    fn retry_pending(&self, active: &mut ActiveLog) {
        let mut still_pending = Vec::new();
        for index in active.pending.drain(..) {
            match self.archive_segment(index) {
                Ok(archive) => {
                    tracing::info!(archive = %archive.display(), "Leftover audit segment archived");
                }
                Err(e) => {
                    tracing::warn!(error = %e, index, "Leftover audit segment still not archived");
                    still_pending.push(index);
                }
            }
        }
        active.pending = still_pending;
    }
}

impl std::fmt::Debug for RotatingFileLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileLog")
            .field("path", &self.inner.path)
            .field("max_size_bytes", &self.inner.max_size_bytes)
            .finish()
    }
}

impl AuditLog for RotatingFileLog {
    async fn record(&self, record: AuditRecord) {
        let log = self.clone();
        let result = tokio::task::spawn_blocking(move || log.append(&record))
            .await
            .unwrap_or_else(|e| Err(AuditLogError::Task(e.to_string())));

        if let Err(e) = result {
            tracing::error!(error = %e, path = %self.path().display(), "Audit log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ClientId, Port};
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn record(port: u16, reachable: bool) -> AuditRecord {
        AuditRecord::new(
            ClientId::new("203.0.113.5".parse().unwrap()),
            Port::new(port).unwrap(),
            reachable,
        )
    }

    fn read_archive(path: &Path) -> String {
        let mut out = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_line_format() {
        let line = record(443, true).to_line();
        assert!(line.starts_with('['));
        assert!(line.contains(" UTC] IP: 203.0.113.5, PORT: 443, SUCCESS: true"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_append_below_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let log = RotatingFileLog::open(&path, 1024 * 1024).unwrap();

        assert_eq!(log.append(&record(80, true)).unwrap(), None);
        assert_eq!(log.append(&record(81, false)).unwrap(), None);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("PORT: 80, SUCCESS: true"));
        assert!(lines[1].ends_with("PORT: 81, SUCCESS: false"));
    }

    #[test]
    fn test_reopen_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        fs::write(&path, "previous line\n").unwrap();

        let log = RotatingFileLog::open(&path, 1024 * 1024).unwrap();
        log.append(&record(22, false)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous line\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_rotation_preserves_every_record_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let line_len = record(1000, true).to_line().len() as u64;
        // Rotate on the fourth line
        let log = RotatingFileLog::open(&path, line_len * 3 + 1).unwrap();

        let mut rotated = Vec::new();
        for port in 1000..1006 {
            if let Some(archive) = log.append(&record(port, port % 2 == 0)).unwrap() {
                rotated.push(archive);
            }
        }

        assert_eq!(rotated, vec![archive_path(&path, 1)]);
        assert!(!segment_path(&path, 1).exists());

        let archived = read_archive(&rotated[0]);
        let archived_ports: Vec<_> = archived
            .lines()
            .map(|l| l.split("PORT: ").nth(1).unwrap().split(',').next().unwrap().to_string())
            .collect();
        assert_eq!(archived_ports, vec!["1000", "1001", "1002", "1003"]);

        let active = fs::read_to_string(&path).unwrap();
        assert_eq!(active.lines().count(), 2);
        assert!(active.contains("PORT: 1004,"));
        assert!(active.contains("PORT: 1005,"));
    }

    #[test]
    fn test_active_file_fresh_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let log = RotatingFileLog::open(&path, 1).unwrap();

        let archive = log.append(&record(8080, true)).unwrap();
        assert_eq!(archive, Some(archive_path(&path, 1)));
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_index_follows_existing_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        fs::write(archive_path(&path, 1), b"").unwrap();
        fs::write(archive_path(&path, 2), b"").unwrap();

        let log = RotatingFileLog::open(&path, 1).unwrap();
        assert_eq!(log.append(&record(1, true)).unwrap(), Some(archive_path(&path, 3)));
        assert_eq!(log.append(&record(2, true)).unwrap(), Some(archive_path(&path, 4)));

        // Archives written by someone else are skipped, never overwritten
        fs::write(archive_path(&path, 5), b"foreign").unwrap();
        assert_eq!(log.append(&record(3, true)).unwrap(), Some(archive_path(&path, 6)));
        assert_eq!(fs::read(archive_path(&path, 5)).unwrap(), b"foreign");
    }

    #[test]
    fn test_failed_rotation_keeps_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let log = RotatingFileLog::open(&path, 1).unwrap();

        // Active file deleted behind our back: the rename step fails
        fs::remove_file(&path).unwrap();
        let err = log.append(&record(443, true)).unwrap_err();
        assert!(matches!(
            err,
            AuditLogError::Rotate {
                stage: RotationStage::Rename,
                ..
            }
        ));
        assert!(!archive_path(&path, 1).exists());

        // A fresh active file took its place and keeps receiving records
        let archive = log.append(&record(8443, false)).unwrap();
        assert_eq!(archive, Some(archive_path(&path, 1)));
        assert!(read_archive(&archive_path(&path, 1)).contains("PORT: 8443,"));
    }

    #[test]
    fn test_leftover_segment_archived_at_next_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        // Segment 1 never made it into an archive
        fs::write(segment_path(&path, 1), record(21, true).to_line()).unwrap();

        let log = RotatingFileLog::open(&path, 1).unwrap();
        assert_eq!(log.append(&record(22, false)).unwrap(), Some(archive_path(&path, 2)));

        assert!(!segment_path(&path, 1).exists());
        assert!(read_archive(&archive_path(&path, 1)).contains("PORT: 21,"));
        assert!(read_archive(&archive_path(&path, 2)).contains("PORT: 22,"));
    }

    #[test]
    fn test_segment_with_complete_archive_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        fs::write(segment_path(&path, 1), b"stale").unwrap();
        compress(&segment_path(&path, 1), &archive_path(&path, 1)).unwrap();

        let log = RotatingFileLog::open(&path, 1).unwrap();
        assert_eq!(log.append(&record(23, true)).unwrap(), Some(archive_path(&path, 2)));

        assert!(!segment_path(&path, 1).exists());
        assert_eq!(read_archive(&archive_path(&path, 1)), "stale");
    }

    #[test]
    fn test_concurrent_appends_never_interleave() {
        const THREADS: u16 = 8;
        const PER_THREAD: u16 = 50;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let line_len = record(10000, false).to_line().len() as u64;
        let log = RotatingFileLog::open(&path, line_len * 7).unwrap();

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let log = log.clone();
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        log.append(&record(10000 + t * 100 + i, i % 2 == 0)).unwrap();
                    }
                });
            }
        });

        let mut indexes: Vec<u32> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| {
                let name = entry.unwrap().file_name().into_string().unwrap();
                name.strip_prefix("portcheck.log.")?
                    .strip_suffix(".gz")?
                    .parse()
                    .ok()
            })
            .collect();
        indexes.sort_unstable();
        assert!(!indexes.is_empty());
        assert_eq!(indexes, (1..=indexes.len() as u32).collect::<Vec<_>>());
        assert!(indexes.iter().all(|&i| !segment_path(&path, i).exists()));

        // Archives in index order, then the active file
        let mut content: String = indexes
            .iter()
            .map(|&i| read_archive(&archive_path(&path, i)))
            .collect();
        content.push_str(&fs::read_to_string(&path).unwrap());

        let mut seen = vec![Vec::new(); THREADS as usize];
        for line in content.lines() {
            assert!(line.starts_with('['), "malformed line {:?}", line);
            let rest = line.split(" UTC] IP: 203.0.113.5, PORT: ").nth(1).unwrap();
            let (port, success) = rest.split_once(", SUCCESS: ").unwrap();
            assert!(success == "true" || success == "false", "malformed line {:?}", line);

            let port: u16 = port.parse().unwrap();
            seen[((port - 10000) / 100) as usize].push((port - 10000) % 100);
        }

        // Every record present, each thread's records in the order written
        for per_thread in seen {
            assert_eq!(per_thread, (0..PER_THREAD).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_compress_missing_source_fails_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("absent.log.1");
        let dst = dir.path().join("absent.log.1.gz");

        assert!(compress(&src, &dst).is_err());
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_record_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portcheck.log");
        let log = RotatingFileLog::open(&path, 1024).unwrap();

        log.record(record(443, true)).await;
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);

        // Removing the directory under the log must not panic the caller
        drop(dir);
        log.record(record(444, false)).await;
    }

    #[test]
    fn test_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("portcheck.log");
        assert!(matches!(
            RotatingFileLog::open(&path, 1024),
            Err(AuditLogError::Open { .. })
        ));
    }
}
