use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::WriteError;
use crate::sink::Sink;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Size, count and age limits for a [`RotatingFileWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Rotate before a write would push the file past this size. `0`
    /// disables rotation.
    pub max_size_bytes: u64,
    /// Number of numbered backups to keep. `0` keeps all of them.
    pub max_backups: usize,
    /// Delete backups older than this many days at rotation time. `0`
    /// disables age pruning.
    pub max_age_days: u32,
    /// Gzip each backup right after it is rotated out.
    pub compress: bool,
    pub on_failure: RotationFallback,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024,
            max_backups: 5,
            max_age_days: 0,
            compress: false,
            on_failure: RotationFallback::Append,
        }
    }
}

impl RotationPolicy {
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    pub fn with_max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_fallback(mut self, fallback: RotationFallback) -> Self {
        self.on_failure = fallback;
        self
    }
}

/// What a write does when the rotation in front of it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationFallback {
    /// Keep appending to the current, oversized file.
    #[default]
    Append,
    /// Hold records in memory and retry the rotation on the next write.
    /// Once the held bytes would exceed `max_bytes` they are appended to the
    /// current file instead.
    Buffer { max_bytes: usize },
}

struct ActiveFile {
    file: File,
    size: u64,
}

impl ActiveFile {
    fn open(path: &Path) -> io::Result<Self> {
        fs::create_dir_all(parent_dir(path))?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(())
    }
}

/// `Open -> Rotating -> Open`. `Rotating` outlives a rotation only when the
/// fresh file could not be opened; the next write retries the open.
enum FileState {
    Open(ActiveFile),
    Rotating,
    Closed,
}

struct Inner {
    state: FileState,
    pending: Vec<u8>,
    rotations: u64,
    rotation_error: Option<WriteError>,
    // emitted by `write` after the lock is released
    notices: Vec<Notice>,
}

/// Something worth logging that happened while the lock was held.
enum Notice {
    Rotated { backup: PathBuf },
    Compressed { backup: PathBuf },
    CompressFailed { backup: PathBuf, error: io::Error },
    Removed { backup: PathBuf, expired: bool },
    PruneFailed { error: io::Error },
    RotationFailed { error: String },
}

impl Notice {
    fn emit(&self, path: &Path, fallback: RotationFallback) {
        match self {
            Notice::Rotated { backup } => {
                debug!(path = %path.display(), backup = %backup.display(), "rotated log file")
            }
            Notice::Compressed { backup } => {
                debug!(backup = %backup.display(), "compressed log backup")
            }
            Notice::CompressFailed { backup, error } => {
                warn!(backup = %backup.display(), error = %error, "failed to compress log backup")
            }
            Notice::Removed { backup, expired: true } => {
                debug!(backup = %backup.display(), "removed expired log backup")
            }
            Notice::Removed { backup, expired: false } => {
                debug!(backup = %backup.display(), "removed log backup beyond retention")
            }
            Notice::PruneFailed { error } => {
                warn!(path = %path.display(), error = %error, "failed to prune expired log backups")
            }
            Notice::RotationFailed { error } => warn!(
                path = %path.display(),
                error = %error,
                fallback = ?fallback,
                "log rotation failed"
            ),
        }
    }
}

/// Appends records to a file and rotates it into numbered backups
/// (`app.log.1` is the newest) once it would exceed
/// [`RotationPolicy::max_size_bytes`].
///
/// One mutex covers the whole check, rotate and append sequence, so a record
/// is never split across the old and new file and concurrent records never
/// interleave. A failed rotation does not fail the write: it is logged,
/// kept for [`take_rotation_error`](Self::take_rotation_error), and the
/// record is handled per [`RotationFallback`].
pub struct RotatingFileWriter {
    path: PathBuf,
    policy: RotationPolicy,
    inner: Mutex<Inner>,
}

impl RotatingFileWriter {
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self, WriteError> {
        let path = path.into();
        let active = ActiveFile::open(&path)?;
        Ok(Self {
            path,
            policy,
            inner: Mutex::new(Inner {
                state: FileState::Open(active),
                pending: Vec::new(),
                rotations: 0,
                rotation_error: None,
                notices: Vec::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Completed rotations since this writer was opened.
    pub fn rotations(&self) -> u64 {
        self.lock().rotations
    }

    /// The most recent rotation failure not yet observed by a caller.
    pub fn take_rotation_error(&self) -> Option<WriteError> {
        self.lock().rotation_error.take()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RotatingFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileWriter")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// A rotation failure does not fail the write; it is queued as a notice
    /// and kept for [`RotatingFileWriter::take_rotation_error`].
    fn write(&mut self, path: &Path, policy: &RotationPolicy, buf: &[u8]) -> Result<usize, WriteError> {
        if self.should_rotate(policy, buf.len()) {
            if let Err(err) = self.rotate(path, policy) {
                self.notices.push(Notice::RotationFailed {
                    error: err.to_string(),
                });
                self.rotation_error = Some(err);

                if let RotationFallback::Buffer { max_bytes } = policy.on_failure {
                    if self.pending.len() + buf.len() <= max_bytes {
                        self.pending.extend_from_slice(buf);
                        return Ok(buf.len());
                    }
                }
            }
        }

        self.append(path, buf)
    }

    fn should_rotate(&self, policy: &RotationPolicy, incoming: usize) -> bool {
        let FileState::Open(active) = &self.state else {
            return false;
        };
        // an empty file is never rotated, an oversized record goes in whole
        policy.max_size_bytes > 0
            && active.size > 0
            && active.size + (self.pending.len() + incoming) as u64 > policy.max_size_bytes
    }

    fn append(&mut self, path: &Path, buf: &[u8]) -> Result<usize, WriteError> {
        if matches!(self.state, FileState::Rotating) {
            self.state = FileState::Open(ActiveFile::open(path)?);
        }
        let FileState::Open(active) = &mut self.state else {
            return Err(WriteError::Closed);
        };

        if !self.pending.is_empty() {
            active.append(&self.pending)?;
            self.pending.clear();
        }
        active.append(buf)?;
        Ok(buf.len())
    }

    fn rotate(&mut self, path: &Path, policy: &RotationPolicy) -> Result<(), WriteError> {
        let mut active = match std::mem::replace(&mut self.state, FileState::Rotating) {
            FileState::Open(active) => active,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        if let Err(err) = active
            .file
            .flush()
            .and_then(|_| shift_backups(path, policy.max_backups, &mut self.notices))
        {
            self.state = FileState::Open(active);
            return Err(rotation_error(path, err));
        }
        drop(active);

        let backup = backup_path(path, 1, false);
        if let Err(err) = fs::rename(path, &backup) {
            // rename failed, the current file is untouched so keep using it
            let reopened = ActiveFile::open(path).map_err(|e| rotation_error(path, e))?;
            self.state = FileState::Open(reopened);
            return Err(rotation_error(path, err));
        }

        let fresh = ActiveFile::open(path).map_err(|e| rotation_error(path, e))?;
        self.state = FileState::Open(fresh);
        self.rotations += 1;

        self.notices.push(Notice::Rotated {
            backup: backup.clone(),
        });

        if policy.compress {
            match compress(&backup) {
                Ok(compressed) => self.notices.push(Notice::Compressed { backup: compressed }),
                Err(error) => self.notices.push(Notice::CompressFailed { backup, error }),
            }
        }

        if policy.max_age_days > 0 {
            let max_age = Duration::from_secs(u64::from(policy.max_age_days) * SECONDS_PER_DAY);
            if let Err(error) = prune_expired(path, max_age, &mut self.notices) {
                self.notices.push(Notice::PruneFailed { error });
            }
        }

        Ok(())
    }
}

impl Sink for RotatingFileWriter {
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        let (result, notices) = {
            let mut inner = self.lock();
            let result = inner.write(&self.path, &self.policy, buf);
            (result, std::mem::take(&mut inner.notices))
        };

        // a subscriber may write back through this writer
        for notice in &notices {
            notice.emit(&self.path, self.policy.on_failure);
        }
        result
    }

    fn flush(&self) -> Result<(), WriteError> {
        let mut inner = self.lock();
        if let FileState::Open(active) = &mut inner.state {
            active.file.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<(), WriteError> {
        let mut inner = self.lock();
        let state = std::mem::replace(&mut inner.state, FileState::Closed);
        let pending = std::mem::take(&mut inner.pending);

        match state {
            FileState::Open(mut active) => {
                if !pending.is_empty() {
                    active.append(&pending)?;
                }
                active.file.flush()?;
            }
            FileState::Rotating if !pending.is_empty() => {
                ActiveFile::open(&self.path)?.append(&pending)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn rotation_error(path: &Path, source: io::Error) -> WriteError {
    WriteError::Rotation {
        path: path.to_path_buf(),
        source,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

pub(crate) fn backup_path(path: &Path, index: usize, compressed: bool) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    if compressed {
        name.push(".gz");
    }
    PathBuf::from(name)
}

struct Backup {
    path: PathBuf,
    index: usize,
    compressed: bool,
}

fn list_backups(path: &Path) -> io::Result<Vec<Backup>> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{name}.");

    let mut backups = Vec::new();
    for entry in fs::read_dir(parent_dir(path))? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(rest) = file_name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
            continue;
        };
        let (digits, compressed) = match rest.strip_suffix(".gz") {
            Some(digits) => (digits, true),
            None => (rest, false),
        };
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(index @ 1..) = digits.parse::<usize>() {
            backups.push(Backup {
                path: entry.path(),
                index,
                compressed,
            });
        }
    }
    Ok(backups)
}

/// Move every backup one slot up, dropping the ones that would land past
/// `max_backups`. Highest index first so no rename overwrites a backup.
fn shift_backups(path: &Path, max_backups: usize, notices: &mut Vec<Notice>) -> io::Result<()> {
    let mut backups = list_backups(path)?;
    backups.sort_by(|a, b| b.index.cmp(&a.index));

    for backup in backups {
        if max_backups > 0 && backup.index >= max_backups {
            fs::remove_file(&backup.path)?;
            notices.push(Notice::Removed {
                backup: backup.path,
                expired: false,
            });
        } else {
            fs::rename(&backup.path, backup_path(path, backup.index + 1, backup.compressed))?;
        }
    }
    Ok(())
}

fn prune_expired(path: &Path, max_age: Duration, notices: &mut Vec<Notice>) -> io::Result<()> {
    let now = SystemTime::now();
    for backup in list_backups(path)? {
        let modified = fs::metadata(&backup.path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&backup.path)?;
            notices.push(Notice::Removed {
                backup: backup.path,
                expired: true,
            });
        }
    }
    Ok(())
}

#[cfg(feature = "gzip")]
fn compress(backup: &Path) -> io::Result<PathBuf> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut target = backup.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);

    let mut input = File::open(backup)?;
    let mut encoder = GzEncoder::new(File::create(&target)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(backup)?;
    Ok(target)
}

#[cfg(not(feature = "gzip"))]
fn compress(_backup: &Path) -> io::Result<PathBuf> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "built without the `gzip` feature",
    ))
}
