//! Duplicate tracking across runs.
//!
//! The seen-id set is persisted as a line-delimited text file. Ids are only ever
//! appended; the whole file is cleared by an explicit [`DuplicateTracker::reset`].

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Set of item ids already processed in this or a previous run.
pub type SeenIdSet = HashSet<String>;

/// Persistent tracker deciding whether an incoming item is new.
#[derive(Debug)]
pub struct DuplicateTracker {
    path: PathBuf,
    seen: SeenIdSet,
}

impl DuplicateTracker {
    /// Loads the persisted ids at `path`.
    ///
    /// A missing file means nothing has been seen yet. Blank lines and surrounding
    /// whitespace are ignored.
    ///
    /// # Returns
    ///
    /// - `Ok(DuplicateTracker)`: With every persisted id loaded
    /// - `Err(io::Error)`: If the file exists but cannot be read
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No seen-id file at {}, starting empty", path.display());
                SeenIdSet::new()
            }
            Err(e) => return Err(e),
        };
        info!("Loaded {} seen ids from {}", seen.len(), path.display());
        Ok(DuplicateTracker { path, seen })
    }

    /// Membership test: `true` when `id` has never been recorded.
    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains(id)
    }

    /// Appends `id` to the persisted file, then to the in-memory set.
    ///
    /// The id is kept in memory even when the write fails so the current process
    /// does not act on it twice; the error is returned for the caller to log.
    pub fn record(&mut self, id: &str) -> io::Result<()> {
        if !self.is_new(id) {
            debug!("Id {} already recorded", id);
            return Ok(());
        }
        let written = append_line(&self.path, id);
        self.seen.insert(id.to_string());
        written
    }

    /// Clears the persisted file and the in-memory set.
    pub fn reset(&mut self) -> io::Result<()> {
        warn!(
            "Resetting seen-id set at {} ({} ids dropped)",
            self.path.display(),
            self.seen.len()
        );
        self.seen.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Snapshot of the in-memory set.
    pub fn seen(&self) -> &SeenIdSet {
        &self.seen
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Appends one line to `path`, creating the parent directory and the file if needed.
pub(crate) fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    file.flush()
}
