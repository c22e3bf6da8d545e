//! File-backed persistence for the agent.
//!
//! Everything lives under one data directory: the seen-id file, append-only CSV
//! logs of posted replies and engagement samples, the reply-URL log, and the
//! pending-approval table used in preview mode. Readers treat missing files as
//! empty and skip malformed rows, since a crash can leave a partial last line.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::BoxError;
use crate::dedup::append_line;

/// Locations of every persisted file under one data directory.
#[derive(Debug, Clone)]
pub struct DataFiles {
    dir: PathBuf,
}

impl DataFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DataFiles { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn seen_ids(&self) -> PathBuf {
        self.dir.join("all_seen_ids.txt")
    }

    pub fn posted_replies(&self) -> PathBuf {
        self.dir.join("posted_replies.csv")
    }

    pub fn reply_urls(&self) -> PathBuf {
        self.dir.join("reply_urls.txt")
    }

    pub fn engagement(&self) -> PathBuf {
        self.dir.join("engagement_metrics.csv")
    }

    pub fn pending(&self) -> PathBuf {
        self.dir.join("pending_replies.jsonl")
    }
}

/// A reply that was posted. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedReplyRecord {
    pub timestamp: DateTime<Utc>,
    pub original_item_id: String,
    pub original_text: String,
    pub reply_text: String,
    pub result_url: String,
    pub result_id: String,
}

/// Public metrics of one posted reply at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub tweet_id: String,
    pub timestamp: DateTime<Utc>,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn append_csv_row<T: Serialize>(path: &Path, row: &T) -> Result<(), BoxError> {
    ensure_parent(path)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Reads raw rows, tolerating a missing file and ragged rows.
fn read_csv_rows(path: &Path) -> Vec<csv::StringRecord> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path);
    let mut reader = match reader {
        Ok(reader) => reader,
        Err(e) => {
            debug!("Treating {} as empty: {}", path.display(), e);
            return Vec::new();
        }
    };
    reader
        .records()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Skipping unreadable row in {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Appends one posted reply to `posted_replies.csv`.
pub fn append_posted_reply(path: &Path, record: &PostedReplyRecord) -> Result<(), BoxError> {
    append_csv_row(path, record)?;
    info!(
        "Logged reply {} to post {}",
        record.result_id, record.original_item_id
    );
    Ok(())
}

/// Reads every complete posted-reply row, in append order.
pub fn read_posted_replies(path: &Path) -> Vec<PostedReplyRecord> {
    read_csv_rows(path)
        .into_iter()
        .filter_map(|row| {
            if row.len() < 5 {
                return None;
            }
            Some(PostedReplyRecord {
                timestamp: parse_timestamp(&row[0])?,
                original_item_id: row[1].to_string(),
                original_text: row[2].to_string(),
                reply_text: row[3].to_string(),
                result_url: row[4].to_string(),
                result_id: row.get(5).unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Appends a reply URL to `reply_urls.txt`.
pub fn append_reply_url(path: &Path, url: &str) -> io::Result<()> {
    append_line(path, url)
}

/// Reads non-blank URL lines, in append order.
pub fn read_reply_urls(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Appends engagement samples to `engagement_metrics.csv`.
pub fn append_engagement(path: &Path, records: &[EngagementRecord]) -> Result<(), BoxError> {
    for record in records {
        append_csv_row(path, record)?;
    }
    Ok(())
}

/// Reads every complete engagement row.
pub fn read_engagement(path: &Path) -> Vec<EngagementRecord> {
    read_csv_rows(path)
        .into_iter()
        .filter_map(|row| {
            if row.len() < 6 {
                return None;
            }
            Some(EngagementRecord {
                tweet_id: row[0].to_string(),
                timestamp: parse_timestamp(&row[1])?,
                likes: row[2].trim().parse().ok()?,
                retweets: row[3].trim().parse().ok()?,
                replies: row[4].trim().parse().ok()?,
                quotes: row[5].trim().parse().ok()?,
            })
        })
        .collect()
}

/// Review state of a reply generated in preview mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
    Posted,
}

/// A generated reply awaiting (or past) manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReply {
    pub item_id: String,
    pub item_text: String,
    pub reply_text: String,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub status: PendingStatus,
}

/// Flat table of [`PendingReply`] rows stored as JSON lines.
#[derive(Debug)]
pub struct PendingStore {
    path: PathBuf,
    entries: Vec<PendingReply>,
}

impl PendingStore {
    /// Loads the table at `path`; a missing file is an empty table.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, BoxError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str::<PendingReply>(line) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping malformed pending reply in {}: {}", path.display(), e);
                        None
                    }
                })
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(PendingStore { path, entries })
    }

    /// Replaces the in-memory table with what is on disk now.
    pub fn reload(&mut self) -> Result<(), BoxError> {
        self.entries = PendingStore::load(self.path.clone())?.entries;
        Ok(())
    }

    /// Current status of the entry for `item_id`, if there is one.
    pub fn status_of(&self, item_id: &str) -> Option<PendingStatus> {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.status)
    }

    pub fn entries(&self) -> &[PendingReply] {
        &self.entries
    }

    pub fn with_status(&self, status: PendingStatus) -> Vec<PendingReply> {
        self.entries
            .iter()
            .filter(|entry| entry.status == status)
            .cloned()
            .collect()
    }

    /// Appends a new entry to the table and the file.
    pub fn add(&mut self, entry: PendingReply) -> Result<(), BoxError> {
        let line = serde_json::to_string(&entry)?;
        append_line(&self.path, &line)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Changes the status of the entry for `item_id` and rewrites the file.
    ///
    /// The table is re-read first, so changes another process made since the
    /// last load are kept.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: If an entry was updated
    /// - `Ok(false)`: If no entry has that id
    pub fn set_status(&mut self, item_id: &str, status: PendingStatus) -> Result<bool, BoxError> {
        self.reload()?;
        let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == item_id) else {
            return Ok(false);
        };
        entry.status = status;
        self.rewrite()?;
        Ok(true)
    }

    fn rewrite(&self) -> Result<(), BoxError> {
        ensure_parent(&self.path)?;
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            for entry in &self.entries {
                writeln!(file, "{}", serde_json::to_string(entry)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
