//! Persist submitted scores to a JSON file (XDG config or ~/.config/tetrixtui).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "scores.json";

/// Entries returned by a leaderboard read.
pub const LEADERBOARD_SIZE: usize = 10;
/// Stored names are cut to this many characters.
pub const MAX_NAME_CHARS: usize = 10;
pub const DEFAULT_NAME: &str = "Anonymous";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt scores file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory for per-user files (`$XDG_CONFIG_HOME/tetrixtui` or `~/.config/tetrixtui`).
pub fn config_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    base.join("tetrixtui")
}

/// Trimmed player name, or "Anonymous" when nothing is left.
pub fn display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn stored_name(raw: &str) -> String {
    display_name(raw).chars().take(MAX_NAME_CHARS).collect()
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_level() -> u32 {
    1
}

/// Body of a score submission. Missing fields fall back to a fresh game's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub lines: u32,
}

impl ScoreSubmission {
    pub fn new(name: &str, score: u32, level: u32, lines: u32) -> Self {
        Self {
            name: display_name(name),
            score,
            level,
            lines,
        }
    }
}

/// One leaderboard row. Only `name` and `score` are required on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub lines: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Highest scores first; ties keep submission order.
pub fn top_scores(mut records: Vec<ScoreRecord>, n: usize) -> Vec<ScoreRecord> {
    records.sort_by(|a, b| b.score.cmp(&a.score));
    records.truncate(n);
    records
}

/// Append-only JSON list of every submitted score.
#[derive(Debug, Clone)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        config_dir().join(FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw entries on disk; a missing file is an empty list.
    fn load_entries(&self) -> Result<Vec<serde_json::Value>, StoreError> {
        let content = match fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&content)?)
    }

    /// All readable records on disk. Entries that don't fit a record
    /// (fractional or negative scores, missing names) are skipped.
    pub fn load(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let records = self
            .load_entries()?
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(%err, path = %self.path.display(), "skipping score entry");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    pub fn leaderboard(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        Ok(top_scores(self.load()?, LEADERBOARD_SIZE))
    }

    /// Normalise and append one submission. Creates the parent directory if needed.
    pub fn record(&self, submission: &ScoreSubmission) -> Result<ScoreRecord, StoreError> {
        let mut entries = self.load_entries()?;
        let record = ScoreRecord {
            name: stored_name(&submission.name),
            score: submission.score,
            level: submission.level,
            lines: submission.lines,
            date: Some(Utc::now()),
        };
        // unreadable entries are kept as they were
        entries.push(serde_json::to_value(&record)?);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(record)
    }
}
