//! Append-only chat log, one file per session.
//!
//! Layout:
//!
//! ```text
//! Broadcast title: <title as reported>
//! Recording started: 2024-05-01 21:00:00
//! --------------------------------------------------------------------------------
//!
//! [2024-05-01 21:00:03] nick[user] - hello
//!
//! Recording ended: 2024-05-01 22:10:45
//! ```

use std::path::{Path, PathBuf};

use afchat_frame::ChatEvent;
use chrono::{DateTime, Local};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::StorageError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const RULE_WIDTH: usize = 80;

/// Reduce a title to characters safe in a file name.
///
/// Keeps alphanumerics (any script), space, hyphen and underscore, then trims
/// surrounding whitespace.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `<YYYYMMDD_HHMMSS>_<sanitized title>.txt`
pub fn log_file_name(title: &str, opened_at: DateTime<Local>) -> String {
    format!(
        "{}_{}.txt",
        opened_at.format(FILE_STAMP_FORMAT),
        sanitize_title(title)
    )
}

/// An open chat log.
#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    file: Option<File>,
}

impl ChatLog {
    /// Create the log for a session titled `title` in `dir`.
    pub async fn open(dir: &Path, title: &str) -> Result<Self, StorageError> {
        Self::open_at(dir, title, Local::now()).await
    }

    /// Like [`ChatLog::open`] with an explicit creation time.
    ///
    /// An existing file with the same name is truncated.
    pub async fn open_at(
        dir: &Path,
        title: &str,
        opened_at: DateTime<Local>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(log_file_name(title, opened_at));
        let file = File::create(&path)
            .await
            .map_err(|source| StorageError::Open {
                path: path.clone(),
                source,
            })?;

        let mut log = Self {
            path,
            file: Some(file),
        };
        let header = format!(
            "Broadcast title: {title}\nRecording started: {}\n{}\n\n",
            opened_at.format(TIMESTAMP_FORMAT),
            "-".repeat(RULE_WIDTH)
        );
        log.write(header.as_bytes()).await?;
        info!(path = %log.path.display(), "chat log opened");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Append one chat line.
    pub async fn append(&mut self, event: &ChatEvent) -> Result<(), StorageError> {
        let line = format!("{event}\n");
        self.write(line.as_bytes()).await
    }

    /// Write the footer and release the file.
    ///
    /// Returns `Ok(false)` when the log was already closed.
    pub async fn close(&mut self) -> Result<bool, StorageError> {
        self.close_at(Local::now()).await
    }

    pub async fn close_at(&mut self, closed_at: DateTime<Local>) -> Result<bool, StorageError> {
        if self.is_closed() {
            return Ok(false);
        }
        let footer = format!("\nRecording ended: {}\n", closed_at.format(TIMESTAMP_FORMAT));
        let result = self.write(footer.as_bytes()).await;
        self.file = None;
        debug!(path = %self.path.display(), "chat log closed");
        result.map(|()| true)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StorageError::Closed(self.path.clone()))?;
        let outcome = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        outcome.map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
