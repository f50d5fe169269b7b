use std::path::PathBuf;
use std::time::Duration;

use crate::error::StorageError;

/// Directory name used under the executable directory for chat logs.
pub const LOG_DIR_NAME: &str = "chat_logs";

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between keepalive pings while active.
    pub keepalive_interval: Duration,
    /// Wait between the connect frame and the join frame.
    pub join_grace: Duration,
    /// Directory for chat logs. `None` uses [`default_log_dir`].
    pub log_dir: Option<PathBuf>,
    /// Write a chat log at all.
    pub logging_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(60),
            join_grace: Duration::from_secs(2),
            log_dir: None,
            logging_enabled: true,
        }
    }
}

impl SessionConfig {
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_join_grace(mut self, grace: Duration) -> Self {
        self.join_grace = grace;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.logging_enabled = false;
        self
    }

    /// The configured log directory, falling back to [`default_log_dir`].
    pub fn resolved_log_dir(&self) -> Result<PathBuf, StorageError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_log_dir(),
        }
    }
}

/// `<directory of the running executable>/chat_logs`.
pub fn default_log_dir() -> Result<PathBuf, StorageError> {
    let exe = std::env::current_exe().map_err(StorageError::LogDir)?;
    let dir = exe.parent().ok_or_else(|| {
        StorageError::LogDir(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        ))
    })?;
    Ok(dir.join(LOG_DIR_NAME))
}
