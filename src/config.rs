use std::path::PathBuf;

use serde::Deserialize;

fn default_remove_on_close() -> bool {
    true
}

fn default_max_try() -> i64 {
    3
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueueConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Erase any existing file before opening
    #[serde(default)]
    pub overwrite: bool,
    /// Delete the file on `close()` when the queue is empty
    #[serde(default = "default_remove_on_close")]
    pub remove_on_close: bool,
    /// Counter reported for plain items read in retry mode
    #[serde(default = "default_max_try")]
    pub default_max_try: i64,
    /// How long a statement waits on another connection's lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl QueueConfig {
    /// Create a config for the given path with default settings
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overwrite: false,
            remove_on_close: default_remove_on_close(),
            default_max_try: default_max_try(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_remove_on_close(mut self, remove_on_close: bool) -> Self {
        self.remove_on_close = remove_on_close;
        self
    }

    pub fn with_default_max_try(mut self, default_max_try: i64) -> Self {
        self.default_max_try = default_max_try;
        self
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builder() {
        let parsed: QueueConfig = serde_json::from_str(r#"{"path": "jobs.db"}"#).unwrap();
        assert_eq!(parsed, QueueConfig::new("jobs.db"));
        assert!(parsed.remove_on_close);
        assert!(!parsed.overwrite);
        assert_eq!(parsed.default_max_try, 3);
    }

    #[test]
    fn test_overrides() {
        let parsed: QueueConfig = serde_json::from_str(
            r#"{"path": "jobs.db", "overwrite": true, "remove_on_close": false, "default_max_try": 7}"#,
        )
        .unwrap();
        let built = QueueConfig::new("jobs.db")
            .with_overwrite(true)
            .with_remove_on_close(false)
            .with_default_max_try(7);
        assert_eq!(parsed, built);
    }
}
