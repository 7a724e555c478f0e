use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log event, fully formed before any sink sees it.
///
/// `extra` holds the ambient request context merged with call-site
/// fields; on key collision the call-site value wins. `exception` is the
/// rendered error chain when the caller supplied one.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub logger: String,
    pub message: String,
    pub extra: BTreeMap<String, serde_json::Value>,
    pub exception: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Error);
        assert!(Level::Error >= Level::Info);
    }

    #[test]
    fn level_names_match_wire_format() {
        assert_eq!(Level::Debug.as_str(), "DEBUG");
        assert_eq!(Level::Info.to_string(), "INFO");
        assert_eq!(serde_json::to_value(Level::Error).unwrap(), "ERROR");
    }
}
