use crate::format;
use crate::record::{Level, LogRecord};
use crate::rotate::{RollingFileWriter, DEFAULT_RETAINED_FILES};
use crate::sink::Sink;
use std::error::Error;
use std::io;
use std::path::Path;

/// File name of the human-readable log inside the log directory.
pub const TEXT_LOG_FILE: &str = "app.log";

/// File name of the machine-readable log inside the log directory.
pub const JSON_LOG_FILE: &str = "app.json.log";

/// Rotating text-file sink: one formatted line per record, rotated
/// daily, INFO and above.
pub struct TextFileSink {
    writer: RollingFileWriter,
}

impl TextFileSink {
    pub fn new(log_dir: &Path) -> io::Result<Self> {
        Self::with_retention(log_dir, DEFAULT_RETAINED_FILES)
    }

    pub fn with_retention(log_dir: &Path, max_files: usize) -> io::Result<Self> {
        Ok(TextFileSink {
            writer: RollingFileWriter::new(log_dir, TEXT_LOG_FILE, max_files)?,
        })
    }
}

impl Sink for TextFileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn min_level(&self) -> Level {
        Level::Info
    }

    fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.writer.write_line(&format::line(record))?;
        Ok(())
    }
}

/// Rotating JSON-file sink: one document per line, same rotation policy
/// as the text sink, INFO and above. Suited to log-shipper ingestion.
pub struct JsonFileSink {
    writer: RollingFileWriter,
}

impl JsonFileSink {
    pub fn new(log_dir: &Path) -> io::Result<Self> {
        Self::with_retention(log_dir, DEFAULT_RETAINED_FILES)
    }

    pub fn with_retention(log_dir: &Path, max_files: usize) -> io::Result<Self> {
        Ok(JsonFileSink {
            writer: RollingFileWriter::new(log_dir, JSON_LOG_FILE, max_files)?,
        })
    }
}

impl Sink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    fn min_level(&self) -> Level {
        Level::Info
    }

    fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.writer.write_line(&format::json(record))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::fs;

    fn record(level: Level, message: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level,
            logger: "app".to_string(),
            message: message.to_string(),
            extra: BTreeMap::new(),
            exception: None,
        }
    }

    #[test]
    fn text_sink_writes_formatted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TextFileSink::new(dir.path()).unwrap();
        sink.emit(&record(Level::Info, "hello")).unwrap();
        let content = fs::read_to_string(dir.path().join(TEXT_LOG_FILE)).unwrap();
        assert!(content.contains(" - INFO - "));
        assert!(content.trim_end().ends_with("hello"));
    }

    #[test]
    fn json_sink_writes_one_document_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path()).unwrap();
        sink.emit(&record(Level::Info, "first")).unwrap();
        sink.emit(&record(Level::Error, "second")).unwrap();
        let content = fs::read_to_string(dir.path().join(JSON_LOG_FILE)).unwrap();
        let docs: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["message"], "first");
        assert_eq!(docs[1]["level"], "ERROR");
    }

    #[test]
    fn both_file_sinks_require_at_least_info() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TextFileSink::new(dir.path()).unwrap().min_level(), Level::Info);
        assert_eq!(JsonFileSink::new(dir.path()).unwrap().min_level(), Level::Info);
    }
}
