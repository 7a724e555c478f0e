use crate::record::LogRecord;
use chrono::SecondsFormat;
use serde_json::Value;

/// Keys the structured formatter owns. On collision with an `extra`
/// field the reserved value wins; the colliding extra is overwritten.
pub const RESERVED_KEYS: [&str; 5] = ["timestamp", "level", "message", "logger", "exception"];

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field(record: &LogRecord, key: &str) -> String {
    record.extra.get(key).map(text).unwrap_or_else(|| "-".to_string())
}

/// Render a record as a single human-readable line.
///
/// Field order and delimiters are fixed:
/// `<ts> - <LEVEL> - [SERVICE:..][ENV:..][REQ:..][USER:..] - <logger> - <message>`
///
/// A captured exception is appended on the following lines.
pub fn line(record: &LogRecord) -> String {
    let mut out = format!(
        "{} - {} - [SERVICE:{}][ENV:{}][REQ:{}][USER:{}] - {} - {}",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.level,
        field(record, "service"),
        field(record, "environment"),
        field(record, "request_id"),
        field(record, "user_id"),
        record.logger,
        record.message,
    );
    if let Some(exception) = &record.exception {
        out.push('\n');
        out.push_str(exception);
    }
    out
}

/// Render a record as a flat, self-describing document.
///
/// All `extra` keys appear at top level next to the reserved keys
/// (`timestamp`, `level`, `message`, `logger`, `exception`). Reserved
/// keys win on collision. Absent optional data is omitted, never
/// emitted as `null`.
pub fn document(record: &LogRecord) -> Value {
    let mut doc = serde_json::Map::new();
    for (key, value) in &record.extra {
        doc.insert(key.clone(), value.clone());
    }
    doc.insert(
        "timestamp".to_string(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    doc.insert("level".to_string(), Value::String(record.level.as_str().to_string()));
    doc.insert("message".to_string(), Value::String(record.message.clone()));
    doc.insert("logger".to_string(), Value::String(record.logger.clone()));
    if let Some(exception) = &record.exception {
        doc.insert("exception".to_string(), Value::String(exception.clone()));
    }
    Value::Object(doc)
}

/// Serialize a record as one JSON document per line. Never fails; an
/// encoder error degrades to an empty document.
pub fn json(record: &LogRecord) -> String {
    serde_json::to_string(&document(record)).unwrap_or_else(|_| "{}".to_string())
}

/// Render an error and its `source()` chain into a single string.
pub fn render_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
