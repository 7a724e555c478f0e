use crate::format;
use crate::record::{Level, LogRecord};
use crate::sink::Sink;
use std::error::Error;
use std::io::Write;

/// Console sink for local development visibility: line format on
/// stdout, DEBUG and above (the most permissive sink).
#[derive(Clone, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        ConsoleSink
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn min_level(&self) -> Level {
        Level::Debug
    }

    fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut line = format::line(record);
        line.push('\n');
        // One write per record so concurrent records never interleave
        // within a line.
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(line.as_bytes())?;
        Ok(())
    }
}
