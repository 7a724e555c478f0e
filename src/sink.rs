use crate::record::{Level, LogRecord};
use std::error::Error;

/// Independent destination for [`LogRecord`]s produced by the logging
/// facade.
///
/// Implementations own their formatting and their failure handling. The
/// facade calls `emit` synchronously, one fully-formed record at a time,
/// and only for records at or above [`Sink::min_level`]. A failing sink
/// must not affect any other sink: errors are reported by the facade on
/// stderr and never reach application code.
pub trait Sink: Send + Sync {
    /// Short name used when reporting delivery failures.
    fn name(&self) -> &str;

    /// Minimum severity this sink accepts.
    fn min_level(&self) -> Level;

    /// Deliver a single record.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] built by the facade.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted by the destination.
    /// - `Err(..)` if delivery failed (I/O error, full queue, etc.).
    ///   The record is considered dropped for this sink; other sinks
    ///   are unaffected.
    ///
    /// Implementations may block briefly on local I/O but must never
    /// block on network I/O; network-bound sinks should hand off to a
    /// background task instead.
    fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}
