use crate::format;
use crate::record::{Level, LogRecord};
use crate::sink::Sink;
use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Asynchronous document store that receives structured log records.
///
/// Implementations transport one document at a time to a concrete
/// backend (Elasticsearch, a test double, etc). `deliver` is called from
/// a background task and is never awaited on the application's request
/// path.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Deliver a single document to the destination named by `index`.
    ///
    /// **Parameters**
    /// - `index`: logical destination, one per calendar day
    ///   (`<prefix>-<YYYY.MM.DD>`).
    /// - `document`: flat structured record as produced by
    ///   [`format::document`].
    ///
    /// **Returns**
    /// - `Ok(())` if the store accepted the document.
    /// - `Err(..)` on network, auth or serialization failure. Delivery
    ///   is best-effort: the caller reports the error on stderr and
    ///   drops the record.
    async fn deliver(&self, index: &str, document: serde_json::Value)
        -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Cheap reachability probe used once at startup. Default is a
    /// no-op for stores without a meaningful health endpoint.
    async fn ping(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Sink that ships records to a [`RemoteStore`] via a bounded channel
/// and a background task.
///
/// `emit` only enqueues; network I/O is fully decoupled from the caller
/// so a slow or unreachable store never stalls a request. When the
/// queue is full the record is dropped and counted rather than
/// buffered without bound.
pub struct RemoteSink {
    sender: mpsc::Sender<LogRecord>,
    /// Records offered to this sink.
    pub total_records: Arc<AtomicU64>,
    /// Records acknowledged by the store.
    pub delivered_records: Arc<AtomicU64>,
    /// Records dropped because the queue was full or delivery failed.
    pub dropped_records: Arc<AtomicU64>,
}

impl RemoteSink {
    /// Create the sink and spawn its delivery task.
    ///
    /// A minimal `buffer` threshold is enforced to avoid degenerate
    /// configurations. The returned handle completes once the channel
    /// closes and the queue is drained; callers that care about a clean
    /// shutdown can await it with a timeout.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        index_prefix: impl Into<String>,
        buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let index_prefix = index_prefix.into();
        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let total_records = Arc::new(AtomicU64::new(0));
        let delivered_records = Arc::new(AtomicU64::new(0));
        let dropped_records = Arc::new(AtomicU64::new(0));

        let delivered_bg = Arc::clone(&delivered_records);
        let dropped_bg = Arc::clone(&dropped_records);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let index = format!("{}-{}", index_prefix, record.timestamp.format("%Y.%m.%d"));
                let document = format::document(&record);
                match store.deliver(&index, document).await {
                    Ok(()) => {
                        delivered_bg.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        dropped_bg.fetch_add(1, Ordering::Relaxed);
                        eprintln!("remote log delivery to '{}' failed, record dropped: {}", index, e);
                    }
                }
            }
        });

        (
            RemoteSink {
                sender: tx,
                total_records,
                delivered_records,
                dropped_records,
            },
            handle,
        )
    }
}

impl Sink for RemoteSink {
    fn name(&self) -> &str {
        "remote"
    }

    // No client-side threshold; the store sees everything the facade
    // accepts and filtering happens index-side.
    fn min_level(&self) -> Level {
        Level::Debug
    }

    fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.total_records.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(record.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                Err("remote log queue full, record dropped".into())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                Err("remote log worker stopped, record dropped".into())
            }
        }
    }
}
