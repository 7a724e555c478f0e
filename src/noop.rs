use crate::remote::RemoteStore;
use async_trait::async_trait;
use std::error::Error;

/// A remote store that simply discards every document.
///
/// Useful for measuring the overhead of the queueing layer itself
/// without any external I/O, and for unit tests that don't care about
/// persistence.
#[derive(Clone, Default)]
pub struct NoopStore;

#[async_trait]
impl RemoteStore for NoopStore {
    async fn deliver(
        &self,
        _index: &str,
        _document: serde_json::Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
