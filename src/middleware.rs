use crate::context;
use crate::logger::Logger;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Short opaque correlation id, one per request.
pub fn short_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Emits the END-ERROR record when a request future is dropped before
/// reaching a terminal state (client disconnect, task abort, panic).
struct AbortGuard<'a> {
    logger: &'a Logger,
    method: &'a str,
    path: &'a str,
    armed: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.logger
                .error(&format!("Request aborted - {} {}", self.method, self.path));
        }
    }
}

/// Request boundary hook for axum.
///
/// For every request this establishes a fresh context scope with a
/// generated correlation id and `method`/`path` extras, logs the entry,
/// runs the inner service, then updates the context with the response
/// status and logs the single terminal record. Install with
/// `axum::middleware::from_fn_with_state`.
pub async fn logging_middleware(
    State(logger): State<Arc<Logger>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = short_request_id();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    context::scope(logger.new_context(), async move {
        logger.set_context(
            logger
                .new_context()
                .with_request_id(&request_id)
                .with_extra("method", json!(method.as_str()))
                .with_extra("path", json!(path.as_str())),
        );
        logger.info(&format!("Request started - {method} {path}"));

        let mut abort = AbortGuard {
            logger: &logger,
            method: &method,
            path: &path,
            armed: true,
        };
        let response = next.run(request).await;
        abort.armed = false;
        let status = response.status().as_u16();

        logger.set_context(
            logger
                .new_context()
                .with_request_id(&request_id)
                .with_extra("method", json!(method.as_str()))
                .with_extra("path", json!(path.as_str()))
                .with_extra("status_code", json!(status)),
        );
        logger.info(&format!("Request completed - {method} {path} - Status: {status}"));

        response
    })
    .await
}

/// Framework-agnostic request boundary for fallible units of work.
///
/// Logs the entry record, runs `work` inside its own context scope and
/// emits exactly one terminal record: INFO on success, ERROR with the
/// captured error chain on failure. The original error is returned
/// unchanged — the boundary observes, it never swallows.
pub async fn guard<F, T, E>(logger: &Logger, method: &str, path: &str, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let request_id = short_request_id();
    context::scope(logger.new_context(), async move {
        logger.set_context(
            logger
                .new_context()
                .with_request_id(&request_id)
                .with_extra("method", json!(method))
                .with_extra("path", json!(path)),
        );
        logger.info(&format!("Request started - {method} {path}"));

        let mut abort = AbortGuard {
            logger,
            method,
            path,
            armed: true,
        };
        let result = work.await;
        abort.armed = false;
        drop(abort);

        match result {
            Ok(value) => {
                logger.info(&format!("Request completed - {method} {path}"));
                Ok(value)
            }
            Err(error) => {
                logger.error_with_cause(&format!("Request failed - {method} {path}"), &error);
                Err(error)
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LoggerConfig;
    use crate::record::{Level, LogRecord};
    use crate::sink::Sink;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    struct RecordingSink {
        records: Mutex<Vec<LogRecord>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            RecordingSink {
                records: Mutex::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<LogRecord> {
            std::mem::take(&mut *self.records.lock().unwrap())
        }
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn min_level(&self) -> Level {
            Level::Debug
        }

        fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn test_logger() -> (Arc<Logger>, Arc<RecordingSink>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            Logger::new(LoggerConfig {
                log_dir: dir.path().to_path_buf(),
                service_name: "svc".to_string(),
                ..LoggerConfig::default()
            })
            .unwrap(),
        );
        let sink = Arc::new(RecordingSink::new());
        logger.add_sink(sink.clone());
        (logger, sink, dir)
    }

    #[derive(Debug)]
    struct ValueError(&'static str);

    impl std::fmt::Display for ValueError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for ValueError {}

    #[tokio::test]
    async fn middleware_logs_entry_and_single_terminal_record() {
        let (logger, sink, _dir) = test_logger();
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(
                logger.clone(),
                logging_middleware,
            ))
            .with_state(());

        let response = app
            .oneshot(HttpRequest::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let records = sink.take();
        assert_eq!(records.len(), 2);
        assert!(records[0].message.starts_with("Request started - GET /ping"));
        assert!(records[1].message.contains("Request completed - GET /ping - Status: 200"));

        let request_id = records[0].extra["request_id"].as_str().unwrap().to_string();
        assert_eq!(request_id.len(), 8);
        assert_eq!(records[1].extra["request_id"].as_str().unwrap(), request_id);
        assert_eq!(records[1].extra["status_code"], json!(200));
        assert_eq!(records[0].extra["path"], json!("/ping"));
    }

    #[tokio::test]
    async fn guard_logs_one_error_record_and_reraises() {
        let (logger, sink, _dir) = test_logger();

        let result: Result<(), ValueError> =
            guard(&logger, "GET", "/boom", async { Err(ValueError("x")) }).await;

        assert!(matches!(result, Err(ValueError("x"))));
        let records = sink.take();
        let errors: Vec<&LogRecord> = records.iter().filter(|r| r.level == Level::Error).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Request failed - GET /boom"));
        assert!(errors[0].exception.as_deref().unwrap().contains("x"));
        // Entry record plus exactly one terminal record.
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_request_emits_an_abort_record() {
        let (logger, sink, _dir) = test_logger();
        let worker = logger.clone();
        let task = tokio::spawn(async move {
            let _: Result<(), ValueError> = guard(&worker, "GET", "/slow", async {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        });

        // Let the request reach IN_FLIGHT, then cancel it.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        task.abort();
        let _ = task.await;

        let records = sink.take();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].level, Level::Error);
        assert!(records[1].message.contains("Request aborted - GET /slow"));
    }

    #[tokio::test]
    async fn guard_logs_completion_on_success() {
        let (logger, sink, _dir) = test_logger();

        let result: Result<u32, ValueError> = guard(&logger, "GET", "/ok", async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        let records = sink.take();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].level, Level::Info);
        assert!(records[1].message.contains("Request completed - GET /ok"));
    }
}
