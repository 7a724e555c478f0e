use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, OnceLock, RwLock};

/// Per-request context attached to every log record.
///
/// Immutable once constructed; updates replace the whole value via the
/// `with_*` builders and [`set`]. `request_id` and `user_id` default to
/// the `"-"` sentinel so rendered records never carry empty fields.
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    pub timestamp: String,
    pub request_id: String,
    pub user_id: String,
    pub service: String,
    pub environment: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::new("-", "development")
    }
}

impl RequestContext {
    /// Create a fresh context stamped with the current UTC time.
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        RequestContext {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            request_id: "-".to_string(),
            user_id: "-".to_string(),
            service: service.into(),
            environment: environment.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Flat view of the context as record fields, with `extra` entries
    /// merged at top level. The context timestamp is not included; each
    /// record carries its own.
    pub fn as_map(&self) -> BTreeMap<String, serde_json::Value> {
        let mut map = BTreeMap::new();
        map.insert(
            "request_id".to_string(),
            serde_json::Value::String(self.request_id.clone()),
        );
        map.insert(
            "user_id".to_string(),
            serde_json::Value::String(self.user_id.clone()),
        );
        map.insert(
            "service".to_string(),
            serde_json::Value::String(self.service.clone()),
        );
        map.insert(
            "environment".to_string(),
            serde_json::Value::String(self.environment.clone()),
        );
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

tokio::task_local! {
    static TASK_CONTEXT: RefCell<Arc<RequestContext>>;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<Arc<RequestContext>>> = const { RefCell::new(None) };
}

fn process_default() -> &'static RwLock<Arc<RequestContext>> {
    static DEFAULT: OnceLock<RwLock<Arc<RequestContext>>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(RequestContext::default())))
}

/// Current ambient context.
///
/// Resolution order: the task-local cell when running inside [`scope`],
/// then the calling thread's cell, then the process-wide default. A
/// context therefore always exists, even before any request boundary has
/// been entered.
pub fn current() -> Arc<RequestContext> {
    if let Ok(context) = TASK_CONTEXT.try_with(|cell| cell.borrow().clone()) {
        return context;
    }
    if let Some(context) = THREAD_CONTEXT.with(|cell| cell.borrow().clone()) {
        return context;
    }
    process_default()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replace the ambient context for the current unit of work.
///
/// Inside [`scope`] this writes the task-local cell, so concurrent tasks
/// never observe each other's contexts. Outside a scope it falls back to
/// the calling thread's cell, which gives the same isolation to
/// thread-per-request callers.
pub fn set(context: RequestContext) {
    let context = Arc::new(context);
    let moved = context.clone();
    if TASK_CONTEXT.try_with(move |cell| *cell.borrow_mut() = moved).is_ok() {
        return;
    }
    THREAD_CONTEXT.with(|cell| *cell.borrow_mut() = Some(context));
}

/// Replace the process-wide default returned when no request scope is
/// active. Intended for process startup.
pub fn set_process_default(context: RequestContext) {
    let mut guard = process_default()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Arc::new(context);
}

/// Run `fut` with its own context cell initialized to `initial`.
///
/// Every task driving one logical request gets exactly one cell;
/// [`set`] calls made while the future runs stay confined to it.
pub async fn scope<F>(initial: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    TASK_CONTEXT.scope(RefCell::new(Arc::new(initial)), fut).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_context_is_always_present() {
        let context = current();
        assert_eq!(context.request_id, "-");
        assert_eq!(context.user_id, "-");
    }

    #[test]
    fn as_map_flattens_extra_and_skips_timestamp() {
        let context = RequestContext::new("svc", "prod")
            .with_request_id("abc123")
            .with_extra("path", json!("/ping"));
        let map = context.as_map();
        assert_eq!(map["request_id"], json!("abc123"));
        assert_eq!(map["service"], json!("svc"));
        assert_eq!(map["path"], json!("/ping"));
        assert!(!map.contains_key("timestamp"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_never_see_each_others_context() {
        let mut handles = Vec::new();
        for i in 0..8u32 {
            handles.push(tokio::spawn(scope(RequestContext::default(), async move {
                let id = format!("req-{i}");
                set(RequestContext::default().with_request_id(&id));
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                    assert_eq!(current().request_id, id);
                }
            })));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn plain_threads_fall_back_to_thread_local_isolation() {
        let a = std::thread::spawn(|| {
            set(RequestContext::default().with_request_id("aaa"));
            std::thread::sleep(std::time::Duration::from_millis(20));
            current().request_id.clone()
        });
        let b = std::thread::spawn(|| {
            set(RequestContext::default().with_request_id("bbb"));
            std::thread::sleep(std::time::Duration::from_millis(20));
            current().request_id.clone()
        });
        assert_eq!(a.join().unwrap(), "aaa");
        assert_eq!(b.join().unwrap(), "bbb");
    }

    #[tokio::test]
    async fn set_inside_scope_does_not_leak_to_the_thread() {
        scope(RequestContext::default(), async {
            set(RequestContext::default().with_request_id("scoped"));
            assert_eq!(current().request_id, "scoped");
        })
        .await;
        assert_eq!(current().request_id, "-");
    }
}
