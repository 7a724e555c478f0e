use crate::console::ConsoleSink;
use crate::context::{self, RequestContext};
#[cfg(feature = "elastic")]
use crate::elastic::{ElasticConfig, ElasticStore};
use crate::env;
use crate::file_sink::{JsonFileSink, TextFileSink};
use crate::format;
use crate::record::{Level, LogRecord};
use crate::remote::{RemoteSink, RemoteStore};
use crate::rotate::DEFAULT_RETAINED_FILES;
use crate::sink::Sink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

/// Configuration of the logging facility, constructed once at process
/// start.
///
/// **Fields**
/// - `name`: logger name embedded in every record.
/// - `log_dir`: directory for the rotating files; must be writable or
///   construction fails.
/// - `service_name` / `environment`: defaults applied to every fresh
///   [`RequestContext`].
/// - `retained_files`: rotated generations kept per file.
/// - `remote_buffer`: maximum queued records before the remote sink
///   starts dropping new ones.
/// - `elastic`: remote store parameters; `None` runs local-only.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub name: String,
    pub log_dir: PathBuf,
    pub service_name: String,
    pub environment: String,
    pub retained_files: usize,
    pub remote_buffer: usize,
    #[cfg(feature = "elastic")]
    pub elastic: Option<ElasticConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            name: "app".to_string(),
            log_dir: PathBuf::from("var/logs"),
            service_name: "app".to_string(),
            environment: "development".to_string(),
            retained_files: DEFAULT_RETAINED_FILES,
            remote_buffer: 1024,
            #[cfg(feature = "elastic")]
            elastic: None,
        }
    }
}

impl LoggerConfig {
    /// Overlay the default config with `LOG_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = LoggerConfig::default();
        LoggerConfig {
            service_name: env::env_or(env::LOG_SERVICE_NAME_ENV, &defaults.service_name),
            environment: env::env_or(env::LOG_ENVIRONMENT_ENV, &defaults.environment),
            log_dir: PathBuf::from(env::env_or(
                env::LOG_DIR_ENV,
                &defaults.log_dir.to_string_lossy(),
            )),
            ..defaults
        }
    }
}

/// Fatal configuration problems detected at construction. Everything
/// after construction is best-effort; an unusable log directory is not.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to prepare log directory {dir}: {source}")]
    LogDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The logging facade: merges the ambient [`RequestContext`] with
/// call-site fields and fans the resulting record out to every
/// installed sink.
///
/// Log calls never fail and never raise for logging-internal reasons;
/// sink errors are reported on stderr and the affected sink alone
/// drops the record.
pub struct Logger {
    name: String,
    service_name: String,
    environment: String,
    remote_buffer: usize,
    #[cfg(feature = "elastic")]
    elastic: Option<ElasticConfig>,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    remote_worker: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    /// Build the facility with its local sinks (rotating text file,
    /// rotating JSON file, console) installed. The remote sink is
    /// attached later by [`Logger::connect_remote`].
    pub fn new(config: LoggerConfig) -> Result<Self, ConfigError> {
        let dir_error = |source| ConfigError::LogDirectory {
            dir: config.log_dir.clone(),
            source,
        };
        let text = TextFileSink::with_retention(&config.log_dir, config.retained_files)
            .map_err(dir_error)?;
        let json = JsonFileSink::with_retention(&config.log_dir, config.retained_files)
            .map_err(dir_error)?;

        let sinks: Vec<Arc<dyn Sink>> =
            vec![Arc::new(text), Arc::new(json), Arc::new(ConsoleSink::new())];

        Ok(Logger {
            name: config.name,
            service_name: config.service_name,
            environment: config.environment,
            remote_buffer: config.remote_buffer,
            #[cfg(feature = "elastic")]
            elastic: config.elastic,
            sinks: RwLock::new(sinks),
            remote_worker: Mutex::new(None),
        })
    }

    /// Install an additional sink at runtime.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sink);
    }

    /// Startup hook: establish the remote store connection, if one is
    /// configured.
    ///
    /// On an unreachable or failing cluster the facility stays in
    /// degraded mode with only the local sinks; the failure is reported
    /// on stderr and never surfaced to the caller, so startup proceeds
    /// regardless.
    #[cfg(feature = "elastic")]
    pub async fn connect_remote(&self) {
        let Some(config) = self.elastic.clone() else {
            return;
        };
        let prefix = config.index_prefix.clone();
        self.connect_remote_store(Arc::new(ElasticStore::new(config)), prefix)
            .await;
    }

    /// Backend-agnostic variant of [`Logger::connect_remote`]: ping the
    /// store and, when reachable, attach a [`RemoteSink`] shipping to
    /// `<index_prefix>-<YYYY.MM.DD>`.
    pub async fn connect_remote_store(&self, store: Arc<dyn RemoteStore>, index_prefix: String) {
        if let Err(e) = store.ping().await {
            eprintln!("remote log store unreachable, continuing with local sinks only: {}", e);
            return;
        }
        let (sink, handle) = RemoteSink::new(store, index_prefix, self.remote_buffer);
        self.add_sink(Arc::new(sink));
        *self
            .remote_worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
    }

    /// Detach the remote sink and give its worker a bounded grace
    /// period to drain; the queue is abandoned on timeout.
    pub async fn shutdown(&self) {
        self.sinks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|sink| sink.name() != "remote");
        let handle = self
            .remote_worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if timeout(Duration::from_secs(5), handle).await.is_err() {
                eprintln!("remote log worker did not drain in time, abandoning queue");
            }
        }
    }

    /// Fresh context carrying this facility's service and environment
    /// defaults.
    pub fn new_context(&self) -> RequestContext {
        RequestContext::new(&self.service_name, &self.environment)
    }

    /// Replace the ambient context for the current unit of work.
    pub fn set_context(&self, context: RequestContext) {
        context::set(context);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message, None, None);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message, None, None);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message, None, None);
    }

    pub fn debug_with<K>(&self, message: &str, extra: impl IntoIterator<Item = (K, serde_json::Value)>)
    where
        K: Into<String>,
    {
        self.log(Level::Debug, message, Some(collect_extra(extra)), None);
    }

    pub fn info_with<K>(&self, message: &str, extra: impl IntoIterator<Item = (K, serde_json::Value)>)
    where
        K: Into<String>,
    {
        self.log(Level::Info, message, Some(collect_extra(extra)), None);
    }

    pub fn error_with<K>(&self, message: &str, extra: impl IntoIterator<Item = (K, serde_json::Value)>)
    where
        K: Into<String>,
    {
        self.log(Level::Error, message, Some(collect_extra(extra)), None);
    }

    /// Log an error record capturing `error`'s rendered source chain.
    /// The error itself is left to the caller to re-raise; the facade
    /// only observes it.
    pub fn error_with_cause(&self, message: &str, error: &(dyn std::error::Error + 'static)) {
        self.log(Level::Error, message, None, Some(error));
    }

    fn log(
        &self,
        level: Level,
        message: &str,
        extra: Option<BTreeMap<String, serde_json::Value>>,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) {
        let ambient = context::current();
        let mut merged = ambient.as_map();
        if let Some(extra) = extra {
            // Call-site fields win on collision.
            merged.extend(extra);
        }

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            logger: self.name.clone(),
            message: message.to_string(),
            extra: merged,
            exception: error.map(format::render_error),
        };
        self.dispatch(&record);
    }

    fn dispatch(&self, record: &LogRecord) {
        let sinks = self
            .sinks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for sink in sinks.iter() {
            if record.level >= sink.min_level() {
                if let Err(e) = sink.emit(record) {
                    eprintln!("log sink '{}' failed: {}", sink.name(), e);
                }
            }
        }
    }
}

fn collect_extra<K>(
    extra: impl IntoIterator<Item = (K, serde_json::Value)>,
) -> BTreeMap<String, serde_json::Value>
where
    K: Into<String>,
{
    extra.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
