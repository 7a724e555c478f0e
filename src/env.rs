/// Environment variable names used by this crate for convenient
/// configuration of the logging facility from deployments.
///
/// These are purely helpers; the core config types remain decoupled
/// from environment access.

/// Logical service name stamped on every record.
pub const LOG_SERVICE_NAME_ENV: &str = "LOG_SERVICE_NAME";

/// Deployment environment tag, e.g. `development` or `production`.
pub const LOG_ENVIRONMENT_ENV: &str = "LOG_ENVIRONMENT";

/// Directory holding the rotating log files.
pub const LOG_DIR_ENV: &str = "LOG_DIR";

/// Comma-separated Elasticsearch base URLs, e.g. `http://localhost:9200`.
pub const LOG_ELASTIC_HOSTS_ENV: &str = "LOG_ELASTIC_HOSTS";

/// Optional Elasticsearch user name.
pub const LOG_ELASTIC_USERNAME_ENV: &str = "LOG_ELASTIC_USERNAME";

/// Optional Elasticsearch password.
pub const LOG_ELASTIC_PASSWORD_ENV: &str = "LOG_ELASTIC_PASSWORD";

/// Index name prefix; the daily date suffix is appended per record.
pub const LOG_ELASTIC_INDEX_PREFIX_ENV: &str = "LOG_ELASTIC_INDEX_PREFIX";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
