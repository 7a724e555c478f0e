use crate::env;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// Configuration for [`ElasticStore`].
///
/// The store talks to Elasticsearch over HTTP using the document index
/// API, one document per log event. Credentials are plain configuration
/// input; [`ElasticConfig::from_env`] reads them from the environment
/// instead when deployments prefer that.
#[derive(Clone, Debug)]
pub struct ElasticConfig {
    /// Cluster base URLs tried in order, e.g. "http://localhost:9200".
    pub hosts: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Destination index is `<index_prefix>-<YYYY.MM.DD>`.
    pub index_prefix: String,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        ElasticConfig {
            hosts: vec!["http://localhost:9200".to_string()],
            username: None,
            password: None,
            index_prefix: "app-logs".to_string(),
        }
    }
}

impl ElasticConfig {
    /// Build a config from `LOG_ELASTIC_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = ElasticConfig::default();
        ElasticConfig {
            hosts: env::env_or(env::LOG_ELASTIC_HOSTS_ENV, &defaults.hosts.join(","))
                .split(',')
                .map(|host| host.trim().to_string())
                .filter(|host| !host.is_empty())
                .collect(),
            username: std::env::var(env::LOG_ELASTIC_USERNAME_ENV).ok(),
            password: std::env::var(env::LOG_ELASTIC_PASSWORD_ENV).ok(),
            index_prefix: env::env_or(env::LOG_ELASTIC_INDEX_PREFIX_ENV, &defaults.index_prefix),
        }
    }
}

/// Elasticsearch implementation of [`RemoteStore`] using the HTTP
/// document API.
#[derive(Clone)]
pub struct ElasticStore {
    client: Client,
    config: ElasticConfig,
}

impl ElasticStore {
    /// Construct a new store instance using the provided configuration.
    /// No connection is made until the first request.
    pub fn new(config: ElasticConfig) -> Self {
        ElasticStore {
            client: Client::new(),
            config,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for ElasticStore {
    async fn deliver(
        &self,
        index: &str,
        document: serde_json::Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut last_err: Box<dyn Error + Send + Sync> =
            "no elasticsearch hosts configured".into();

        for host in &self.config.hosts {
            let url = format!("{}/{}/_doc", host.trim_end_matches('/'), index);
            let request = self.authorized(self.client.post(&url).json(&document));
            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
                    last_err =
                        format!("Elasticsearch index request failed with status {}: {}", status, text)
                            .into();
                }
                Err(e) => last_err = Box::new(e),
            }
        }

        Err(last_err)
    }

    async fn ping(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut last_err: Box<dyn Error + Send + Sync> =
            "no elasticsearch hosts configured".into();

        for host in &self.config.hosts {
            let url = format!("{}/", host.trim_end_matches('/'));
            let request = self.authorized(self.client.get(&url));
            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    last_err = format!("Elasticsearch ping failed with status {}", resp.status()).into();
                }
                Err(e) => last_err = Box::new(e),
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_localhost() {
        let config = ElasticConfig::default();
        assert_eq!(config.hosts, vec!["http://localhost:9200".to_string()]);
        assert_eq!(config.index_prefix, "app-logs");
        assert!(config.username.is_none());
    }

    #[tokio::test]
    async fn unreachable_cluster_reports_an_error() {
        // Port 1 refuses connections; deliver must surface the error
        // rather than panic.
        let store = ElasticStore::new(ElasticConfig {
            hosts: vec!["http://127.0.0.1:1".to_string()],
            ..ElasticConfig::default()
        });
        let result = store
            .deliver("app-logs-2026.01.01", serde_json::json!({"message": "x"}))
            .await;
        assert!(result.is_err());
        assert!(store.ping().await.is_err());
    }
}
