use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use request_log_fanout::elastic::ElasticConfig;
use request_log_fanout::logger::{Logger, LoggerConfig};
use request_log_fanout::middleware::logging_middleware;

async fn ping(State(logger): State<Arc<Logger>>) -> &'static str {
    logger.info("ping received");
    "pong"
}

async fn debug_probe(State(logger): State<Arc<Logger>>) -> &'static str {
    logger.debug("debug level probe");
    "ok"
}

#[tokio::main]
async fn main() {
    let config = LoggerConfig {
        service_name: "demo-service".to_string(),
        environment: "development".to_string(),
        elastic: Some(ElasticConfig::from_env()),
        ..LoggerConfig::default()
    };
    let logger = Arc::new(Logger::new(config).expect("log directory must be writable"));

    // Startup hook: the process serves traffic even when the cluster is
    // unreachable, with local sinks only.
    logger.connect_remote().await;

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/debug", get(debug_probe))
        .layer(axum::middleware::from_fn_with_state(
            logger.clone(),
            logging_middleware,
        ))
        .with_state(logger.clone());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8081")
        .await
        .expect("bind listener");
    axum::serve(listener, app).await.expect("server error");
}
