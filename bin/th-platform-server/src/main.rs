//! TopicHub Platform Server
//!
//! Production server for the topic APIs:
//! - Topics: create, list, lookup, rename
//! - Membership: add and remove subscribers
//! - Triggers: enqueue workflow jobs for a topic's subscribers
//! - Monitoring: health, readiness, Prometheus metrics, queue depths
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TH_API_PORT` | `8080` | HTTP API port |
//! | `TH_METRICS_PORT` | `9090` | Metrics/health port |
//! | `TH_STORAGE` | `memory` | Topic storage: `memory` or `mongo` |
//! | `TH_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `TH_MONGO_DB` | `topichub` | MongoDB database name |
//! | `TH_QUEUE_BACKEND` | `embedded` | Queue broker: `embedded` or `sqs` (feature `sqs`) |
//! | `TH_SQS_QUEUE_URL_PREFIX` | - | SQS queue URL prefix, the queue name is appended |
//! | `TH_QUEUE_CAPACITY` | `10000` | Embedded broker capacity per queue |
//! | `TH_ENQUEUE_TIMEOUT_MS` | `5000` | Broker acknowledgement timeout |
//! | `TH_LOG_FORMAT` | `text` | `text` or `json` |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;
use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};
use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use th_common::logging::{self, LogFormat};
use th_common::JobTopicName;
use th_platform::api::{topics_router, PlatformApiDoc, TopicsState};
use th_platform::repository::{ensure_indexes, InMemoryTopicRepository, MongoTopicRepository, TopicRepository};
use th_platform::validation::QueryValidator;
use th_queue::{EmbeddedQueue, EmbeddedQueueConfig, QueueConsumer, QueuePublisher};
use th_router::{JobTopicRouter, RouterConfig};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone)]
struct MetricsState {
    prometheus: PrometheusHandle,
    embedded_queue: Option<Arc<EmbeddedQueue>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(LogFormat::parse(&env_or("TH_LOG_FORMAT", "text")));

    info!("Starting TopicHub Platform Server");

    // Configuration from environment
    let api_port: u16 = env_or_parse("TH_API_PORT", 8080);
    let metrics_port: u16 = env_or_parse("TH_METRICS_PORT", 9090);
    let storage = env_or("TH_STORAGE", "memory");
    let queue_backend = env_or("TH_QUEUE_BACKEND", "embedded");
    let router_config = RouterConfig {
        enqueue_timeout_ms: env_or_parse("TH_ENQUEUE_TIMEOUT_MS", RouterConfig::default().enqueue_timeout_ms),
    };

    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let repo = build_repository(&storage).await?;
    let (publisher, embedded_queue) = build_publisher(&queue_backend).await?;
    info!(broker = publisher.identifier(), enqueue_timeout_ms = router_config.enqueue_timeout_ms, "Job router ready");

    let job_router = Arc::new(JobTopicRouter::new(publisher, router_config));
    let topics_state = TopicsState::new(repo, job_router, QueryValidator::default());

    // Build platform API router
    let app = Router::new()
        .merge(topics_router(topics_state))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", PlatformApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    // Start API server
    let api_addr = format!("0.0.0.0:{}", api_port);
    info!("API server listening on http://{}", api_addr);

    let api_listener = TcpListener::bind(&api_addr).await?;
    let api_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(api_listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // Start metrics server
    let metrics_addr = format!("0.0.0.0:{}", metrics_port);
    info!("Metrics server listening on http://{}/metrics", metrics_addr);

    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/monitoring/queues", get(queues_handler))
        .with_state(MetricsState {
            prometheus,
            embedded_queue: embedded_queue.clone(),
        });

    let metrics_listener = TcpListener::bind(&metrics_addr).await?;
    let metrics_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
            error!(error = %e, "Metrics server failed");
        }
    });

    info!("TopicHub Platform Server started");
    info!("Press Ctrl+C to shutdown");

    // Wait for shutdown
    shutdown_signal().await;
    info!("Shutdown signal received...");

    if let Some(queue) = embedded_queue {
        queue.close();
    }
    api_task.abort();
    metrics_task.abort();

    info!("TopicHub Platform Server shutdown complete");
    Ok(())
}

async fn build_repository(storage: &str) -> Result<Arc<dyn TopicRepository>> {
    match storage {
        "mongo" => {
            let mongo_url = env_or("TH_MONGO_URL", "mongodb://localhost:27017");
            let mongo_db = env_or("TH_MONGO_DB", "topichub");

            info!("Connecting to MongoDB: {}/{}", mongo_url, mongo_db);
            let client = mongodb::Client::with_uri_str(&mongo_url).await?;
            let db = client.database(&mongo_db);
            ensure_indexes(&db).await?;
            Ok(Arc::new(MongoTopicRepository::new(&db)))
        }
        other => {
            if other != "memory" {
                warn!(storage = other, "Unknown TH_STORAGE, using in-memory storage");
            }
            info!("Using in-memory topic storage");
            Ok(Arc::new(InMemoryTopicRepository::new()))
        }
    }
}

async fn build_publisher(backend: &str) -> Result<(Arc<dyn QueuePublisher>, Option<Arc<EmbeddedQueue>>)> {
    if backend == "sqs" {
        #[cfg(feature = "sqs")]
        {
            let prefix = std::env::var("TH_SQS_QUEUE_URL_PREFIX")
                .map_err(|_| anyhow::anyhow!("TH_SQS_QUEUE_URL_PREFIX is required for the sqs backend"))?;
            info!(queue_url_prefix = %prefix, "Using SQS queue broker");
            let publisher: Arc<dyn QueuePublisher> = Arc::new(th_queue::SqsPublisher::from_env(prefix).await);
            return Ok((publisher, None));
        }

        #[cfg(not(feature = "sqs"))]
        anyhow::bail!("TH_QUEUE_BACKEND=sqs requires building with the `sqs` feature");
    }

    let config = EmbeddedQueueConfig {
        capacity_per_queue: env_or_parse("TH_QUEUE_CAPACITY", EmbeddedQueueConfig::default().capacity_per_queue),
    };
    info!(capacity_per_queue = config.capacity_per_queue, "Using embedded queue broker");
    let queue = Arc::new(EmbeddedQueue::new(config));
    let publisher: Arc<dyn QueuePublisher> = queue.clone();
    Ok((publisher, Some(queue)))
}

async fn metrics_handler(State(state): State<MetricsState>) -> String {
    state.prometheus.render()
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "READY"
    }))
}

/// Pending messages per physical queue on the embedded broker
async fn queues_handler(State(state): State<MetricsState>) -> Json<serde_json::Value> {
    let Some(queue) = state.embedded_queue else {
        return Json(serde_json::json!({ "broker": "external", "queues": {} }));
    };

    let mut depths = serde_json::Map::new();
    for name in JobTopicName::ALL {
        let pending = queue.pending(name.queue_name()).await.unwrap_or(0);
        depths.insert(name.queue_name().to_string(), serde_json::json!(pending));
    }
    Json(serde_json::json!({
        "broker": queue.identifier(),
        "closed": queue.is_closed(),
        "queues": depths
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
