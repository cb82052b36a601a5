//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state (route table, quote client, feed queue, metrics)
//! - Create the Axum router with a single dispatch fallback
//! - Wire up the middleware pipeline, limits and request ID
//! - Spawn the feed ingestor next to the server
//! - Serve until the shutdown signal, then drain

use axum::Router;
use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::{validate_config, ValidationError};
use crate::config::EdgeConfig;
use crate::feed::{BoundedQueue, FeedIngestor, FeedSource, KafkaFeed, DEFAULT_CAPACITY};
use crate::http::handlers;
use crate::http::middleware::{self, PipelineState};
use crate::http::request::RequestIdLayer;
use crate::observability::logging::AccessLogSink;
use crate::observability::metrics;
use crate::observability::trace::Tracer;
use crate::quote::{QuoteError, QuoteProxyClient};
use crate::routing::HostRouter;

/// Fatal errors while assembling the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("quote backend: {0}")]
    Quote(#[from] QuoteError),

    #[error("access log: {0}")]
    AccessLog(#[source] std::io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything handlers share, built once at startup.
pub struct AppContext {
    pub config: EdgeConfig,
    pub router: HostRouter,
    pub quote_client: Option<QuoteProxyClient>,
    pub feed_queue: Arc<BoundedQueue<Bytes>>,
    pub metrics: Option<PrometheusHandle>,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppContext>,
}

/// HTTP server for the edge.
pub struct EdgeServer {
    router: Router,
    state: AppState,
}

impl EdgeServer {
    /// Create a server exporting spans as configured.
    pub fn new(config: EdgeConfig) -> Result<Self, StartupError> {
        let tracer = Tracer::from_config(&config.observability);
        Self::with_tracer(config, tracer)
    }

    /// Create a server exporting spans through `tracer`.
    pub fn with_tracer(config: EdgeConfig, tracer: Tracer) -> Result<Self, StartupError> {
        let access_log =
            AccessLogSink::from_config(&config.observability).map_err(StartupError::AccessLog)?;
        Self::build(config, tracer, access_log)
    }

    /// Assemble the server from explicit parts.
    pub fn build(
        config: EdgeConfig,
        tracer: Tracer,
        access_log: AccessLogSink,
    ) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::InvalidConfig)?;

        let router = HostRouter::from_config(&config);
        tracing::info!(routes = router.routes().len(), sites = config.sites.len(), "Route table built");

        let quote_client = if config.quote.enabled {
            Some(QuoteProxyClient::from_config(&config.quote, tracer.clone())?)
        } else {
            None
        };

        let capacity = if config.feed.enabled {
            config.feed.queue_capacity
        } else {
            DEFAULT_CAPACITY
        };
        let feed_queue = Arc::new(BoundedQueue::new(capacity.max(1)));

        let metrics = if config.observability.metrics_enabled {
            metrics::init_metrics()
        } else {
            None
        };

        let pipeline = PipelineState { tracer, access_log };
        let state = AppState {
            inner: Arc::new(AppContext {
                router,
                quote_client,
                feed_queue,
                metrics,
                config,
            }),
        };
        let router = Self::build_router(&state, pipeline);

        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState, pipeline: PipelineState) -> Router {
        let listener = &state.inner.config.listener;
        let app = Router::new()
            .fallback(handlers::dispatch)
            .with_state(state.clone())
            .layer(RequestBodyLimitLayer::new(listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(listener.request_timeout_secs)));

        middleware::wrap(app, pipeline)
            .layer(TraceLayer::new_for_http())
            .layer(RequestIdLayer)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn feed_queue(&self) -> Arc<BoundedQueue<Bytes>> {
        Arc::clone(&self.state.inner.feed_queue)
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// When the feed is enabled, the configured Kafka topic is consumed in
    /// the background.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let feed = {
            let feed_config = &self.state.inner.config.feed;
            feed_config.enabled.then(|| KafkaFeed::new(feed_config))
        };
        self.run_with_feed(listener, feed, shutdown).await
    }

    /// Serve with an explicit feed source.
    pub async fn run_with_feed<S>(
        self,
        listener: TcpListener,
        feed: Option<S>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error>
    where
        S: FeedSource + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let ingestor = feed.map(|source| {
            let ingestor = FeedIngestor::new(
                source,
                Arc::clone(&self.state.inner.feed_queue),
                &self.state.inner.config.feed,
            );
            tokio::spawn(ingestor.run(shutdown.resubscribe()))
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(handle) = ingestor {
            match handle.await {
                Ok(stats) => tracing::debug!(?stats, "Feed ingestor joined"),
                Err(e) => tracing::error!(error = %e, "Feed ingestor task failed"),
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mut config = EdgeConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        let result = EdgeServer::build(config, Tracer::default(), AccessLogSink::disabled());
        assert!(matches!(result, Err(StartupError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_quote_endpoint() {
        let mut config = EdgeConfig::default();
        config.quote.grpc_address = "::not a uri::".to_string();
        let result = EdgeServer::build(config, Tracer::default(), AccessLogSink::disabled());
        assert!(matches!(result, Err(StartupError::Quote(_))));
    }

    #[tokio::test]
    async fn test_disabled_feed_still_has_queue() {
        let mut config = EdgeConfig::default();
        config.sites.push(SiteConfig::new("example.com"));
        config.feed.queue_capacity = 0;
        let server = EdgeServer::build(config, Tracer::default(), AccessLogSink::disabled()).unwrap();
        assert_eq!(server.feed_queue().capacity(), DEFAULT_CAPACITY);
    }
}
