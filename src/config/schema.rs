//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the edge server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Top level directory holding one sub-directory per site.
    pub data_dir: PathBuf,

    /// Virtual hosts served by this process.
    pub sites: Vec<SiteConfig>,

    /// Quote backend settings.
    pub quote: QuoteConfig,

    /// External message feed settings.
    pub feed: FeedConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Process lifecycle settings.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// A virtual host. The apex redirects to `www.`, every single-label
/// subdomain serves files from `data_dir/domain`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Apex domain, e.g. "example.com".
    pub domain: String,

    /// Expose `/quote` on this site's subdomains.
    #[serde(default = "default_true")]
    pub quote: bool,

    /// Expose the feed drain endpoint on `www.{domain}/kafka`.
    #[serde(default)]
    pub feed: bool,
}

impl SiteConfig {
    /// Site with the default opt-ins (quote on, feed off).
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            quote: true,
            feed: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which wire protocol the quote client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportChoice {
    /// Plain HTTP GET against `http_url`.
    Direct,
    /// Unary gRPC call against `grpc_address`.
    #[default]
    RemoteProcedure,
}

impl std::str::FromStr for TransportChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" | "http" => Ok(TransportChoice::Direct),
            "remote_procedure" | "grpc" => Ok(TransportChoice::RemoteProcedure),
            other => Err(format!("unknown quote transport: {}", other)),
        }
    }
}

/// Quote backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Build the quote client and register `/quote` routes.
    pub enabled: bool,

    /// Transport, fixed for the lifetime of the process.
    pub transport: TransportChoice,

    /// URL fetched by the direct transport.
    pub http_url: String,

    /// Endpoint dialled by the remote-procedure transport.
    pub grpc_address: String,

    /// Per-call deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: TransportChoice::RemoteProcedure,
            http_url: "http://localhost:8080".to_string(),
            grpc_address: "http://localhost:8081".to_string(),
            timeout_secs: 30,
        }
    }
}

/// External feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Start the ingestor and register drain routes.
    pub enabled: bool,

    /// Broker address (host:port).
    pub broker: String,

    /// Topic subscribed to.
    pub topic: String,

    /// Consumer group. A fresh one per process when unset.
    pub group_id: String,

    /// Where a new consumer group starts reading (`earliest` or `latest`).
    pub offset_reset: String,

    /// Capacity of the queue between the feed and request handlers.
    pub queue_capacity: usize,

    /// Base delay for backoff after feed read errors in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: "localhost:9092".to_string(),
            topic: "otlp_spans".to_string(),
            group_id: uuid::Uuid::new_v4().to_string(),
            offset_reset: "earliest".to_string(),
            queue_capacity: 10,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where finished spans are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanExporterChoice {
    /// Spans propagate but are not exported.
    #[default]
    None,
    Stdout,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Application log format.
    pub log_format: LogFormat,

    /// Write access log lines.
    pub access_log: bool,

    /// Directory for the `access_log` file. Stdout when unset.
    pub log_dir: Option<PathBuf>,

    /// Install the Prometheus recorder behind `/metrics`.
    pub metrics_enabled: bool,

    /// Span exporter.
    pub span_exporter: SpanExporterChoice,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            access_log: true,
            log_dir: None,
            metrics_enabled: true,
            span_exporter: SpanExporterChoice::None,
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests may run after a shutdown signal.
    pub graceful_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            graceful_timeout_secs: 5,
        }
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            data_dir: PathBuf::from("data/hosts"),
            sites: Vec::new(),
            quote: QuoteConfig::default(),
            feed: FeedConfig::default(),
            observability: ObservabilityConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EdgeConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("data/hosts"));
        assert_eq!(config.quote.transport, TransportChoice::RemoteProcedure);
        assert_eq!(config.quote.timeout_secs, 30);
        assert_eq!(config.feed.queue_capacity, 10);
        assert!(!config.feed.enabled);
        assert_eq!(config.feed.topic, "otlp_spans");
        assert_eq!(config.feed.offset_reset, "earliest");
        assert_eq!(config.observability.span_exporter, SpanExporterChoice::None);
        assert_eq!(config.lifecycle.graceful_timeout_secs, 5);
    }

    #[test]
    fn test_partial_toml() {
        let config: EdgeConfig = toml::from_str(
            r#"
            data_dir = "/srv/hosts"

            [[sites]]
            domain = "example.com"
            feed = true

            [quote]
            transport = "direct"
            http_url = "http://quotes.internal:8080"

            [observability]
            span_exporter = "stdout"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/hosts"));
        assert_eq!(config.sites.len(), 1);
        assert!(config.sites[0].quote);
        assert!(config.sites[0].feed);
        assert_eq!(config.quote.transport, TransportChoice::Direct);
        assert_eq!(config.quote.timeout_secs, 30);
        assert_eq!(config.observability.span_exporter, SpanExporterChoice::Stdout);
    }

    #[test]
    fn test_empty_toml_keeps_data_dir_default() {
        let config: EdgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data/hosts"));
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("grpc".parse::<TransportChoice>(), Ok(TransportChoice::RemoteProcedure));
        assert_eq!("direct".parse::<TransportChoice>(), Ok(TransportChoice::Direct));
        assert!("carrier-pigeon".parse::<TransportChoice>().is_err());
    }
}
