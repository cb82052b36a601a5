//! web-edge binary.
//!
//! Loads configuration, applies command-line overrides, serves until SIGINT
//! or SIGTERM, then drains in-flight requests within the grace period.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use web_edge::config::loader::load_config;
use web_edge::config::{EdgeConfig, SiteConfig, TransportChoice};
use web_edge::lifecycle::{drain_within, wait_for_signal, Shutdown};
use web_edge::observability::logging::init_logging;
use web_edge::observability::Tracer;
use web_edge::EdgeServer;

#[derive(Parser, Debug)]
#[command(name = "web-edge", version, about = "Multi-tenant edge server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WEB_EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long)]
    listen_address: Option<String>,

    /// Top level directory for site files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for the access log; stdout when unset
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Serve a site (repeatable)
    #[arg(long = "site")]
    sites: Vec<String>,

    /// Enable the feed ingestor and /kafka drain
    #[arg(long)]
    enable_feed: bool,

    /// Feed broker address
    #[arg(long)]
    feed_broker: Option<String>,

    /// Quote backend transport: direct or grpc
    #[arg(long)]
    quote_transport: Option<TransportChoice>,

    /// Quote backend URL for the direct transport
    #[arg(long)]
    quote_http_url: Option<String>,

    /// Quote backend address for the gRPC transport
    #[arg(long)]
    quote_grpc_address: Option<String>,
}

impl Args {
    fn apply(self, config: &mut EdgeConfig) {
        if let Some(addr) = self.listen_address {
            config.listener.bind_address = addr;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.log_dir {
            config.observability.log_dir = Some(dir);
        }
        for domain in self.sites {
            if !config.sites.iter().any(|s| s.domain.eq_ignore_ascii_case(&domain)) {
                config.sites.push(SiteConfig {
                    feed: self.enable_feed,
                    ..SiteConfig::new(domain)
                });
            }
        }
        if self.enable_feed {
            config.feed.enabled = true;
        }
        if let Some(broker) = self.feed_broker {
            config.feed.broker = broker;
        }
        if let Some(transport) = self.quote_transport {
            config.quote.transport = transport;
        }
        if let Some(url) = self.quote_http_url {
            config.quote.http_url = url;
        }
        if let Some(address) = self.quote_grpc_address {
            config.quote.grpc_address = address;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    args.apply(&mut config);

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "web-edge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        sites = config.sites.len(),
        quote_enabled = config.quote.enabled,
        feed_enabled = config.feed.enabled,
        "Configuration loaded"
    );

    let grace = Duration::from_secs(config.lifecycle.graceful_timeout_secs);
    let tracer = Tracer::from_config(&config.observability);
    let server = EdgeServer::with_tracer(config.clone(), tracer.clone())?;

    // bind last: traffic only once everything else is ready
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        signal = wait_for_signal() => {
            let name = signal?;
            tracing::info!(signal = name, "Signal received");
        }
        result = &mut server_task => {
            tracer.shutdown();
            result??;
            tracing::warn!("Server stopped without a shutdown signal");
            return Ok(());
        }
    }

    shutdown.trigger();
    if drain_within(grace, server_task).await {
        tracing::info!("Shutdown complete");
    }
    tracer.shutdown();
    Ok(())
}
