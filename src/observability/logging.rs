//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the application log subscriber
//! - Open the access log sink (stdout, file, or disabled)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level
//! - Access log lines are not tracing events: they go verbatim to their own sink

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Initialize the global tracing subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("web_edge={0},tower_http={0}", config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_file(true).with_line_number(true))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}

/// Destination for access log lines.
#[derive(Clone)]
pub struct AccessLogSink {
    writer: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
}

impl AccessLogSink {
    /// Open the sink described by the configuration.
    ///
    /// `log_dir` unset means stdout; set means `{log_dir}/access_log`, appended.
    pub fn from_config(config: &ObservabilityConfig) -> io::Result<Self> {
        if !config.access_log {
            tracing::info!("Access logging disabled");
            return Ok(Self::disabled());
        }
        match &config.log_dir {
            None => {
                tracing::info!("Access logging to stdout");
                Ok(Self::to_writer(io::stdout()))
            }
            Some(dir) => {
                let path = dir.join("access_log");
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                tracing::info!(path = %path.display(), "Access logging to file");
                Ok(Self::to_writer(file))
            }
        }
    }

    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Write one line. Errors are logged, never propagated to the request.
    pub fn write_line(&self, line: &str) {
        let Some(writer) = &self.writer else {
            return;
        };
        let mut writer = match writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "Failed to write access log line");
        }
    }
}

impl std::fmt::Debug for AccessLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogSink")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// In-memory writer, handy for inspecting access log output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("buffer mutex poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer mutex poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
