//! Quote proxy client.
//!
//! Owns one transport for its lifetime. Every fetch opens a client span,
//! bounds the call with the configured deadline, and counts failures.

use std::time::Duration;

use opentelemetry::trace::{SpanKind, Status, TraceContextExt};
use opentelemetry::{Context, KeyValue};

use crate::config::{QuoteConfig, TransportChoice};
use crate::observability::metrics;
use crate::observability::trace::Tracer;
use crate::quote::direct::DirectTransport;
use crate::quote::rpc::RpcTransport;
use crate::quote::types::{Quote, QuoteError, QuoteResult};
use crate::resilience::{with_deadline, DeadlineExceeded};

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
enum Transport {
    Direct(DirectTransport),
    RemoteProcedure(RpcTransport),
}

/// Fetches quotes from the backend over the configured transport.
#[derive(Clone, Debug)]
pub struct QuoteProxyClient {
    transport: Transport,
    tracer: Tracer,
    timeout: Duration,
}

impl QuoteProxyClient {
    /// Build the client for the transport chosen in `config`.
    pub fn from_config(config: &QuoteConfig, tracer: Tracer) -> Result<Self, QuoteError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match config.transport {
            TransportChoice::Direct => Self::direct(&config.http_url, timeout, tracer),
            TransportChoice::RemoteProcedure => {
                Self::remote_procedure(&config.grpc_address, timeout, tracer)
            }
        }
    }

    pub fn direct(url: &str, timeout: Duration, tracer: Tracer) -> Result<Self, QuoteError> {
        let transport = DirectTransport::new(url)?;
        tracing::info!(url = %url, timeout = ?timeout, "Quote client using direct transport");
        Ok(Self {
            transport: Transport::Direct(transport),
            tracer,
            timeout,
        })
    }

    pub fn remote_procedure(
        address: &str,
        timeout: Duration,
        tracer: Tracer,
    ) -> Result<Self, QuoteError> {
        let transport = RpcTransport::connect_lazy(address, timeout)?;
        tracing::info!(address = %address, timeout = ?timeout, "Quote client using gRPC transport");
        Ok(Self {
            transport: Transport::RemoteProcedure(transport),
            tracer,
            timeout,
        })
    }

    pub fn transport(&self) -> TransportChoice {
        match self.transport {
            Transport::Direct(_) => TransportChoice::Direct,
            Transport::RemoteProcedure(_) => TransportChoice::RemoteProcedure,
        }
    }

    pub fn endpoint(&self) -> &str {
        match &self.transport {
            Transport::Direct(t) => t.url(),
            Transport::RemoteProcedure(t) => t.address(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch one quote as a child span of `parent`.
    pub async fn fetch_quote(&self, parent: &Context) -> QuoteResult {
        let span_name = match self.transport {
            Transport::Direct(_) => "getQuote",
            Transport::RemoteProcedure(_) => "getQuoteGRPC",
        };
        let cx = self.tracer.start(
            span_name,
            SpanKind::Client,
            vec![
                KeyValue::new("http.method", "GET"),
                KeyValue::new("http.url", self.endpoint().to_string()),
            ],
            parent,
        );

        let outcome = match &self.transport {
            Transport::Direct(t) => with_deadline(self.timeout, t.fetch(&cx)).await,
            Transport::RemoteProcedure(t) => {
                with_deadline(self.timeout, t.fetch(&cx, self.timeout)).await
            }
        };
        let result = match outcome {
            Ok(result) => result,
            Err(DeadlineExceeded(deadline)) => Err(QuoteError::Timeout(deadline)),
        };

        let span = cx.span();
        match &result {
            Ok(_) => span.set_status(Status::Ok),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint(), error = %e, "Quote fetch failed");
                span.record_error(e);
                span.set_status(Status::error(e.to_string()));
                metrics::record_failure(e.failure_kind());
            }
        }
        span.end();

        result.map(|text| Quote { text })
    }
}
