//! Remote-procedure transport: a unary gRPC call to `quote.Quote/GetQuote`.
//!
//! The service has a single method taking an empty request and answering
//! with the quote text. Messages are declared by hand so no build step is
//! needed.

use std::time::Duration;

use opentelemetry::propagation::Injector;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

use crate::observability::trace;
use crate::quote::types::QuoteError;

/// Fully-qualified method path.
pub const GET_QUOTE_PATH: &str = "/quote.Quote/GetQuote";

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetQuoteRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetQuoteResponse {
    #[prost(string, tag = "1")]
    pub quote_text: String,
}

/// Carrier writing propagation fields into request metadata.
pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let key = MetadataKey::from_bytes(key.as_bytes());
        let value = MetadataValue::try_from(value.as_str());
        if let (Ok(key), Ok(value)) = (key, value) {
            self.0.insert(key, value);
        }
    }
}

/// Lazily connected channel to the quote service.
#[derive(Clone, Debug)]
pub struct RpcTransport {
    channel: Channel,
    address: String,
}

impl RpcTransport {
    /// Build the channel. The connection is made on first use.
    pub fn connect_lazy(address: &str, connect_timeout: Duration) -> Result<Self, QuoteError> {
        let endpoint = Endpoint::from_shared(address.to_string())
            .map_err(|e| QuoteError::InvalidEndpoint {
                endpoint: address.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(connect_timeout);

        Ok(Self {
            channel: endpoint.connect_lazy(),
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Call `GetQuote`, propagating the span in `cx` as metadata.
    pub async fn fetch(&self, cx: &Context, deadline: Duration) -> Result<String, QuoteError> {
        let span = cx.span();
        span.set_attribute(KeyValue::new("rpc.system", "grpc"));
        span.set_attribute(KeyValue::new("rpc.service", "quote.Quote"));
        span.set_attribute(KeyValue::new("rpc.method", "GetQuote"));

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| QuoteError::Unavailable(format!("could not get quote: {}", e)))?;

        let mut request = tonic::Request::new(GetQuoteRequest {});
        request.set_timeout(deadline);
        trace::inject_with(cx, &mut MetadataInjector(request.metadata_mut()));

        span.add_event("Retrieving quote (via grpc)", Vec::new());
        let codec: ProstCodec<GetQuoteRequest, GetQuoteResponse> = ProstCodec::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(GET_QUOTE_PATH), codec)
            .await
            .map_err(|status| status_to_error(status, deadline))?;
        span.add_event("Retrieved quote", Vec::new());

        Ok(response.into_inner().quote_text)
    }
}

fn status_to_error(status: tonic::Status, deadline: Duration) -> QuoteError {
    match status.code() {
        Code::DeadlineExceeded => QuoteError::Timeout(deadline),
        Code::Unavailable => {
            QuoteError::Unavailable(format!("could not get quote: {}", status.message()))
        }
        code => QuoteError::Rpc {
            code: format!("{:?}", code),
            message: status.message().to_string(),
        },
    }
}
