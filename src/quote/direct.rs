//! Direct transport: a plain HTTP GET against the quote backend.

use axum::body::Body;
use axum::http::{header, Method, Request, Response, Uri};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};

use crate::observability::trace;
use crate::quote::types::QuoteError;

/// Pooled HTTP client bound to one backend URL.
#[derive(Clone, Debug)]
pub struct DirectTransport {
    client: Client<HttpConnector, Body>,
    uri: Uri,
    url: String,
}

impl DirectTransport {
    /// Validate the URL and build the shared connection pool.
    pub fn new(url: &str) -> Result<Self, QuoteError> {
        let invalid = |reason: &str| QuoteError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: reason.to_string(),
        };
        let uri: Uri = url.parse().map_err(|_| invalid("not a URI"))?;
        if uri.scheme_str() != Some("http") {
            return Err(invalid("scheme must be http"));
        }
        if uri.authority().is_none() {
            return Err(invalid("missing host"));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            uri,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one GET, propagating the span in `cx`.
    pub async fn fetch(&self, cx: &Context) -> Result<String, QuoteError> {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .header(header::USER_AGENT, concat!("web-edge/", env!("CARGO_PKG_VERSION")))
            .body(Body::empty())
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;
        trace::inject(cx, request.headers_mut());

        let span = cx.span();
        span.add_event("Retrieving quote (via http)", Vec::new());
        let response: Response<Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;
        span.add_event("Retrieved quote", Vec::new());

        let status = response.status();
        span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?
            .to_bytes();
        String::from_utf8(body.to_vec()).map_err(|_| QuoteError::InvalidBody)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            DirectTransport::new("https://quotes.example.com"),
            Err(QuoteError::InvalidEndpoint { .. })
        ));
        assert!(DirectTransport::new("localhost:8080").is_err());
        assert!(DirectTransport::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_accepts_http_url() {
        let transport = DirectTransport::new("http://127.0.0.1:8080/quote").unwrap();
        assert_eq!(transport.url(), "http://127.0.0.1:8080/quote");
    }
}
