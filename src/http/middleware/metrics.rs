//! Request count and latency by method, route and status class.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::http::response::route_label;
use crate::observability::metrics;

pub async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    metrics::record_request(&method, route_label(&response), response.status().as_u16(), start);
    response
}
