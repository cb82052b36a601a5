//! Response helpers.
//!
//! Handlers tag their response with the name of the route that produced it
//! so outer middleware (metrics) can label by route without re-dispatching.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Name of the route that handled the request, carried on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute(pub String);

/// Label used when a response carries no route (panics, timeouts).
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Route label for metrics.
pub fn route_label(response: &Response) -> &str {
    response
        .extensions()
        .get::<MatchedRoute>()
        .map(|r| r.0.as_str())
        .unwrap_or(UNMATCHED_ROUTE)
}

/// Attach the route name to a response.
pub fn with_route(mut response: Response, route: &str) -> Response {
    response.extensions_mut().insert(MatchedRoute(route.to_string()));
    response
}

/// `text/plain` body.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// `text/html` body.
pub fn html(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = (status, body.into()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Permanent redirect.
pub fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => {
            tracing::error!(location = %location, "Redirect target is not a valid header value");
            text(StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect target")
        }
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label() {
        let response = text(StatusCode::OK, "ok");
        assert_eq!(route_label(&response), UNMATCHED_ROUTE);

        let response = with_route(response, "healthz");
        assert_eq!(route_label(&response), "healthz");
    }

    #[test]
    fn test_redirect() {
        let response = moved_permanently("https://www.example.com/");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "https://www.example.com/");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_html_content_type() {
        let response = html(StatusCode::OK, "<p>x</p>");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
