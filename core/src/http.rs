//! HTTP transport types and the collaborator interface.
//!
//! # Design
//! Requests and responses are plain data. The mapper builds an `HttpRequest`,
//! hands it to a `Transport`, and interprets the returned `HttpResponse`; it
//! never opens a socket itself. Status codes are returned as data, not as
//! errors, so status interpretation stays in one place (`request.rs`).
//! A `TransportError` means no response was obtained at all.
//!
//! All fields use owned types so values can be logged, recorded and replayed.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    /// First value of the named query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// The transport failed before any HTTP response was received.
#[derive(Debug, Clone, Error)]
#[error("transport failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The HTTP collaborator.
///
/// Implementations execute one request and return whatever status the server
/// produced. Retries, timeouts and connection pooling are theirs to decide.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Acquire a reusable connection for a block of work. Transports without
    /// connection reuse return `None` and keep serving one-shot requests.
    fn open_session(&self) -> Option<Arc<dyn Transport>> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }

    fn open_session(&self) -> Option<Arc<dyn Transport>> {
        (**self).open_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse::json(200, &json!([])).with_header("X-WP-Total", "42");
        assert_eq!(response.header("x-wp-total"), Some("42"));
        assert_eq!(response.header("X-WP-TotalPages"), None);
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("http://localhost/wp-json/wp/v2/posts", "{}".to_string());
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn query_value_returns_first_match() {
        let req = HttpRequest::get(
            "http://localhost/posts",
            vec![
                ("context".to_string(), "view".to_string()),
                ("_embed".to_string(), "true".to_string()),
            ],
        );
        assert_eq!(req.query_value("_embed"), Some("true"));
        assert_eq!(req.query_value("page"), None);
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::json(201, &json!({})).is_success());
        assert!(!HttpResponse::json(404, &json!({})).is_success());
    }
}
