//! Concrete `Transport` implementations.
//!
//! `UreqTransport` talks to a real server. Without a session every request
//! gets its own one-shot agent; `open_session` hands out an agent that keeps
//! its connection pool for the lifetime of the session.
//!
//! `ScriptedTransport` replays canned responses and records every request it
//! receives, so tests can assert on call counts without a server.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// Blocking HTTP transport backed by `ureq`.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        execute_with(&new_agent(), request)
    }

    fn open_session(&self) -> Option<Arc<dyn Transport>> {
        Some(Arc::new(UreqSession { agent: new_agent() }))
    }
}

/// A pooled `ureq` agent shared by every request issued while a session is open.
struct UreqSession {
    agent: ureq::Agent,
}

impl Transport for UreqSession {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        execute_with(&self.agent, request)
    }
}

/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses come back as data.
fn new_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

fn execute_with(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let result = match request.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&request.url);
            for (key, value) in &request.query {
                builder = builder.query(key, value);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&request.url);
            for (key, value) in &request.query {
                builder = builder.query(key, value);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match &request.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError::new(e.to_string()))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

struct Route {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    response: HttpResponse,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        let path_matches = request.url == self.path
            || request
                .url
                .strip_suffix(self.path.as_str())
                .is_some_and(|prefix| prefix.ends_with('/'));
        self.method == request.method
            && path_matches
            && self
                .query
                .iter()
                .all(|(key, value)| request.query_value(key) == Some(value.as_str()))
    }
}

/// Transport that answers from a table of canned responses.
///
/// A route matches on method, on the URL ending with the route's path
/// (segment-aligned), and on every query pair the route names. When several
/// routes match, the one naming the most query pairs wins. Unmatched requests
/// get the server's 404 `rest_no_route` body.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: HttpMethod, path: &str, query: &[(&str, &str)], response: HttpResponse) -> &Self {
        self.routes.lock().push(Route {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response,
        });
        self
    }

    pub fn on_get(&self, path: &str, response: HttpResponse) -> &Self {
        self.on(HttpMethod::Get, path, &[], response)
    }

    pub fn on_post(&self, path: &str, response: HttpResponse) -> &Self {
        self.on(HttpMethod::Post, path, &[], response)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().push(request.clone());
        let routes = self.routes.lock();
        let response = routes
            .iter()
            .filter(|route| route.matches(request))
            .max_by_key(|route| route.query.len())
            .map(|route| route.response.clone())
            .unwrap_or_else(|| {
                HttpResponse::json(
                    404,
                    &json!({
                        "code": "rest_no_route",
                        "message": "No route was found matching the URL and request method.",
                        "data": {"status": 404}
                    }),
                )
            });
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_routes_match_on_segment_boundaries() {
        let transport = ScriptedTransport::new();
        transport.on_get("posts/7", HttpResponse::json(200, &json!({"id": 7})));

        let hit = transport
            .execute(&HttpRequest::get("http://wp.test/wp-json/wp/v2/posts/7", Vec::new()))
            .unwrap();
        assert_eq!(hit.status, 200);

        let miss = transport
            .execute(&HttpRequest::get("http://wp.test/wp-json/wp/v2/posts/77", Vec::new()))
            .unwrap();
        assert_eq!(miss.status, 404);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn most_specific_query_route_wins() {
        let transport = ScriptedTransport::new();
        transport
            .on_get("posts", HttpResponse::json(200, &json!([])))
            .on(
                HttpMethod::Get,
                "posts",
                &[("slug", "hello")],
                HttpResponse::json(200, &json!([{"id": 7}])),
            );

        let req = HttpRequest::get(
            "http://wp.test/posts",
            vec![("slug".to_string(), "hello".to_string())],
        );
        assert_eq!(transport.execute(&req).unwrap().body, r#"[{"id":7}]"#);

        let req = HttpRequest::get("http://wp.test/posts", Vec::new());
        assert_eq!(transport.execute(&req).unwrap().body, "[]");
    }

    #[test]
    fn method_must_match() {
        let transport = ScriptedTransport::new();
        transport.on_post("posts", HttpResponse::json(201, &json!({"id": 1})));
        let req = HttpRequest::get("http://wp.test/posts", Vec::new());
        assert_eq!(transport.execute(&req).unwrap().status, 404);
        assert_eq!(transport.requests()[0].method, HttpMethod::Get);
    }

    #[test]
    fn ureq_transport_offers_sessions() {
        assert!(UreqTransport::new().open_session().is_some());
        assert!(ScriptedTransport::new().open_session().is_none());
    }
}
