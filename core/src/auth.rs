//! Pluggable request authentication.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretBox};

use crate::http::HttpRequest;

/// Decorates outgoing requests with credentials.
pub trait Authenticator: Send + Sync {
    fn authorize(&self, request: &mut HttpRequest);
}

/// HTTP basic authentication, e.g. with a WordPress application password.
///
/// The password is kept in a `SecretBox` so it never shows up in `Debug`
/// output or logs.
#[derive(Debug)]
pub struct BasicAuth {
    username: String,
    password: SecretBox<String>,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretBox::new(Box::new(password.into())),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password.expose_secret());
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl Authenticator for BasicAuth {
    fn authorize(&self, request: &mut HttpRequest) {
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        request
            .headers
            .push(("authorization".to_string(), self.header_value()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_credentials() {
        let auth = BasicAuth::new("admin", "secret");
        let mut req = HttpRequest::get("http://wp.test/users", Vec::new());
        auth.authorize(&mut req);
        // base64("admin:secret")
        assert_eq!(req.header("Authorization"), Some("Basic YWRtaW46c2VjcmV0"));
    }

    #[test]
    fn authorize_replaces_existing_header() {
        let auth = BasicAuth::new("a", "b");
        let mut req = HttpRequest::get("http://wp.test/users", Vec::new());
        req.headers
            .push(("Authorization".to_string(), "Bearer stale".to_string()));
        auth.authorize(&mut req);
        assert_eq!(req.headers.len(), 1);
        assert!(req.header("authorization").unwrap().starts_with("Basic "));
    }

    #[test]
    fn debug_output_hides_password() {
        let auth = BasicAuth::new("admin", "hunter2");
        assert!(!format!("{auth:?}").contains("hunter2"));
    }
}
