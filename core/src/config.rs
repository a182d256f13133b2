//! Building an `Api`: base URL, credentials and transport.

use url::Url;

use crate::api::Api;
use crate::auth::{Authenticator, BasicAuth};
use crate::error::{ApiError, Result};
use crate::http::Transport;
use crate::transport::UreqTransport;

pub const ENV_API_URL: &str = "WP_API_URL";
pub const ENV_USERNAME: &str = "WP_USERNAME";
pub const ENV_PASSWORD: &str = "WP_PASSWORD";

/// Configures and builds an [`Api`].
///
/// ```no_run
/// let api = wp_orm::ApiBuilder::new("https://example.com/wp-json/wp/v2/")
///     .basic_auth("admin", "application-password")
///     .build()?;
/// # Ok::<(), wp_orm::ApiError>(())
/// ```
pub struct ApiBuilder {
    base_url: String,
    authenticator: Option<Box<dyn Authenticator>>,
    transport: Option<Box<dyn Transport>>,
}

impl ApiBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authenticator: None,
            transport: None,
        }
    }

    /// Reads `WP_API_URL` (required) and `WP_USERNAME` / `WP_PASSWORD`
    /// (optional, both or neither).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = get(ENV_API_URL)
            .ok_or_else(|| ApiError::Configuration(format!("{ENV_API_URL} is not set")))?;
        let builder = Self::new(base_url);
        match (get(ENV_USERNAME), get(ENV_PASSWORD)) {
            (Some(username), Some(password)) => Ok(builder.basic_auth(username, password)),
            (None, None) => Ok(builder),
            _ => Err(ApiError::Configuration(format!(
                "{ENV_USERNAME} and {ENV_PASSWORD} must be set together"
            ))),
        }
    }

    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.authenticator(BasicAuth::new(username, password))
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Box::new(authenticator));
        self
    }

    /// Replace the default `ureq` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn build(self) -> Result<Api> {
        let base_url = normalize_base_url(&self.base_url)?;
        tracing::debug!(%base_url, authenticated = self.authenticator.is_some(), "building API");
        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UreqTransport::new()) as Box<dyn Transport>);
        Ok(Api::from_parts(base_url, self.authenticator, transport))
    }
}

/// Parse an http(s) URL and make sure it ends with `/`.
fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::Configuration(format!("invalid base url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Configuration(format!(
            "base url must use http or https, not '{}'",
            url.scheme()
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ApiError::Configuration(format!(
            "base url '{raw}' must not carry a query or fragment"
        )));
    }
    let mut base = url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn base_url_gets_a_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8080/wp-json/wp/v2").unwrap(),
            "http://localhost:8080/wp-json/wp/v2/"
        );
        assert_eq!(
            normalize_base_url("https://example.com/wp-json/wp/v2/").unwrap(),
            "https://example.com/wp-json/wp/v2/"
        );
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(matches!(
            normalize_base_url("ftp://example.com/"),
            Err(ApiError::Configuration(_))
        ));
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("http://example.com/?rest_route=/").is_err());
    }

    #[test]
    fn env_needs_the_url() {
        let err = ApiBuilder::from_lookup(env(&[])).err().unwrap();
        assert!(err.to_string().contains(ENV_API_URL));
    }

    #[test]
    fn env_credentials_come_in_pairs() {
        let half = env(&[(ENV_API_URL, "http://wp.test/"), (ENV_USERNAME, "admin")]);
        assert!(ApiBuilder::from_lookup(half).is_err());

        let full = env(&[
            (ENV_API_URL, "http://wp.test/"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "secret"),
        ]);
        let builder = ApiBuilder::from_lookup(full).unwrap();
        assert!(builder.authenticator.is_some());
        assert_eq!(builder.build().unwrap().base_url(), "http://wp.test/");
    }
}
