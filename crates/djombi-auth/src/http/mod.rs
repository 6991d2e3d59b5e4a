//! HTTP plumbing shared by the profile and email services.
//!
//! Services talk to a [`Transport`] rather than to `reqwest` directly so
//! tests can script responses and count calls. [`ReqwestTransport`] is the
//! production implementation; [`AuthorizedClient`] layers bearer auth and
//! the 401 refresh-and-retry policy on top.

mod client;

pub use client::AuthorizedClient;

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL without the query string.
    pub url: Url,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request headers, in order.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` request.
    #[must_use]
    pub const fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Creates a `PUT` request.
    #[must_use]
    pub const fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Creates a `DELETE` request.
    #[must_use]
    pub const fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets a header, replacing any header of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns a query parameter's value.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a header's value (case-insensitive name).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the bearer token, if one is attached.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header_value("Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A response with its body read to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parses the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The `message` field of a JSON body, if there is one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.parse::<Value>()
            .ok()?
            .get("message")?
            .as_str()
            .map(ToString::to_string)
    }
}

/// Executes HTTP requests.
pub trait Transport: Send + Sync + 'static {
    /// Sends the request and reads the full response.
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Joins `path` onto `base`, keeping every segment of `base`.
///
/// `Url::join` drops the last segment of a base without a trailing slash;
/// service bases like `https://host/api/v1/emails` must keep it.
///
/// # Errors
///
/// Returns an error if the joined URL is invalid.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(Error::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_keeps_base_segments() {
        let base = Url::parse("https://mail.example.com/api/v1/emails").unwrap();
        assert_eq!(
            endpoint(&base, "/inbox").unwrap().as_str(),
            "https://mail.example.com/api/v1/emails/inbox"
        );
        assert_eq!(
            endpoint(&base, "drafts/d-1").unwrap().as_str(),
            "https://mail.example.com/api/v1/emails/drafts/d-1"
        );

        let slashed = Url::parse("https://auth.example.com/").unwrap();
        assert_eq!(
            endpoint(&slashed, "accounts/profile").unwrap().as_str(),
            "https://auth.example.com/accounts/profile"
        );
    }

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://example.com/x").unwrap();
        let request = HttpRequest::get(url)
            .query("email_id", "acc-1")
            .query("offset", 1)
            .bearer_auth("old")
            .bearer_auth("new");

        assert_eq!(request.query_value("email_id"), Some("acc-1"));
        assert_eq!(request.query_value("offset"), Some("1"));
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.bearer_token(), Some("new"));
        assert_eq!(request.header_value("authorization"), Some("Bearer new"));
    }

    #[test]
    fn test_response_helpers() {
        let ok = HttpResponse::json(200, &json!({"message": "fine"}));
        assert!(ok.is_success());
        assert_eq!(ok.message().as_deref(), Some("fine"));

        let not_json = HttpResponse::new(502, "<html>bad gateway</html>");
        assert!(!not_json.is_success());
        assert_eq!(not_json.message(), None);
        assert!(not_json.parse::<Value>().is_err());
    }
}
