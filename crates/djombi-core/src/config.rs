//! Service endpoints and tuning.
//!
//! Loaded from `<config_dir>/djombi/config.json` when present, then
//! overridden by `DJOMBI_AUTH_URL` / `DJOMBI_EMAIL_URL`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Environment variable overriding the auth service base URL.
pub const AUTH_URL_ENV: &str = "DJOMBI_AUTH_URL";
/// Environment variable overriding the email service base URL.
pub const EMAIL_URL_ENV: &str = "DJOMBI_EMAIL_URL";

/// Endpoints and request tuning for the remote services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Auth/profile service base (`.../accounts/profile` is joined onto it).
    pub auth_base_url: String,
    /// Email service base (`.../inbox`, `.../send`... are joined onto it).
    pub email_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Profile cache lifetime in seconds.
    pub profile_ttl_secs: u64,
    /// `offset` sent with list requests.
    pub page_offset: u32,
    /// `limit` sent with list requests.
    pub page_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auth_base_url: "http://localhost:8000/api/v1".to_string(),
            email_base_url: "http://localhost:8080/api/v1/emails".to_string(),
            request_timeout_secs: 30,
            profile_ttl_secs: 5 * 60,
            page_offset: 1,
            page_limit: 100,
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("djombi")
            .join("config.json")
    }

    /// Loads the default config file (if any) and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable, or a URL is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())?
            .with_overrides(|key| std::env::var(key).ok())
            .validated()
    }

    /// Loads a config file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Applies URL overrides from `lookup` (normally the process environment).
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(AUTH_URL_ENV).filter(|v| !v.is_empty()) {
            self.auth_base_url = url;
        }
        if let Some(url) = lookup(EMAIL_URL_ENV).filter(|v| !v.is_empty()) {
            self.email_base_url = url;
        }
        self
    }

    /// Checks that both URLs parse and the paging values are usable.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validated(self) -> Result<Self> {
        self.auth_url()?;
        self.email_url()?;
        if self.page_limit == 0 {
            return Err(Error::Config("page_limit must be positive".to_string()));
        }
        Ok(self)
    }

    /// Parsed auth base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn auth_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.auth_base_url)?)
    }

    /// Parsed email base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn email_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.email_base_url)?)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Profile cache lifetime.
    #[must_use]
    pub const fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Sets the auth service base URL.
    #[must_use]
    pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth_base_url = url.into();
        self
    }

    /// Sets the email service base URL.
    #[must_use]
    pub fn email_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.email_base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the profile cache lifetime.
    #[must_use]
    pub const fn profile_ttl(mut self, ttl: Duration) -> Self {
        self.config.profile_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets list paging.
    #[must_use]
    pub const fn paging(mut self, offset: u32, limit: u32) -> Self {
        self.config.page_offset = offset;
        self.config.page_limit = limit;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid or the page limit is zero.
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validated()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.page_offset, 1);
        assert_eq!(config.page_limit, 100);
        assert_eq!(config.profile_ttl(), Duration::from_secs(300));
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_builder_validates_urls() {
        let err = ServiceConfig::builder()
            .email_base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Url(_)));

        let err = ServiceConfig::builder().paging(1, 0).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::default().with_overrides(|key| match key {
            AUTH_URL_ENV => Some("https://auth.example.com/api/v1".to_string()),
            EMAIL_URL_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.auth_base_url, "https://auth.example.com/api/v1");
        assert_eq!(config.email_base_url, ServiceConfig::default().email_base_url);
    }

    #[test]
    fn test_load_from_file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"email_base_url": "https://mail.example.com/api/v1/emails", "page_limit": 25}"#,
        )
        .unwrap();

        let config = ServiceConfig::load_from(&path).unwrap();
        assert_eq!(config.email_base_url, "https://mail.example.com/api/v1/emails");
        assert_eq!(config.page_limit, 25);
        assert_eq!(config.page_offset, 1);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::load_from(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
