//! Access/refresh token pairs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days an access-token cookie lives when the server gives no expiry.
pub const ACCESS_COOKIE_DAYS: i64 = 7;

/// Days a refresh-token cookie lives. Always at least the access lifetime.
pub const REFRESH_COOKIE_DAYS: i64 = 30;

/// An access/refresh token pair as persisted in cookies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token string.
    pub access_token: String,
    /// Refresh token string (may be empty when the issuer sent none).
    pub refresh_token: String,
    /// Access token expiration, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Creates a token pair without a known expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Checks if the access token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }

    /// Returns the refresh token, if one was issued.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|t| !t.is_empty())
    }

    /// Cookie lifetimes `(access_days, refresh_days)` for this pair.
    ///
    /// The refresh cookie never expires before the access cookie.
    #[must_use]
    pub fn cookie_days(&self) -> (i64, i64) {
        let access_days = self.expires_at.map_or(ACCESS_COOKIE_DAYS, |exp| {
            let remaining = exp - Utc::now();
            // round up so a token expiring in a few hours still gets a cookie
            (remaining.num_hours() + 23).div_euclid(24).max(1)
        });
        (access_days, REFRESH_COOKIE_DAYS.max(access_days))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = StoredToken::new("access123", "refresh456");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.refresh_token(), Some("refresh456"));
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_empty_refresh_token_is_none() {
        assert_eq!(StoredToken::new("a", "").refresh_token(), None);
    }

    #[test]
    fn test_token_expiration() {
        let expired =
            StoredToken::new("a", "r").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());

        let valid =
            StoredToken::new("a", "r").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
    }

    #[test]
    fn test_refresh_cookie_outlives_access_cookie() {
        let (access, refresh) = StoredToken::new("a", "r").cookie_days();
        assert_eq!(access, ACCESS_COOKIE_DAYS);
        assert!(refresh >= access);

        let long_lived =
            StoredToken::new("a", "r").with_expires_at(Utc::now() + Duration::days(90));
        let (access, refresh) = long_lived.cookie_days();
        assert!(access >= 89);
        assert!(refresh >= access);

        let short_lived =
            StoredToken::new("a", "r").with_expires_at(Utc::now() + Duration::hours(2));
        assert_eq!(short_lived.cookie_days().0, 1);
    }
}
