//! Profile endpoint payloads.

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::context::UserInfo;
use crate::error::{Error, Result};
use crate::token::StoredToken;

/// The user record returned in the profile payload's `data` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id (numeric ids are kept as their decimal string).
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// First name.
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Every other field, preserved as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Best available display name: full name, then username, then email.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
        self.username.clone().or_else(|| self.email.clone())
    }

    /// The identity cookies derived from this profile.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            email: self.email.clone(),
            name: self.display_name(),
            id: self.id.clone(),
        }
    }
}

/// Token block of the profile payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenMeta {
    /// Djombi access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Djombi refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds, when the server sends one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// `GET /accounts/profile` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEnvelope {
    /// `success` on success.
    #[serde(default)]
    pub status: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// The user.
    #[serde(default)]
    pub data: Option<UserProfile>,
    /// The minted tokens.
    #[serde(default)]
    pub meta: Option<TokenMeta>,
}

impl ProfileEnvelope {
    /// Validates the envelope and extracts the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if `status` is not `success` or the
    /// access token is missing.
    pub fn into_session(self) -> Result<DjombiSession> {
        if self.status != "success" {
            return Err(Error::InvalidResponse(
                self.message
                    .unwrap_or_else(|| format!("unexpected status '{}'", self.status)),
            ));
        }

        let meta = self.meta.unwrap_or_default();
        let access_token = meta
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidResponse("missing access token".to_string()))?;

        let mut tokens = StoredToken::new(access_token, meta.refresh_token.unwrap_or_default());
        if let Some(secs) = meta.expires_in.filter(|s| *s > 0) {
            tokens = tokens.with_expires_at(Utc::now() + Duration::seconds(secs));
        }

        Ok(DjombiSession {
            tokens,
            profile: self.data.unwrap_or_default(),
        })
    }
}

/// A Djombi token pair with the profile it was issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct DjombiSession {
    /// Djombi tokens.
    pub tokens: StoredToken,
    /// User profile.
    pub profile: UserProfile,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_into_session() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "status": "success",
            "message": "Profile fetched",
            "data": {"id": 17, "email": "ana@example.com", "firstName": "Ana", "role": "admin"},
            "meta": {"access_token": "dj-access", "refresh_token": "dj-refresh"}
        }))
        .unwrap();

        let session = envelope.into_session().unwrap();
        assert_eq!(session.tokens.access_token, "dj-access");
        assert_eq!(session.tokens.refresh_token(), Some("dj-refresh"));
        assert_eq!(session.profile.id.as_deref(), Some("17"));
        assert_eq!(session.profile.display_name().as_deref(), Some("Ana"));
        assert_eq!(session.profile.extra.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_envelope_rejects_failure_status() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "status": "error",
            "message": "Token invalid"
        }))
        .unwrap();

        let err = envelope.into_session().unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(m) if m == "Token invalid"));
    }

    #[test]
    fn test_envelope_requires_access_token() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "status": "success",
            "data": {"email": "a@b.c"},
            "meta": {"refresh_token": "r"}
        }))
        .unwrap();
        assert!(envelope.into_session().is_err());
    }

    #[test]
    fn test_expires_in_sets_expiry() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "status": "success",
            "meta": {"access_token": "a", "expires_in": 3600}
        }))
        .unwrap();
        let session = envelope.into_session().unwrap();
        assert!(session.tokens.expires_at.is_some());
        assert!(!session.tokens.is_expired());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let profile = UserProfile {
            username: Some("ana".into()),
            email: Some("ana@example.com".into()),
            ..UserProfile::default()
        };
        assert_eq!(profile.display_name().as_deref(), Some("ana"));

        let only_email = UserProfile {
            email: Some("ana@example.com".into()),
            ..UserProfile::default()
        };
        assert_eq!(only_email.user_info().name.as_deref(), Some("ana@example.com"));
    }
}
