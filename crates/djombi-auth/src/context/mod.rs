//! Token & organization context.
//!
//! Typed accessors over the cookie jar for auth tokens, the current
//! organization and the selected email account. All token-precedence
//! decisions live here so call sites never pick a token themselves.

mod model;

pub use model::{LinkedEmailAccount, Organization, SelectedEmailAccount, UserInfo};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cookie::{CookieJar, CookieOptions, names};
use crate::token::StoredToken;

/// Value of the `auth_status` cookie once a login completed.
pub const AUTHENTICATED: &str = "authenticated";

/// Session state stored in cookies.
#[derive(Debug, Clone)]
pub struct SessionContext {
    jar: Arc<CookieJar>,
}

impl SessionContext {
    /// Creates a context over a cookie jar.
    #[must_use]
    pub const fn new(jar: Arc<CookieJar>) -> Self {
        Self { jar }
    }

    /// Creates a context over a fresh, non-persistent jar.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(CookieJar::new(false)))
    }

    /// The underlying cookie jar.
    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    // --- tokens ---

    /// Stores the Adafri token pair and marks the session authenticated.
    pub fn set_auth_tokens(&self, tokens: &StoredToken) {
        self.write_pair(names::ACCESS_TOKEN, names::REFRESH_TOKEN, tokens);
        self.mark_authenticated();
        info!("Stored Adafri tokens");
    }

    /// Reads the Adafri token pair.
    #[must_use]
    pub fn get_auth_tokens(&self) -> Option<StoredToken> {
        self.read_pair(names::ACCESS_TOKEN, names::REFRESH_TOKEN)
    }

    /// Stores the Djombi token pair and marks the session authenticated.
    pub fn set_djombi_tokens(&self, tokens: &StoredToken) {
        self.write_pair(
            names::DJOMBI_ACCESS_TOKEN,
            names::DJOMBI_REFRESH_TOKEN,
            tokens,
        );
        self.mark_authenticated();
        info!("Stored Djombi tokens");
    }

    /// Reads the Djombi token pair.
    #[must_use]
    pub fn get_djombi_tokens(&self) -> Option<StoredToken> {
        self.read_pair(names::DJOMBI_ACCESS_TOKEN, names::DJOMBI_REFRESH_TOKEN)
    }

    /// Stores the legacy messaging token.
    pub fn set_message_token(&self, token: &str) {
        self.jar
            .set_cookie(names::MESSAGE_ACCESS_TOKEN, token, &CookieOptions::default());
    }

    /// The token to send as bearer: Djombi, then Adafri, then the legacy messaging token.
    #[must_use]
    pub fn primary_access_token(&self) -> Option<String> {
        [
            names::DJOMBI_ACCESS_TOKEN,
            names::ACCESS_TOKEN,
            names::MESSAGE_ACCESS_TOKEN,
        ]
        .into_iter()
        .find_map(|name| self.non_empty(name))
    }

    /// Drops only the Djombi token pair.
    pub fn clear_djombi_tokens(&self) {
        self.remove_all(names::DJOMBI);
    }

    // --- organization ---

    /// Scopes the session to an organization.
    pub fn set_current_organization(&self, organization: &Organization) {
        let options = CookieOptions::default();
        self.jar.set_cookie(
            names::CURRENT_ORGANIZATION_ID,
            &organization.organization_id,
            &options,
        );
        match &organization.organization_data {
            Some(data) => self.write_json(names::CURRENT_ORGANIZATION_DATA, data),
            None => self
                .jar
                .remove_cookie(names::CURRENT_ORGANIZATION_DATA, &options),
        }
        debug!("Current organization set to {}", organization.organization_id);
    }

    /// The organization the session is scoped to.
    #[must_use]
    pub fn current_organization(&self) -> Option<Organization> {
        let organization_id = self.non_empty(names::CURRENT_ORGANIZATION_ID)?;
        Some(Organization {
            organization_id,
            organization_data: self.read_json(names::CURRENT_ORGANIZATION_DATA),
        })
    }

    // --- email accounts ---

    /// Selects the email account used by every email operation.
    pub fn set_selected_linked_email(&self, account: &SelectedEmailAccount) {
        let options = CookieOptions::default();
        self.jar
            .set_cookie(names::SELECTED_EMAIL_ID, &account.id, &options);
        match &account.account_type {
            Some(kind) => self
                .jar
                .set_cookie(names::SELECTED_EMAIL_TYPE, kind, &options),
            None => self.jar.remove_cookie(names::SELECTED_EMAIL_TYPE, &options),
        }
        match &account.data {
            Some(data) => self.write_json(names::SELECTED_EMAIL_DATA, data),
            None => self.jar.remove_cookie(names::SELECTED_EMAIL_DATA, &options),
        }
        debug!("Selected email account {}", account.id);
    }

    /// The selected email account, if any.
    #[must_use]
    pub fn selected_linked_email(&self) -> Option<SelectedEmailAccount> {
        let id = self.non_empty(names::SELECTED_EMAIL_ID)?;
        Some(SelectedEmailAccount {
            id,
            account_type: self.non_empty(names::SELECTED_EMAIL_TYPE),
            data: self.read_json(names::SELECTED_EMAIL_DATA),
        })
    }

    /// Stores the list of linked email accounts.
    pub fn set_linked_email_accounts(&self, accounts: &[LinkedEmailAccount]) {
        self.write_json(names::LINKED_EMAIL_ACCOUNTS, accounts);
    }

    /// The linked email accounts; empty when none are stored or the blob is unreadable.
    #[must_use]
    pub fn linked_email_accounts(&self) -> Vec<LinkedEmailAccount> {
        self.read_json(names::LINKED_EMAIL_ACCOUNTS)
            .unwrap_or_default()
    }

    // --- user ---

    /// Stores the signed-in user's identity. `None` fields are left untouched.
    pub fn set_user_info(&self, user: &UserInfo) {
        let options = CookieOptions::default();
        for (name, value) in [
            (names::USER_EMAIL, &user.email),
            (names::USER_NAME, &user.name),
            (names::USER_ID, &user.id),
        ] {
            if let Some(value) = value {
                self.jar.set_cookie(name, value, &options);
            }
        }
    }

    /// The signed-in user's identity.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            email: self.non_empty(names::USER_EMAIL),
            name: self.non_empty(names::USER_NAME),
            id: self.non_empty(names::USER_ID),
        }
    }

    /// When the last login completed.
    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.non_empty(names::LAST_LOGIN)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    // --- status ---

    /// True when a bearer token exists and a login completed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.primary_access_token().is_some()
            && self.jar.get_cookie(names::AUTH_STATUS).as_deref() == Some(AUTHENTICATED)
    }

    /// True when authenticated and scoped to an organization.
    #[must_use]
    pub fn is_fully_authenticated(&self) -> bool {
        self.is_authenticated() && self.current_organization().is_some()
    }

    // --- clearing ---

    /// Removes every cookie the session owns.
    pub fn clear_all_auth_data(&self) {
        self.remove_all(names::ALL);
        info!("Cleared all auth data");
    }

    /// Removes the organization scope.
    pub fn clear_organization_data(&self) {
        self.remove_all(names::ORGANIZATION);
    }

    /// Removes the email account selection and linked accounts.
    pub fn clear_email_data(&self) {
        self.remove_all(names::EMAIL);
    }

    // --- helpers ---

    fn mark_authenticated(&self) {
        let options = CookieOptions::default();
        self.jar
            .set_cookie(names::AUTH_STATUS, AUTHENTICATED, &options);
        self.jar
            .set_cookie(names::LAST_LOGIN, &Utc::now().to_rfc3339(), &options);
    }

    fn write_pair(&self, access_name: &str, refresh_name: &str, tokens: &StoredToken) {
        let (access_days, refresh_days) = tokens.cookie_days();
        self.jar.set_cookie(
            access_name,
            &tokens.access_token,
            &CookieOptions::days(access_days),
        );
        match tokens.refresh_token() {
            Some(refresh) => {
                self.jar
                    .set_cookie(refresh_name, refresh, &CookieOptions::days(refresh_days));
            }
            None => self
                .jar
                .remove_cookie(refresh_name, &CookieOptions::default()),
        }
    }

    fn read_pair(&self, access_name: &str, refresh_name: &str) -> Option<StoredToken> {
        let access = self.non_empty(access_name)?;
        let refresh = self.jar.get_cookie(refresh_name).unwrap_or_default();
        Some(StoredToken::new(access, refresh))
    }

    fn non_empty(&self, name: &str) -> Option<String> {
        self.jar.get_cookie(name).filter(|value| !value.is_empty())
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.jar.set_cookie(name, &json, &CookieOptions::default()),
            Err(e) => warn!("Failed to serialize cookie {name}: {e}"),
        }
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.non_empty(name)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable cookie {name}: {e}");
                None
            }
        }
    }

    fn remove_all(&self, cookie_names: &[&str]) {
        let options = CookieOptions::default();
        for name in cookie_names {
            self.jar.remove_cookie(name, &options);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_priority() {
        let ctx = SessionContext::in_memory();
        assert_eq!(ctx.primary_access_token(), None);

        ctx.set_message_token("legacy");
        assert_eq!(ctx.primary_access_token().as_deref(), Some("legacy"));

        ctx.set_auth_tokens(&StoredToken::new("adafri", "adafri-refresh"));
        assert_eq!(ctx.primary_access_token().as_deref(), Some("adafri"));

        ctx.set_djombi_tokens(&StoredToken::new("djombi", "djombi-refresh"));
        assert_eq!(ctx.primary_access_token().as_deref(), Some("djombi"));

        ctx.clear_djombi_tokens();
        assert_eq!(ctx.primary_access_token().as_deref(), Some("adafri"));
    }

    #[test]
    fn test_fully_authenticated_requires_organization() {
        let ctx = SessionContext::in_memory();
        ctx.set_auth_tokens(&StoredToken::new("adafri", "r"));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.jar().get_cookie(names::AUTH_STATUS).as_deref(), Some(AUTHENTICATED));
        assert!(!ctx.is_fully_authenticated());

        ctx.set_current_organization(&Organization::new("org-1"));
        assert!(ctx.is_fully_authenticated());

        ctx.clear_organization_data();
        assert!(ctx.is_authenticated());
        assert!(!ctx.is_fully_authenticated());
    }

    #[test]
    fn test_not_authenticated_without_status() {
        let ctx = SessionContext::in_memory();
        ctx.set_message_token("legacy");
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_organization_round_trip() {
        let ctx = SessionContext::in_memory();
        let org = Organization::new("org-42").with_data(json!({"name": "Acme", "plan": "pro"}));
        ctx.set_current_organization(&org);
        assert_eq!(ctx.current_organization(), Some(org));

        ctx.set_current_organization(&Organization::new("org-43"));
        assert!(ctx.current_organization().unwrap().organization_data.is_none());
    }

    #[test]
    fn test_selected_email_round_trip() {
        let ctx = SessionContext::in_memory();
        assert!(ctx.selected_linked_email().is_none());

        let account = SelectedEmailAccount::new("acc-1").with_type("professional");
        ctx.set_selected_linked_email(&account);
        assert_eq!(ctx.selected_linked_email(), Some(account));

        ctx.clear_email_data();
        assert!(ctx.selected_linked_email().is_none());
    }

    #[test]
    fn test_linked_accounts_blob() {
        let ctx = SessionContext::in_memory();
        assert!(ctx.linked_email_accounts().is_empty());

        let accounts = vec![LinkedEmailAccount {
            id: "acc-1".into(),
            email: "me@example.com".into(),
            account_type: Some("personal".into()),
        }];
        ctx.set_linked_email_accounts(&accounts);
        assert_eq!(ctx.linked_email_accounts(), accounts);

        let selection = accounts[0].to_selection();
        assert_eq!(selection.id, "acc-1");
        assert_eq!(selection.account_type.as_deref(), Some("personal"));
    }

    #[test]
    fn test_corrupt_json_cookie_is_ignored() {
        let ctx = SessionContext::in_memory();
        ctx.jar()
            .set_cookie(names::LINKED_EMAIL_ACCOUNTS, "{not json", &CookieOptions::default());
        assert!(ctx.linked_email_accounts().is_empty());
    }

    #[test]
    fn test_clear_all_auth_data() {
        let ctx = SessionContext::in_memory();
        ctx.set_auth_tokens(&StoredToken::new("a", "r"));
        ctx.set_djombi_tokens(&StoredToken::new("d", "dr"));
        ctx.set_current_organization(&Organization::new("org"));
        ctx.set_selected_linked_email(&SelectedEmailAccount::new("acc"));
        ctx.set_user_info(&UserInfo {
            email: Some("me@example.com".into()),
            ..UserInfo::default()
        });
        assert!(ctx.last_login().is_some());

        ctx.clear_all_auth_data();
        assert!(ctx.jar().names().is_empty());
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.user_info(), UserInfo::default());
    }

    #[test]
    fn test_missing_refresh_token_is_not_stored() {
        let ctx = SessionContext::in_memory();
        ctx.set_djombi_tokens(&StoredToken::new("d", ""));
        assert!(ctx.jar().get_cookie(names::DJOMBI_REFRESH_TOKEN).is_none());
        assert_eq!(ctx.get_djombi_tokens().unwrap().refresh_token(), None);
    }
}
