//! Session context model types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The organization (tenant) the session is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization id.
    pub organization_id: String,
    /// Arbitrary organization payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_data: Option<Value>,
}

impl Organization {
    /// Creates an organization without payload.
    #[must_use]
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            organization_data: None,
        }
    }

    /// Attaches the organization payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.organization_data = Some(data);
        self
    }
}

/// The email identity that inbox/sent/spam/draft operations are scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEmailAccount {
    /// Email account id sent as `email_id` to the email service.
    pub id: String,
    /// Account kind (`personal`, `professional`, `custom`...).
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    /// Arbitrary account payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SelectedEmailAccount {
    /// Creates a selection with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account_type: None,
            data: None,
        }
    }

    /// Sets the account kind.
    #[must_use]
    pub fn with_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = Some(account_type.into());
        self
    }
}

/// One linked email account, as listed by the account picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEmailAccount {
    /// Email account id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Account kind.
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

impl LinkedEmailAccount {
    /// Converts the linked account into a selection.
    #[must_use]
    pub fn to_selection(&self) -> SelectedEmailAccount {
        SelectedEmailAccount {
            id: self.id.clone(),
            account_type: self.account_type.clone(),
            data: serde_json::to_value(self).ok(),
        }
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Email address.
    pub email: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// User id.
    pub id: Option<String>,
}
