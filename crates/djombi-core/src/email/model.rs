//! Email model types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The partition an email lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Received mail.
    Inbox,
    /// Sent mail.
    Sent,
    /// Spam.
    Spam,
    /// Unsent drafts.
    Draft,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Inbox, Self::Sent, Self::Spam, Self::Draft];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Spam => "spam",
            Self::Draft => "draft",
        }
    }

    /// Path segment of the list endpoint.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Draft => "drafts",
            other => other.as_str(),
        }
    }

    /// Name with a trailing `s`, as some payloads key their lists.
    #[must_use]
    pub fn plural(self) -> String {
        format!("{}s", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(Self::Inbox),
            "sent" => Ok(Self::Sent),
            "spam" => Ok(Self::Spam),
            "draft" | "drafts" => Ok(Self::Draft),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A normalized email record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    /// Message id, synthetic when the upstream record had none.
    pub id: String,
    /// Email account the message belongs to.
    #[serde(rename = "email_id")]
    pub email_id: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses, comma separated.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub content: String,
    /// When the message was sent or received.
    pub timestamp: String,
    /// When the record was created upstream.
    pub created_at: String,
    /// Urgent flag.
    pub is_urgent: bool,
    /// Whether the message carries attachments.
    pub has_attachment: bool,
    /// Lifecycle status; mirrors `category`.
    pub status: Category,
    /// The list this email belongs to.
    pub category: Category,
    /// Read flag.
    pub is_read: bool,
    /// MIME type of `content`.
    pub content_type: String,
}

impl Email {
    /// Returns a copy relocated to `category`.
    #[must_use]
    pub fn moved_to(&self, category: Category) -> Self {
        Self {
            status: category,
            category,
            ..self.clone()
        }
    }
}

/// A message to send or save as a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipients.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Body.
    pub content: String,
    /// MIME type of `content`.
    pub content_type: Option<String>,
}

impl OutgoingEmail {
    /// Creates a message with one recipient.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn with_to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn with_cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a blind carbon-copy recipient.
    #[must_use]
    pub fn with_bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Sets the content MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Request body scoped to `email_id`.
    #[must_use]
    pub fn to_body(&self, email_id: &str) -> Value {
        let mut body = json!({
            "email_id": email_id,
            "to": self.to,
            "subject": self.subject,
            "content": self.content,
        });
        if !self.cc.is_empty() {
            body["cc"] = json!(self.cc);
        }
        if !self.bcc.is_empty() {
            body["bcc"] = json!(self.bcc);
        }
        if let Some(content_type) = &self.content_type {
            body["content_type"] = json!(content_type);
        }
        body
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Draft.as_str(), "draft");
        assert_eq!(Category::Draft.endpoint(), "drafts");
        assert_eq!(Category::Spam.endpoint(), "spam");
        assert_eq!(Category::Inbox.plural(), "inboxs");
        assert_eq!("Drafts".parse::<Category>().unwrap(), Category::Draft);
        assert!("archive".parse::<Category>().is_err());
        assert_eq!(serde_json::to_string(&Category::Sent).unwrap(), "\"sent\"");
    }

    #[test]
    fn test_outgoing_body() {
        let body = OutgoingEmail::new("a@example.com", "Hi", "Hello")
            .with_cc("c@example.com")
            .to_body("acc-1");
        assert_eq!(body["email_id"], "acc-1");
        assert_eq!(body["to"], json!(["a@example.com"]));
        assert_eq!(body["cc"], json!(["c@example.com"]));
        assert!(body.get("bcc").is_none());
        assert!(body.get("content_type").is_none());
    }
}
