//! Client for the email microservice.

use chrono::Utc;
use djombi_auth::http::endpoint;
use djombi_auth::{AuthorizedClient, HttpRequest, HttpResponse, SelectedEmailAccount, Transport};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::decode::{DecodeError, ListPayload, decode_list, indicates_no_emails};
use super::model::{Category, Email, OutgoingEmail};

/// Email operation errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// No email account is selected; nothing was sent.
    #[error("Email ID missing: no email account selected. Select an email account first.")]
    NoAccountSelected,

    /// The service rejected the credentials (401).
    #[error("Authentication failed. Please sign in again.")]
    AuthenticationFailed,

    /// The account may not access this resource (403).
    #[error("Access denied to this email account.")]
    AccessDenied,

    /// The service reported a failure.
    #[error("{0}")]
    Api(String),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(#[from] DecodeError),

    /// Network or transport failure.
    #[error(transparent)]
    Transport(djombi_auth::Error),
}

impl From<djombi_auth::Error> for EmailError {
    fn from(err: djombi_auth::Error) -> Self {
        match err.http_status() {
            Some(401) => Self::AuthenticationFailed,
            Some(403) => Self::AccessDenied,
            _ => Self::Transport(err),
        }
    }
}

/// Result type for email operations.
pub type EmailResult<T> = std::result::Result<T, EmailError>;

/// Acknowledgement of a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiAck {
    /// Upstream success flag, when present.
    #[serde(default)]
    pub success: Option<bool>,
    /// Upstream message.
    #[serde(default)]
    pub message: Option<String>,
    /// Upstream payload.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Typed access to the email service, scoped to the selected account.
///
/// Every call reads the selected account from the session at call time and
/// fails with [`EmailError::NoAccountSelected`] before any I/O when none is
/// selected.
#[derive(Debug)]
pub struct EmailApi<T: Transport> {
    client: AuthorizedClient<T>,
    base_url: Url,
    page_offset: u32,
    page_limit: u32,
}

impl<T: Transport> Clone for EmailApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            page_offset: self.page_offset,
            page_limit: self.page_limit,
        }
    }
}

impl<T: Transport> EmailApi<T> {
    /// Creates a client against `base_url` (e.g. `https://host/api/v1/emails`).
    #[must_use]
    pub fn new(client: AuthorizedClient<T>, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            page_offset: 1,
            page_limit: 100,
        }
    }

    /// Sets list paging.
    #[must_use]
    pub const fn with_paging(mut self, offset: u32, limit: u32) -> Self {
        self.page_offset = offset;
        self.page_limit = limit;
        self
    }

    /// The underlying authorized client.
    #[must_use]
    pub const fn client(&self) -> &AuthorizedClient<T> {
        &self.client
    }

    /// Lists the emails of `category` for the selected account.
    ///
    /// A "no emails" rejection (a 404 or a `success: false` body) and an
    /// undecodable body both yield an empty list. 401 and 403 always map to
    /// their errors.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::NoAccountSelected`] without I/O when no account
    /// is selected, and auth, API or transport errors otherwise.
    pub async fn fetch_emails_by_category(&self, category: Category) -> EmailResult<Vec<Email>> {
        let account = self.require_account()?;
        let request = HttpRequest::get(self.url(category.endpoint())?)
            .query("email_id", &account.id)
            .query("offset", self.page_offset)
            .query("limit", self.page_limit);

        debug!("Fetching {category} for {}", account.id);
        let response = self.client.send(request).await?;

        if !response.is_success() {
            let message = failure_message(&response);
            if response.status == 404 && indicates_no_emails(&message) {
                debug!("No {category} emails: {message}");
                return Ok(Vec::new());
            }
            return Err(status_error(response.status, message));
        }

        let Ok(body) = response.parse::<Value>() else {
            warn!("Undecodable {category} response body, treating as empty");
            return Ok(Vec::new());
        };

        match decode_list(&body, category, Utc::now()) {
            Ok(ListPayload::Emails(emails)) => {
                info!("Fetched {} {category} emails", emails.len());
                Ok(emails)
            }
            Ok(ListPayload::Empty) => Ok(Vec::new()),
            Ok(ListPayload::Rejected(message)) => Err(EmailError::Api(message)),
            Err(e) => {
                warn!("Malformed {category} response, treating as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Sends a message from the selected account.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::NoAccountSelected`] without I/O when no account
    /// is selected, and auth, API or transport errors otherwise.
    pub async fn send_email(&self, email: &OutgoingEmail) -> EmailResult<ApiAck> {
        let account = self.require_account()?;
        let request = HttpRequest::post(self.url("send")?).json(email.to_body(&account.id));
        let ack = self.acknowledge(request).await?;
        info!("Sent email to {}", email.to.join(", "));
        Ok(ack)
    }

    /// Saves a new draft.
    ///
    /// # Errors
    ///
    /// As for [`Self::send_email`].
    pub async fn create_draft(&self, draft: &OutgoingEmail) -> EmailResult<ApiAck> {
        let account = self.require_account()?;
        let request = HttpRequest::post(self.url("drafts")?).json(draft.to_body(&account.id));
        self.acknowledge(request).await
    }

    /// Replaces the draft `draft_id`.
    ///
    /// # Errors
    ///
    /// As for [`Self::send_email`].
    pub async fn update_draft(&self, draft_id: &str, draft: &OutgoingEmail) -> EmailResult<ApiAck> {
        let account = self.require_account()?;
        let path = format!("drafts/{}", urlencoding::encode(draft_id));
        let request = HttpRequest::put(self.url(&path)?).json(draft.to_body(&account.id));
        self.acknowledge(request).await
    }

    /// Deletes the draft `draft_id`.
    ///
    /// # Errors
    ///
    /// As for [`Self::send_email`].
    pub async fn delete_draft(&self, draft_id: &str) -> EmailResult<ApiAck> {
        let account = self.require_account()?;
        let path = format!("drafts/{}", urlencoding::encode(draft_id));
        let request = HttpRequest::delete(self.url(&path)?).query("email_id", &account.id);
        let ack = self.acknowledge(request).await?;
        info!("Deleted draft {draft_id}");
        Ok(ack)
    }

    /// Moves `message_id` into `destination`.
    ///
    /// # Errors
    ///
    /// As for [`Self::send_email`].
    pub async fn move_email(&self, message_id: &str, destination: Category) -> EmailResult<ApiAck> {
        let account = self.require_account()?;
        let path = format!("{}/move", urlencoding::encode(message_id));
        let request = HttpRequest::put(self.url(&path)?).json(json!({
            "email_id": account.id,
            "category": destination,
        }));
        let ack = self.acknowledge(request).await?;
        info!("Moved {message_id} to {destination}");
        Ok(ack)
    }

    fn require_account(&self) -> EmailResult<SelectedEmailAccount> {
        self.client
            .session()
            .selected_linked_email()
            .filter(|account| !account.id.trim().is_empty())
            .ok_or(EmailError::NoAccountSelected)
    }

    fn url(&self, path: &str) -> EmailResult<Url> {
        Ok(endpoint(&self.base_url, path)?)
    }

    async fn acknowledge(&self, request: HttpRequest) -> EmailResult<ApiAck> {
        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(status_error(response.status, failure_message(&response)));
        }

        let ack = if response.body.trim().is_empty() {
            ApiAck::default()
        } else {
            response.parse::<ApiAck>().unwrap_or_else(|e| {
                debug!("Unstructured acknowledgement: {e}");
                ApiAck::default()
            })
        };

        if ack.success == Some(false) {
            return Err(EmailError::Api(
                ack.message.unwrap_or_else(|| "Request failed".to_string()),
            ));
        }
        Ok(ack)
    }
}

fn failure_message(response: &HttpResponse) -> String {
    response
        .message()
        .unwrap_or_else(|| format!("Request failed with status {}", response.status))
}

fn status_error(status: u16, message: String) -> EmailError {
    match status {
        401 => EmailError::AuthenticationFailed,
        403 => EmailError::AccessDenied,
        _ => EmailError::Api(message),
    }
}
