//! Scripted transport shared by the integration tests.

#![allow(clippy::unwrap_used, dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use djombi_auth::{
    AuthorizedClient, HttpRequest, HttpResponse, ProfileService, SelectedEmailAccount,
    SessionContext, StoredToken, Transport,
};
use djombi_core::EmailApi;
use url::Url;

type Handler = Box<dyn Fn(&HttpRequest) -> (Duration, HttpResponse) + Send + Sync>;

/// Answers from a handler after an optional delay and records every request.
pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::delayed(move |request| (Duration::ZERO, handler(request)))
    }

    pub fn delayed(
        handler: impl Fn(&HttpRequest) -> (Duration, HttpResponse) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> djombi_auth::Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let (delay, response) = (self.handler)(&request);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }
}

pub fn email_base() -> Url {
    Url::parse("https://mail.example.com/api/v1/emails").unwrap()
}

/// A session with a Djombi token and, optionally, a selected account.
pub fn session(account: Option<&str>) -> SessionContext {
    let session = SessionContext::in_memory();
    session.set_auth_tokens(&StoredToken::new("adafri-1", ""));
    session.set_djombi_tokens(&StoredToken::new("dj-1", "dj-1-refresh"));
    if let Some(id) = account {
        session.set_selected_linked_email(&SelectedEmailAccount::new(id).with_type("professional"));
    }
    session
}

pub fn api(
    transport: &Arc<ScriptedTransport>,
    session: SessionContext,
) -> EmailApi<ScriptedTransport> {
    let auth_base = Url::parse("https://auth.example.com/api/v1").unwrap();
    let profile = ProfileService::new(Arc::clone(transport), session, &auth_base).unwrap();
    EmailApi::new(AuthorizedClient::new(Arc::new(profile)), email_base())
}
