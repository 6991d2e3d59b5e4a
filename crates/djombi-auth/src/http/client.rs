//! Bearer-auth client with one refresh-and-retry on 401.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport};
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::profile::ProfileService;

/// Sends requests with the session's primary access token attached.
///
/// A 401 triggers a single Djombi token refresh followed by one retry. When
/// the refresh fails, or the retry is rejected again, the Djombi credentials
/// are cleared and [`Error::Unauthorized`] is returned. Other statuses are
/// handed back to the caller untouched.
#[derive(Debug)]
pub struct AuthorizedClient<T: Transport> {
    profile: Arc<ProfileService<T>>,
}

impl<T: Transport> Clone for AuthorizedClient<T> {
    fn clone(&self) -> Self {
        Self {
            profile: Arc::clone(&self.profile),
        }
    }
}

impl<T: Transport> AuthorizedClient<T> {
    /// Creates a client that refreshes through `profile`.
    #[must_use]
    pub const fn new(profile: Arc<ProfileService<T>>) -> Self {
        Self { profile }
    }

    /// The session the bearer token is read from.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        self.profile.session()
    }

    /// Sends a request.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged, and [`Error::Unauthorized`] when a
    /// 401 could not be recovered.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.session().primary_access_token();
        let response = self.dispatch(request.clone(), token.as_deref()).await?;
        if response.status != 401 {
            return Ok(response);
        }

        let Some(rejected) = token else {
            debug!("401 without a stored token; nothing to refresh");
            return Err(Error::Unauthorized);
        };

        let fresh = match self.profile.refresh_djombi_token(&rejected).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Token refresh failed, clearing Djombi auth: {e}");
                self.profile.clear_djombi_auth();
                return Err(Error::Unauthorized);
            }
        };

        let retried = self.dispatch(request, Some(&fresh)).await?;
        if retried.status == 401 {
            warn!("Request rejected after token refresh, clearing Djombi auth");
            self.profile.clear_djombi_auth();
            return Err(Error::Unauthorized);
        }
        Ok(retried)
    }

    async fn dispatch(&self, request: HttpRequest, token: Option<&str>) -> Result<HttpResponse> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        self.profile.transport().execute(request).await
    }
}
