//! Cached Djombi profile service.
//!
//! Exchanges an Adafri token for a Djombi token pair and user profile via
//! `GET /accounts/profile`, persists the result through the
//! [`SessionContext`] and keeps it in a TTL cache.
//!
//! Concurrent fetches and refreshes are single-flight: callers that queue
//! behind an in-flight exchange reuse its result, success or failure,
//! instead of issuing their own request.

mod model;

pub use model::{DjombiSession, ProfileEnvelope, TokenMeta, UserProfile};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{DEFAULT_TTL, TtlCache};
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, Transport, endpoint};
use crate::time::{SharedClock, SystemClock};
use crate::token::StoredToken;

const CACHE_KEY: &str = "djombi_auth";
const PROFILE_PATH: &str = "accounts/profile";

/// Where the profile service is in its login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    /// No valid cached session.
    Unauthenticated,
    /// A profile exchange is in flight.
    Authenticating,
    /// Tokens and profile are cached and valid.
    Authenticated,
}

#[derive(Debug, Clone)]
struct CachedAuth {
    adafri_token: String,
    session: DjombiSession,
}

#[derive(Debug)]
struct FailedFetch {
    adafri_token: String,
    error: Error,
}

/// Fetches, caches and refreshes Djombi credentials.
pub struct ProfileService<T: Transport> {
    transport: Arc<T>,
    session: SessionContext,
    profile_url: Url,
    cache: TtlCache<CachedAuth>,
    fetch_gate: Mutex<()>,
    completed_fetches: AtomicU64,
    last_failure: StdMutex<Option<FailedFetch>>,
    refresh_gate: Mutex<()>,
}

impl<T: Transport> std::fmt::Debug for ProfileService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService")
            .field("profile_url", &self.profile_url.as_str())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ProfileService<T> {
    /// Creates a service against `auth_base_url` with a 5 minute cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile URL cannot be built from the base.
    pub fn new(transport: Arc<T>, session: SessionContext, auth_base_url: &Url) -> Result<Self> {
        Ok(Self {
            transport,
            session,
            profile_url: endpoint(auth_base_url, PROFILE_PATH)?,
            cache: TtlCache::new(DEFAULT_TTL),
            fetch_gate: Mutex::new(()),
            completed_fetches: AtomicU64::new(0),
            last_failure: StdMutex::new(None),
            refresh_gate: Mutex::new(()),
        })
    }

    /// Replaces the cache with one using `ttl` and `clock`.
    #[must_use]
    pub fn with_cache(mut self, ttl: Duration, clock: SharedClock) -> Self {
        self.cache = TtlCache::with_clock(ttl, clock);
        self
    }

    /// Replaces the cache TTL, keeping the system clock.
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.with_cache(ttl, Arc::new(SystemClock))
    }

    /// The session context credentials are written to.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProfileState {
        if self.fetch_gate.try_lock().is_err() {
            ProfileState::Authenticating
        } else if self.is_djombi_authenticated() {
            ProfileState::Authenticated
        } else {
            ProfileState::Unauthenticated
        }
    }

    /// True while the cached session is valid and the Djombi cookie is present.
    #[must_use]
    pub fn is_djombi_authenticated(&self) -> bool {
        self.cache.get(CACHE_KEY).is_some() && self.session.get_djombi_tokens().is_some()
    }

    /// The cached session, if still valid.
    #[must_use]
    pub fn cached_session(&self) -> Option<DjombiSession> {
        self.cache.get(CACHE_KEY).map(|cached| cached.session)
    }

    /// Returns the cached session for `adafri_token` without I/O, or fetches it.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile exchange fails.
    pub async fn initialize_djombi_auth(&self, adafri_token: &str) -> Result<DjombiSession> {
        if self.is_djombi_authenticated()
            && let Some(session) = self.cached_for(adafri_token)
        {
            debug!("Djombi auth already initialized");
            return Ok(session);
        }
        self.get_djombi_profile(adafri_token).await
    }

    /// Exchanges `adafri_token` for Djombi tokens and the user profile.
    ///
    /// Calls that queued behind a concurrent exchange for the same token
    /// return its result, or a copy of its error, without a second request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or a payload
    /// without `status: "success"` and an access token.
    pub async fn get_djombi_profile(&self, adafri_token: &str) -> Result<DjombiSession> {
        let seen = self.completed_fetches.load(Ordering::SeqCst);
        let _gate = self.fetch_gate.lock().await;

        if self.completed_fetches.load(Ordering::SeqCst) != seen {
            if let Some(session) = self.cached_for(adafri_token) {
                debug!("Reusing profile fetched by a concurrent caller");
                return Ok(session);
            }
            if let Some(error) = self.failure_for(adafri_token) {
                debug!("Reusing profile failure of a concurrent caller");
                return Err(error);
            }
        }

        let result = self.fetch_profile(adafri_token).await;
        *self.failure_slot() = result.as_ref().err().map(|error| FailedFetch {
            adafri_token: adafri_token.to_string(),
            error: error.replay(),
        });
        self.completed_fetches.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Mints a new Djombi token after `rejected_token` was refused.
    ///
    /// If another caller already replaced the rejected token, the current
    /// token is returned without a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAdafriToken`] when no Adafri token is stored, or the
    /// profile exchange error.
    pub async fn refresh_djombi_token(&self, rejected_token: &str) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.session.get_djombi_tokens()
            && current.access_token != rejected_token
        {
            debug!("Djombi token already refreshed by a concurrent caller");
            return Ok(current.access_token);
        }

        let adafri = self
            .session
            .get_auth_tokens()
            .ok_or(Error::NoAdafriToken)?;

        info!("Refreshing Djombi token");
        self.cache.remove(CACHE_KEY);
        let session = self.get_djombi_profile(&adafri.access_token).await?;
        Ok(session.tokens.access_token)
    }

    /// Drops Djombi cookies and the cache.
    pub fn clear_djombi_auth(&self) {
        self.session.clear_djombi_tokens();
        self.cache.clear();
        info!("Cleared Djombi auth");
    }

    fn cached_for(&self, adafri_token: &str) -> Option<DjombiSession> {
        self.cache
            .get(CACHE_KEY)
            .filter(|cached| cached.adafri_token == adafri_token)
            .map(|cached| cached.session)
    }

    fn failure_for(&self, adafri_token: &str) -> Option<Error> {
        self.failure_slot()
            .as_ref()
            .filter(|failed| failed.adafri_token == adafri_token)
            .map(|failed| failed.error.replay())
    }

    fn failure_slot(&self) -> std::sync::MutexGuard<'_, Option<FailedFetch>> {
        self.last_failure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch_profile(&self, adafri_token: &str) -> Result<DjombiSession> {
        info!("Fetching Djombi profile");
        let request = HttpRequest::get(self.profile_url.clone()).bearer_auth(adafri_token);

        let response = self.transport.execute(request).await.map_err(|e| {
            warn!("Profile request failed: {e}");
            e
        })?;

        if !response.is_success() {
            let message = response.message().unwrap_or_else(|| {
                format!("profile request failed with status {}", response.status)
            });
            warn!("Profile request rejected: {} {message}", response.status);
            return Err(Error::status(response.status, message));
        }

        let session = response
            .parse::<ProfileEnvelope>()
            .map_err(|e| Error::InvalidResponse(e.to_string()))
            .and_then(ProfileEnvelope::into_session)
            .map_err(|e| {
                warn!("Malformed profile payload: {e}");
                e
            })?;

        self.remember_adafri_token(adafri_token);
        self.session.set_djombi_tokens(&session.tokens);
        self.session.set_user_info(&session.profile.user_info());
        self.cache.insert(
            CACHE_KEY,
            CachedAuth {
                adafri_token: adafri_token.to_string(),
                session: session.clone(),
            },
        );

        info!("Djombi profile cached");
        Ok(session)
    }

    fn remember_adafri_token(&self, adafri_token: &str) {
        let stored = self.session.get_auth_tokens();
        if stored.as_ref().map(|t| t.access_token.as_str()) != Some(adafri_token) {
            let refresh = stored.map(|t| t.refresh_token).unwrap_or_default();
            self.session
                .set_auth_tokens(&StoredToken::new(adafri_token, refresh));
        }
    }
}
