//! Async driver tying the email client, the session and the feeds together.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use djombi_auth::{Clock, SessionContext, SharedClock, SystemClock, Transport};
use tracing::{debug, info, warn};

use super::store::EmailStore;
use super::{FeedConditions, FeedSet, FetchState};
use crate::email::{ApiAck, Category, Email, EmailApi, EmailResult};

/// What a [`CategoryController::sync`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A precondition did not hold, or the list is already loaded.
    Skipped,
    /// The list was stored with this many emails.
    Loaded(usize),
    /// The fetch failed; the message was stored as the category error.
    Failed(String),
    /// The account changed while the fetch was in flight; the result was dropped.
    Stale,
}

/// Fetches category lists into a shared [`EmailStore`].
pub struct CategoryController<T: Transport> {
    api: EmailApi<T>,
    session: SessionContext,
    clock: SharedClock,
    feeds: Mutex<FeedSet>,
    store: Arc<RwLock<EmailStore>>,
}

impl<T: Transport> std::fmt::Debug for CategoryController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryController")
            .field("feeds", &self.feeds)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> CategoryController<T> {
    /// Creates a controller writing into `store`.
    #[must_use]
    pub fn new(api: EmailApi<T>, store: Arc<RwLock<EmailStore>>) -> Self {
        let session = api.client().session().clone();
        Self {
            api,
            session,
            clock: Arc::new(SystemClock),
            feeds: Mutex::new(FeedSet::new()),
            store,
        }
    }

    /// Replaces the clock used for the refresh indicator.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> Arc<RwLock<EmailStore>> {
        Arc::clone(&self.store)
    }

    /// The email client.
    #[must_use]
    pub const fn api(&self) -> &EmailApi<T> {
        &self.api
    }

    /// Makes `category` the active view.
    pub fn mount(&self, category: Category) {
        self.feeds().activate(category);
        self.store_mut().set_active_category(category);
        debug!("Mounted {category}");
    }

    /// Fetch state of `category`.
    #[must_use]
    pub fn state(&self, category: Category) -> FetchState {
        self.feeds().feed(category).state().clone()
    }

    /// Snapshot of the stored emails of `category`.
    #[must_use]
    pub fn emails(&self, category: Category) -> Vec<Email> {
        self.store_ref().emails(category).to_vec()
    }

    /// Whether the refresh indicator of `category` is on.
    #[must_use]
    pub fn is_refreshing(&self, category: Category) -> bool {
        let now = self.clock.now();
        self.feeds().feed(category).is_refreshing(now)
    }

    /// Fetches `category` if its feed allows it and stores the result.
    pub async fn sync(&self, category: Category) -> SyncOutcome {
        let account = self.session.selected_linked_email().map(|a| a.id);
        let has_token = self.session.primary_access_token().is_some();

        let ticket = {
            let store = self.store_ref();
            let mut feeds = self.feeds();
            let feed = feeds.feed_mut(category);
            feed.reconcile(&store);
            feed.begin(FeedConditions {
                account_id: account.as_deref(),
                has_token,
            })
        };
        let Some(ticket) = ticket else {
            return SyncOutcome::Skipped;
        };

        let result = self.api.fetch_emails_by_category(category).await;

        let current = self.session.selected_linked_email().map(|a| a.id);
        let outcome = result.as_ref().map(|_| ()).map_err(ToString::to_string);
        let accepted = self
            .feeds()
            .feed_mut(category)
            .complete(&ticket, current.as_deref(), outcome);
        if !accepted {
            debug!("Dropped {category} response for {}", ticket.account_id);
            return SyncOutcome::Stale;
        }

        match result {
            Ok(emails) => {
                let count = emails.len();
                self.store_mut().replace(&ticket.account_id, category, emails);
                info!("Loaded {count} {category} emails");
                SyncOutcome::Loaded(count)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Failed to load {category}: {message}");
                self.store_mut()
                    .set_error(&ticket.account_id, category, message.clone());
                SyncOutcome::Failed(message)
            }
        }
    }

    /// Forces a re-fetch of `category`.
    pub async fn handle_refresh(&self, category: Category) -> SyncOutcome {
        let now = self.clock.now();
        self.feeds().feed_mut(category).handle_refresh(now);
        self.sync(category).await
    }

    /// Moves an email upstream, then in the store.
    ///
    /// # Errors
    ///
    /// Returns the email client's error; the store is untouched on failure.
    pub async fn move_email(&self, message_id: &str, destination: Category) -> EmailResult<ApiAck> {
        let ack = self.api.move_email(message_id, destination).await?;
        if !self.store_mut().apply_move(message_id, destination) {
            debug!("{message_id} not in any loaded list");
        }
        Ok(ack)
    }

    fn feeds(&self) -> std::sync::MutexGuard<'_, FeedSet> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_ref(&self) -> std::sync::RwLockReadGuard<'_, EmailStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_mut(&self) -> std::sync::RwLockWriteGuard<'_, EmailStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
