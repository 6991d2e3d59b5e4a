//! Per-category fetch state machine.
//!
//! Each category has a [`CategoryFeed`] that decides whether a fetch may
//! start and whether a finished fetch may still update the store. A fetch
//! carries a [`FetchTicket`]; only the ticket of the latest fetch for the
//! currently selected account is accepted, so a slow response for a
//! previously selected account never overwrites newer data.

mod controller;
mod store;

pub use controller::{CategoryController, SyncOutcome};
pub use store::EmailStore;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::email::Category;

/// How long a manual refresh keeps the refreshing indicator on.
pub const REFRESH_HOLD: Duration = Duration::from_secs(1);

/// Fetch lifecycle of one category for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// Nothing fetched for the current account.
    Idle,
    /// A fetch is in flight.
    Loading {
        /// Account being fetched.
        account_id: String,
        /// Generation of the in-flight ticket.
        generation: u64,
    },
    /// The store holds this account's list.
    Loaded {
        /// Account the list belongs to.
        account_id: String,
    },
    /// The last fetch failed.
    Failed {
        /// Account the fetch was for.
        account_id: String,
        /// Failure message.
        message: String,
    },
}

/// Proof that a fetch was started, handed back on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    /// Category being fetched.
    pub category: Category,
    /// Account being fetched.
    pub account_id: String,
    /// Monotonic generation within the feed.
    pub generation: u64,
}

/// Session facts a fetch depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedConditions<'a> {
    /// Selected email account id.
    pub account_id: Option<&'a str>,
    /// Whether a bearer token is available.
    pub has_token: bool,
}

/// Fetch state of one category.
#[derive(Debug, Clone)]
pub struct CategoryFeed {
    category: Category,
    initialized: bool,
    active: bool,
    account_id: Option<String>,
    state: FetchState,
    generation: u64,
    refreshing_until: Option<Instant>,
}

impl CategoryFeed {
    /// Creates an uninitialized, inactive feed.
    #[must_use]
    pub const fn new(category: Category) -> Self {
        Self {
            category,
            initialized: false,
            active: false,
            account_id: None,
            state: FetchState::Idle,
            generation: 0,
            refreshing_until: None,
        }
    }

    /// The category this feed tracks.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &FetchState {
        &self.state
    }

    /// Marks the feed mounted.
    pub const fn initialize(&mut self) {
        self.initialized = true;
    }

    /// Whether the feed is mounted.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Activates or deactivates the feed.
    pub const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the feed's category is the active one.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Records the selected account; a change resets the feed to idle.
    ///
    /// Returns true when the account changed.
    pub fn observe_account(&mut self, account_id: Option<&str>) -> bool {
        if self.account_id.as_deref() == account_id {
            return false;
        }
        debug!(
            "{} feed: account changed {:?} -> {:?}",
            self.category, self.account_id, account_id
        );
        self.account_id = account_id.map(ToString::to_string);
        self.state = FetchState::Idle;
        true
    }

    /// Resets a settled state that `store` no longer backs.
    ///
    /// The store keeps one account at a time, so loading another account's
    /// list through a different feed drops this feed's list and error. A
    /// `Loaded` state needs its list and a `Failed` state its error, both
    /// held for the same account.
    ///
    /// Returns true when the feed was reset to idle.
    pub fn reconcile(&mut self, store: &EmailStore) -> bool {
        let backed = match &self.state {
            FetchState::Loaded { account_id } => {
                store.account_id() == Some(account_id.as_str()) && store.is_loaded(self.category)
            }
            FetchState::Failed { account_id, .. } => {
                store.account_id() == Some(account_id.as_str())
                    && store.error(self.category).is_some()
            }
            FetchState::Idle | FetchState::Loading { .. } => true,
        };
        if !backed {
            debug!("{} feed: stored list gone, resetting", self.category);
            self.state = FetchState::Idle;
        }
        !backed
    }

    /// Starts a fetch if every precondition holds.
    ///
    /// The feed must be initialized and active, an account must be selected,
    /// a token must be present and the feed must be idle for that account.
    /// A failed fetch is only retried after a refresh or an account change.
    pub fn begin(&mut self, conditions: FeedConditions<'_>) -> Option<FetchTicket> {
        let account_id = conditions.account_id.filter(|id| !id.trim().is_empty());
        self.observe_account(account_id);

        let account_id = account_id?;
        if !(self.initialized && self.active && conditions.has_token) {
            return None;
        }
        if self.state != FetchState::Idle {
            return None;
        }

        self.generation += 1;
        self.state = FetchState::Loading {
            account_id: account_id.to_string(),
            generation: self.generation,
        };
        Some(FetchTicket {
            category: self.category,
            account_id: account_id.to_string(),
            generation: self.generation,
        })
    }

    /// Finishes the fetch for `ticket`.
    ///
    /// `current_account` is the selection at completion time. Returns false
    /// when the ticket is stale, in which case the outcome must be dropped.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        current_account: Option<&str>,
        outcome: Result<(), String>,
    ) -> bool {
        self.observe_account(current_account);

        let current = matches!(
            &self.state,
            FetchState::Loading { account_id, generation }
                if *generation == ticket.generation && *account_id == ticket.account_id
        );
        if !current {
            debug!(
                "{} feed: dropping stale response for {} (generation {})",
                self.category, ticket.account_id, ticket.generation
            );
            return false;
        }

        let account_id = ticket.account_id.clone();
        self.state = match outcome {
            Ok(()) => FetchState::Loaded { account_id },
            Err(message) => FetchState::Failed { account_id, message },
        };
        true
    }

    /// Forces the next [`Self::begin`] to fetch again and holds the
    /// refreshing indicator for [`REFRESH_HOLD`] from `now`.
    pub fn handle_refresh(&mut self, now: Instant) {
        self.state = FetchState::Idle;
        self.refreshing_until = Some(now + REFRESH_HOLD);
    }

    /// Whether the refreshing indicator is on at `now`.
    #[must_use]
    pub fn is_refreshing(&self, now: Instant) -> bool {
        self.refreshing_until.is_some_and(|until| now < until)
    }
}

/// One feed per category, at most one of them active.
#[derive(Debug, Clone)]
pub struct FeedSet {
    feeds: BTreeMap<Category, CategoryFeed>,
}

impl Default for FeedSet {
    fn default() -> Self {
        Self {
            feeds: Category::ALL
                .into_iter()
                .map(|category| (category, CategoryFeed::new(category)))
                .collect(),
        }
    }
}

impl FeedSet {
    /// Creates a set with an idle feed per category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The feed for `category`.
    #[must_use]
    pub fn feed(&self, category: Category) -> &CategoryFeed {
        &self.feeds[&category]
    }

    /// The feed for `category`, mutably.
    pub fn feed_mut(&mut self, category: Category) -> &mut CategoryFeed {
        self.feeds
            .entry(category)
            .or_insert_with(|| CategoryFeed::new(category))
    }

    /// Initializes `category` and makes it the only active feed.
    pub fn activate(&mut self, category: Category) {
        for feed in self.feeds.values_mut() {
            feed.set_active(feed.category() == category);
        }
        self.feed_mut(category).initialize();
    }

    /// The active category, if any.
    #[must_use]
    pub fn active(&self) -> Option<Category> {
        self.feeds
            .values()
            .find(|feed| feed.is_active())
            .map(CategoryFeed::category)
    }
}
