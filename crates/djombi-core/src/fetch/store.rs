//! Shared per-category email lists.

use std::collections::BTreeMap;

use tracing::debug;

use crate::email::{Category, Email};

/// In-memory email lists for the selected account.
///
/// Lists belong to one account at a time; storing a list for a different
/// account drops everything held for the previous one.
#[derive(Debug, Clone, Default)]
pub struct EmailStore {
    account_id: Option<String>,
    active: Option<Category>,
    lists: BTreeMap<Category, Vec<Email>>,
    errors: BTreeMap<Category, String>,
}

impl EmailStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account the lists belong to.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Sets the category on screen.
    pub const fn set_active_category(&mut self, category: Category) {
        self.active = Some(category);
    }

    /// The category on screen.
    #[must_use]
    pub const fn active_category(&self) -> Option<Category> {
        self.active
    }

    /// Emails of `category`; empty when not loaded.
    #[must_use]
    pub fn emails(&self, category: Category) -> &[Email] {
        self.lists
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Emails of the active category.
    #[must_use]
    pub fn active_emails(&self) -> &[Email] {
        self.active
            .map(|category| self.emails(category))
            .unwrap_or_default()
    }

    /// Last error for `category`, cleared by a successful load.
    #[must_use]
    pub fn error(&self, category: Category) -> Option<&str> {
        self.errors.get(&category).map(String::as_str)
    }

    /// Whether a list was stored for `category`.
    #[must_use]
    pub fn is_loaded(&self, category: Category) -> bool {
        self.lists.contains_key(&category)
    }

    /// Stores the list of `category` for `account_id`.
    pub fn replace(&mut self, account_id: &str, category: Category, emails: Vec<Email>) {
        self.switch_account(account_id);
        debug!("Storing {} {category} emails", emails.len());
        self.errors.remove(&category);
        self.lists.insert(category, emails);
    }

    /// Records a failed load of `category` for `account_id`.
    pub fn set_error(&mut self, account_id: &str, category: Category, message: impl Into<String>) {
        self.switch_account(account_id);
        self.errors.insert(category, message.into());
    }

    /// Relocates the email `id` into `destination`.
    ///
    /// Returns false when no loaded list contains it.
    pub fn apply_move(&mut self, id: &str, destination: Category) -> bool {
        let Some((source, index)) = self.lists.iter().find_map(|(category, emails)| {
            emails
                .iter()
                .position(|email| email.id == id)
                .map(|index| (*category, index))
        }) else {
            return false;
        };

        let Some(list) = self.lists.get_mut(&source) else {
            return false;
        };
        let moved = list.remove(index).moved_to(destination);
        // an unloaded destination is fetched in full later
        if let Some(target) = self.lists.get_mut(&destination) {
            target.insert(0, moved);
        }
        debug!("Moved {id} from {source} to {destination}");
        true
    }

    /// Drops every list and error.
    pub fn clear(&mut self) {
        self.account_id = None;
        self.lists.clear();
        self.errors.clear();
    }

    fn switch_account(&mut self, account_id: &str) {
        if self.account_id.as_deref() != Some(account_id) {
            self.lists.clear();
            self.errors.clear();
            self.account_id = Some(account_id.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::email::decode::normalize_email;
    use chrono::Utc;
    use serde_json::json;

    fn email(id: &str, category: Category) -> Email {
        let raw = json!({"id": id, "subject": id});
        normalize_email(raw.as_object().unwrap(), category, 0, Utc::now())
    }

    #[test]
    fn test_replace_and_read() {
        let mut store = EmailStore::new();
        store.set_active_category(Category::Inbox);
        store.replace("a", Category::Inbox, vec![email("1", Category::Inbox)]);

        assert_eq!(store.account_id(), Some("a"));
        assert_eq!(store.active_emails().len(), 1);
        assert!(store.emails(Category::Sent).is_empty());
        assert!(!store.is_loaded(Category::Sent));
    }

    #[test]
    fn test_account_change_drops_other_lists() {
        let mut store = EmailStore::new();
        store.replace("a", Category::Inbox, vec![email("1", Category::Inbox)]);
        store.set_error("a", Category::Spam, "boom");

        store.replace("b", Category::Sent, vec![email("2", Category::Sent)]);
        assert!(store.emails(Category::Inbox).is_empty());
        assert_eq!(store.error(Category::Spam), None);
        assert_eq!(store.emails(Category::Sent)[0].id, "2");
    }

    #[test]
    fn test_successful_load_clears_error() {
        let mut store = EmailStore::new();
        store.set_error("a", Category::Inbox, "boom");
        assert_eq!(store.error(Category::Inbox), Some("boom"));
        store.replace("a", Category::Inbox, Vec::new());
        assert_eq!(store.error(Category::Inbox), None);
    }

    #[test]
    fn test_apply_move() {
        let mut store = EmailStore::new();
        store.replace(
            "a",
            Category::Inbox,
            vec![email("1", Category::Inbox), email("2", Category::Inbox)],
        );
        store.replace("a", Category::Spam, vec![email("3", Category::Spam)]);

        assert!(store.apply_move("1", Category::Spam));
        assert_eq!(store.emails(Category::Inbox).len(), 1);
        let spam = store.emails(Category::Spam);
        assert_eq!(spam[0].id, "1");
        assert_eq!(spam[0].status, Category::Spam);
        assert_eq!(spam[0].category, Category::Spam);

        // destination not loaded: removed from source only
        assert!(store.apply_move("2", Category::Sent));
        assert!(store.emails(Category::Inbox).is_empty());
        assert!(!store.is_loaded(Category::Sent));

        assert!(!store.apply_move("missing", Category::Inbox));
    }
}
