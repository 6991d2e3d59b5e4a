//! Cookie store.
//!
//! A small cookie jar with browser-like semantics: values are
//! percent-encoded, cookies carry an expiry, `path`, `SameSite` and
//! `Secure` attributes, and expired cookies read as absent. None of the
//! operations fail; a missing cookie is `None`.
//!
//! Cookies are keyed by name only. The session context never sets the same
//! name under two paths or domains.

pub mod names;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Never sent on cross-site requests.
    #[default]
    Strict,
    /// Sent on top-level cross-site navigations.
    Lax,
    /// Always sent (requires `Secure`).
    None,
}

impl SameSite {
    /// Attribute value as written in a `Set-Cookie` line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Options for writing or removing a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime in days. `0` writes a session cookie, negative values expire it.
    pub days: i64,
    /// `Secure` flag. `None` follows the jar's context (set when it serves https).
    pub secure: Option<bool>,
    /// `SameSite` attribute.
    pub same_site: SameSite,
    /// Cookie path.
    pub path: String,
    /// Cookie domain.
    pub domain: Option<String>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            days: 7,
            secure: None,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            domain: None,
        }
    }
}

impl CookieOptions {
    /// Default options with a different lifetime.
    #[must_use]
    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }
}

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Decoded value.
    pub value: String,
    /// Expiry; `None` for session cookies.
    pub expires: Option<DateTime<Utc>>,
    /// Cookie path.
    pub path: String,
    /// Cookie domain.
    pub domain: Option<String>,
    /// `Secure` flag.
    pub secure: bool,
    /// `SameSite` attribute.
    pub same_site: SameSite,
}

impl Cookie {
    /// Returns true if the cookie has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

impl fmt::Display for Cookie {
    /// Renders the cookie as a `Set-Cookie` line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, urlencoding::encode(&self.value))?;
        if let Some(expires) = self.expires {
            write!(
                f,
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            )?;
        }
        write!(f, "; Path={}", self.path)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        write!(f, "; SameSite={}", self.same_site.as_str())?;
        if self.secure {
            write!(f, "; Secure")?;
        }
        Ok(())
    }
}

/// In-memory cookie jar with optional write-through persistence.
#[derive(Debug)]
pub struct CookieJar {
    cookies: RwLock<BTreeMap<String, Cookie>>,
    secure_context: bool,
    store_path: Option<PathBuf>,
}

impl CookieJar {
    /// Creates an empty, non-persistent jar.
    ///
    /// `secure_context` is the default for the `Secure` flag, the way a
    /// browser page served over https would set it.
    #[must_use]
    pub fn new(secure_context: bool) -> Self {
        Self {
            cookies: RwLock::new(BTreeMap::new()),
            secure_context,
            store_path: None,
        }
    }

    /// Creates an empty jar whose secure context follows the origin's scheme.
    #[must_use]
    pub fn for_origin(origin: &Url) -> Self {
        Self::new(origin.scheme() == "https")
    }

    /// Opens a jar persisted as JSON at `path`, loading any cookies already there.
    ///
    /// Every later mutation is written back to the same file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn persistent(path: impl AsRef<Path>, secure_context: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut cookies = BTreeMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let stored: Vec<Cookie> = serde_json::from_str(&contents)?;
            let now = Utc::now();
            for cookie in stored.into_iter().filter(|c| !c.is_expired_at(now)) {
                cookies.insert(cookie.name.clone(), cookie);
            }
            debug!("Loaded {} cookies from {}", cookies.len(), path.display());
        }

        Ok(Self {
            cookies: RwLock::new(cookies),
            secure_context,
            store_path: Some(path),
        })
    }

    /// Returns true if cookies default to `Secure`.
    #[must_use]
    pub const fn is_secure_context(&self) -> bool {
        self.secure_context
    }

    /// Writes a cookie.
    pub fn set_cookie(&self, name: &str, value: &str, options: &CookieOptions) {
        let expires = match options.days {
            0 => None,
            days => Some(Utc::now() + Duration::days(days)),
        };
        let cookie = Cookie {
            name: name.to_string(),
            value: value.to_string(),
            expires,
            path: options.path.clone(),
            domain: options.domain.clone(),
            secure: options.secure.unwrap_or(self.secure_context),
            same_site: options.same_site,
        };

        {
            let mut cookies = self.write();
            if cookie.is_expired_at(Utc::now()) {
                cookies.remove(name);
            } else {
                cookies.insert(name.to_string(), cookie);
            }
        }
        debug!("Set cookie {name}");
        self.persist();
    }

    /// Reads a cookie's value, or `None` if it is missing or expired.
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        let expired = {
            let cookies = self.read();
            match cookies.get(name) {
                Some(cookie) if !cookie.is_expired_at(now) => return Some(cookie.value.clone()),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            self.write().remove(name);
            debug!("Evicted expired cookie {name}");
            self.persist();
        }
        None
    }

    /// Removes a cookie by overwriting it with an expiry in the past.
    pub fn remove_cookie(&self, name: &str, options: &CookieOptions) {
        self.set_cookie(
            name,
            "",
            &CookieOptions {
                days: -1,
                ..options.clone()
            },
        );
    }

    /// Returns the stored cookie with its attributes.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        let now = Utc::now();
        self.read()
            .get(name)
            .filter(|cookie| !cookie.is_expired_at(now))
            .cloned()
    }

    /// Renders a `Cookie:` request header value of every live cookie.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        let now = Utc::now();
        self.read()
            .values()
            .filter(|cookie| !cookie.is_expired_at(now))
            .map(|cookie| format!("{}={}", cookie.name, urlencoding::encode(&cookie.value)))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Names of every live cookie, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let now = Utc::now();
        self.read()
            .values()
            .filter(|cookie| !cookie.is_expired_at(now))
            .map(|cookie| cookie.name.clone())
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Cookie>> {
        self.cookies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Cookie>> {
        self.cookies.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) {
        let Some(path) = &self.store_path else {
            return;
        };

        let snapshot: Vec<Cookie> = self.read().values().cloned().collect();
        let result = serde_json::to_string_pretty(&snapshot)
            .map_err(std::io::Error::from)
            .and_then(|contents| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, contents)
            });

        if let Err(e) = result {
            warn!("Failed to persist cookies to {}: {e}", path.display());
        }
    }
}
