//! # djombi-auth
//!
//! Session state and credential plumbing for the Djombi dashboard client.
//!
//! ## Features
//!
//! - **Cookie store**: browser-like cookie jar with expiry, `SameSite`,
//!   `Secure` and optional write-through persistence
//! - **Session context**: typed accessors for Adafri/Djombi tokens, the
//!   current organization and the selected email account
//! - **Profile service**: Adafri → Djombi token exchange with a TTL cache and
//!   single-flight fetch/refresh
//! - **Authorized client**: bearer auth with one refresh-and-retry on 401
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use djombi_auth::{
//!     AuthorizedClient, CookieJar, ProfileService, ReqwestTransport, SessionContext,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = url::Url::parse("https://auth.example.com/api/v1")?;
//!     let session = SessionContext::new(Arc::new(CookieJar::for_origin(&base)));
//!     let transport = Arc::new(ReqwestTransport::new(std::time::Duration::from_secs(30))?);
//!
//!     let profile = Arc::new(ProfileService::new(transport, session.clone(), &base)?);
//!     let djombi = profile.initialize_djombi_auth("adafri-token").await?;
//!     println!("Signed in as {:?}", djombi.profile.email);
//!
//!     // Every request through this client carries the Djombi bearer token.
//!     let client = AuthorizedClient::new(profile);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod context;
pub mod cookie;
mod error;
pub mod http;
pub mod profile;
pub mod time;
pub mod token;

pub use cache::{CacheEntry, TtlCache};
pub use context::{LinkedEmailAccount, Organization, SelectedEmailAccount, SessionContext, UserInfo};
pub use cookie::{Cookie, CookieJar, CookieOptions, SameSite};
pub use error::{Error, Result};
pub use http::{AuthorizedClient, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use profile::{DjombiSession, ProfileService, ProfileState, UserProfile};
pub use time::{Clock, ManualClock, SharedClock, SystemClock};
pub use token::StoredToken;
