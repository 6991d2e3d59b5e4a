//! # djombi-core
//!
//! Mail side of the Djombi dashboard client.
//!
//! This crate provides:
//! - Service configuration (endpoints, paging, cache lifetime)
//! - A typed client for the email microservice
//! - A tolerant decoder for its list responses
//! - A per-category fetch state machine and shared email store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod email;
mod error;
pub mod fetch;

pub use config::ServiceConfig;
pub use email::{ApiAck, Category, Email, EmailApi, EmailError, EmailResult, OutgoingEmail};
pub use error::{Error, Result};
pub use fetch::{CategoryController, EmailStore, FetchState, SyncOutcome};
