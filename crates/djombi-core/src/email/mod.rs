//! Email service client and response decoding.

pub mod decode;
mod model;
mod service;

pub use decode::{DecodeError, ListPayload};
pub use model::{Category, Email, OutgoingEmail};
pub use service::{ApiAck, EmailApi, EmailError, EmailResult};
