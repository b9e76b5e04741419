//! Authentication module
//!
//! Supports: SystemLink API key, Bearer, Basic
//!
//! SystemLink Enterprise accepts an API key in the `x-ntc-api-key` header;
//! the other schemes cover servers fronted by a proxy.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, API_KEY_HEADER};
