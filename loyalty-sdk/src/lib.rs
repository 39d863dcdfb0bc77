//! Shared types for the loyalty ledger.
//!
//! - [`objects`]: request and response bodies of the user API.
//! - [`signature`]: HMAC-signed session tokens carried in the auth cookie.

#![forbid(unsafe_code)]

pub mod objects;
pub mod signature;
