//! HTTP API of the loyalty service.

pub mod extractors;
pub mod user;
