#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod accrual;
pub mod config;
pub mod entities;
pub mod events;
pub mod framework;
pub mod ledger;
pub mod processors;
pub mod utils;
