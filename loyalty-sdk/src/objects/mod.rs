//! User API request and response types.
//!
//! Amounts travel as JSON numbers and timestamps as RFC 3339 strings.

pub mod balance;
pub mod orders;

pub use balance::{BalanceResponse, WithdrawRequest, WithdrawalResponse};
pub use orders::{OrderResponse, OrderStatus};

use serde::{Deserialize, Serialize};

/// Login and registration body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    /// Both fields must be present for the request to be processed.
    pub fn is_complete(&self) -> bool {
        !self.login.is_empty() && !self.password.is_empty()
    }
}
