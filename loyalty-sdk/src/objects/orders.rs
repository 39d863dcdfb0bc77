use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status as exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

/// One entry of `GET /api/user/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// The order number as submitted.
    pub number: String,
    pub status: OrderStatus,
    /// Points credited for the order, present once it is processed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: time::OffsetDateTime,
}
