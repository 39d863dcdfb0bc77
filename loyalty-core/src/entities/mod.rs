pub mod balances;
pub mod orders;
pub mod processing_claims;
pub mod settlement;
pub mod users;
pub mod withdrawals;

use loyalty_sdk::objects::OrderStatus as SdkOrderStatus;

/// Order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `loyalty_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "order_status")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// `Invalid` and `Processed` are never left again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }
}

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::New => SdkOrderStatus::New,
            OrderStatus::Processing => SdkOrderStatus::Processing,
            OrderStatus::Invalid => SdkOrderStatus::Invalid,
            OrderStatus::Processed => SdkOrderStatus::Processed,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::New => OrderStatus::New,
            SdkOrderStatus::Processing => OrderStatus::Processing,
            SdkOrderStatus::Invalid => OrderStatus::Invalid,
            SdkOrderStatus::Processed => OrderStatus::Processed,
        }
    }
}
