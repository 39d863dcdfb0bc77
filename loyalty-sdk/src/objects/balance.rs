use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response of `GET /api/user/balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Spendable points: everything accrued minus everything withdrawn.
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    /// Total points ever withdrawn.
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

/// Body of `POST /api/user/balance/withdraw`.
///
/// `order` is the number of the purchase the points are spent on; it is a
/// separate id space from accrual orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

/// One entry of `GET /api/user/withdrawals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: time::OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_request_accepts_fractional_sum() {
        let req: WithdrawRequest =
            serde_json::from_str(r#"{"order":"2377225624","sum":751.25}"#).unwrap();
        assert_eq!(req.order, "2377225624");
        assert_eq!(req.sum, Decimal::new(75125, 2));
    }

    #[test]
    fn test_balance_serializes_numbers() {
        let balance = BalanceResponse {
            current: Decimal::new(50050, 2),
            withdrawn: Decimal::new(42, 0),
        };
        let json = serde_json::to_string(&balance).unwrap();
        assert_eq!(json, r#"{"current":500.5,"withdrawn":42.0}"#);
    }
}
